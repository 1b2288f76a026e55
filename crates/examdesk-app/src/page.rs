// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use log::{info, trace};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::{
    DEFAULT_DEBOUNCE, Debouncer, FilterKey, FilterPatch, HistoryPolicy, ListKind, ListQuery,
    Navigation, QuerySnapshot, reconcile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub debounce: Duration,
    pub history: HistoryPolicy,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            history: HistoryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    values: HashMap<FilterKey, String>,
}

impl FilterState {
    pub fn seed(kind: ListKind, snapshot: &QuerySnapshot) -> Self {
        let values = kind
            .filters()
            .iter()
            .map(|field| {
                let value = snapshot
                    .get(field.key.as_str())
                    .unwrap_or(field.unset_value());
                (field.key, value.to_owned())
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    fn set(&mut self, key: FilterKey, value: &str) {
        self.values.insert(key, value.to_owned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCommand {
    Type { key: FilterKey, text: String },
    Select { key: FilterKey, value: String },
    GoToPage(u32),
    ClearFilters,
    Tick,
    Unmount,
    Sync(QuerySnapshot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    InputUpdated { key: FilterKey, value: String },
    TimerArmed(FilterKey),
    TimersCancelled(usize),
    Navigate(Navigation),
    Ignored(FilterKey),
    Rejected { key: FilterKey, value: String },
    Synced(QuerySnapshot),
}

#[derive(Debug, Clone)]
pub struct ListPage {
    kind: ListKind,
    settings: PageSettings,
    snapshot: QuerySnapshot,
    filters: FilterState,
    timers: Debouncer<FilterKey>,
    mounted: bool,
}

impl ListPage {
    pub fn mount(kind: ListKind, snapshot: QuerySnapshot, settings: PageSettings) -> Self {
        Self {
            kind,
            settings,
            filters: FilterState::seed(kind, &snapshot),
            snapshot,
            timers: Debouncer::new(settings.debounce),
            mounted: true,
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn snapshot(&self) -> &QuerySnapshot {
        &self.snapshot
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn request(&self) -> ListQuery {
        ListQuery::from_snapshot(self.kind, &self.snapshot)
    }

    pub fn dispatch(&mut self, command: PageCommand, now: Instant) -> Vec<PageEvent> {
        if !self.mounted {
            return Vec::new();
        }

        match command {
            PageCommand::Type { key, text } => self.type_text(key, text, now),
            PageCommand::Select { key, value } => self.select(key, value),
            PageCommand::GoToPage(page) => self.go_to_page(page),
            PageCommand::ClearFilters => self.clear_filters(),
            PageCommand::Tick => self.tick(now),
            PageCommand::Unmount => {
                self.mounted = false;
                let cancelled = self.timers.cancel_all();
                trace!("{} page unmounted, {cancelled} timer(s) cancelled", self.kind.label());
                vec![PageEvent::TimersCancelled(cancelled)]
            }
            PageCommand::Sync(snapshot) => {
                let cancelled = self.timers.cancel_all();
                self.filters = FilterState::seed(self.kind, &snapshot);
                self.snapshot = snapshot.clone();
                let mut events = Vec::new();
                if cancelled > 0 {
                    events.push(PageEvent::TimersCancelled(cancelled));
                }
                events.push(PageEvent::Synced(snapshot));
                events
            }
        }
    }

    fn type_text(&mut self, key: FilterKey, text: String, now: Instant) -> Vec<PageEvent> {
        let Some(field) = self.kind.field(key).filter(|field| field.is_debounced()) else {
            return vec![PageEvent::Ignored(key)];
        };

        self.filters.set(field.key, &text);
        self.timers.arm(field.key, now);
        trace!(
            "{} {} timer armed for {:?}",
            self.kind.label(),
            key.as_str(),
            self.timers.delay()
        );
        vec![
            PageEvent::InputUpdated { key, value: text },
            PageEvent::TimerArmed(key),
        ]
    }

    fn select(&mut self, key: FilterKey, value: String) -> Vec<PageEvent> {
        let Some(field) = self.kind.field(key).filter(|field| !field.is_debounced()) else {
            return vec![PageEvent::Ignored(key)];
        };
        if !field.accepts(&value) {
            return vec![PageEvent::Rejected { key, value }];
        }

        self.filters.set(key, &value);
        let patch = FilterPatch::new().set(key.as_str(), &value);
        let mut events = vec![PageEvent::InputUpdated { key, value }];
        events.extend(self.commit(&patch, false));
        events
    }

    fn go_to_page(&mut self, page: u32) -> Vec<PageEvent> {
        if page == 0 {
            return vec![PageEvent::Rejected {
                key: FilterKey::Page,
                value: page.to_string(),
            }];
        }

        let patch = if page == 1 {
            FilterPatch::new().clear(FilterKey::Page.as_str())
        } else {
            FilterPatch::new().set(FilterKey::Page.as_str(), &page.to_string())
        };
        self.commit(&patch, false).into_iter().collect()
    }

    fn clear_filters(&mut self) -> Vec<PageEvent> {
        let mut events = Vec::new();
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            events.push(PageEvent::TimersCancelled(cancelled));
        }

        let mut patch = FilterPatch::new();
        for field in self.kind.filters() {
            self.filters.set(field.key, field.unset_value());
            patch.push(field.key.as_str(), None);
        }
        events.extend(self.commit(&patch, false));
        events
    }

    fn tick(&mut self, now: Instant) -> Vec<PageEvent> {
        let mut events = Vec::new();
        for key in self.timers.fire_due(now) {
            let value = self.filters.get(key).unwrap_or_default();
            let value = (!value.is_empty()).then_some(value);
            trace!("{} {} timer fired", self.kind.label(), key.as_str());

            let mut patch = FilterPatch::new();
            patch.push(key.as_str(), value);
            events.extend(self.commit(&patch, true));
        }
        events
    }

    fn commit(&mut self, patch: &FilterPatch, debounced: bool) -> Option<PageEvent> {
        let result = reconcile(&self.snapshot, patch);
        if !result.changed {
            return None;
        }

        self.snapshot = result.next;
        let mode = self.settings.history.mode_for(debounced);
        info!(
            "{} navigate ({:?}) to ?{}",
            self.kind.label(),
            mode,
            self.snapshot
        );
        Some(PageEvent::Navigate(Navigation {
            query: self.snapshot.clone(),
            mode,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{ListPage, PageCommand, PageEvent, PageSettings};
    use crate::{FilterKey, HistoryMode, HistoryPolicy, ListKind, Navigation, QuerySnapshot};
    use std::time::{Duration, Instant};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn mount(kind: ListKind, raw: &str) -> ListPage {
        ListPage::mount(kind, QuerySnapshot::parse(raw), PageSettings::default())
    }

    fn typed(text: &str) -> PageCommand {
        PageCommand::Type {
            key: FilterKey::Search,
            text: text.to_owned(),
        }
    }

    fn navigations(events: &[PageEvent]) -> Vec<&Navigation> {
        events
            .iter()
            .filter_map(|event| match event {
                PageEvent::Navigate(navigation) => Some(navigation),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn mount_seeds_controls_from_query() {
        let page = mount(ListKind::Payments, "search=ann&page=2");
        assert_eq!(page.filters().get(FilterKey::Search), Some("ann"));
        assert_eq!(page.filters().get(FilterKey::PaymentStatus), Some("all"));
        assert_eq!(page.filters().get(FilterKey::Topic), None);
    }

    #[test]
    fn typing_commits_once_after_debounce() {
        let start = Instant::now();
        let mut page = mount(ListKind::Users, "status=APPROVED&page=3");

        for (offset, text) in [(0, "j"), (80, "jo"), (160, "joh"), (240, "john")] {
            let events = page.dispatch(typed(text), start + ms(offset));
            assert!(navigations(&events).is_empty());
        }
        assert_eq!(page.filters().get(FilterKey::Search), Some("john"));

        assert!(page.dispatch(PageCommand::Tick, start + ms(500)).is_empty());

        let events = page.dispatch(PageCommand::Tick, start + ms(540));
        let navs = navigations(&events);
        assert_eq!(navs.len(), 1);
        assert_eq!(navs[0].query.to_query_string(), "status=APPROVED&search=john");
        assert_eq!(navs[0].mode, HistoryMode::Replace);

        assert!(page.dispatch(PageCommand::Tick, start + ms(5_000)).is_empty());
    }

    #[test]
    fn emptied_search_clears_key() {
        let start = Instant::now();
        let mut page = mount(ListKind::Questions, "search=john");
        page.dispatch(typed(""), start);

        let events = page.dispatch(PageCommand::Tick, start + ms(300));
        let navs = navigations(&events);
        assert_eq!(navs.len(), 1);
        assert!(navs[0].query.is_empty());
    }

    #[test]
    fn retyping_the_same_text_does_not_navigate() {
        let start = Instant::now();
        let mut page = mount(ListKind::Sections, "search=alg");
        page.dispatch(typed("algx"), start);
        page.dispatch(typed("alg"), start + ms(50));

        let events = page.dispatch(PageCommand::Tick, start + ms(400));
        assert!(navigations(&events).is_empty());
        assert_eq!(page.snapshot().to_query_string(), "search=alg");
    }

    #[test]
    fn select_commits_immediately_and_pushes() {
        let mut page = mount(ListKind::Payments, "status=APPROVED&page=3");
        let events = page.dispatch(
            PageCommand::Select {
                key: FilterKey::PaymentStatus,
                value: "PAID".to_owned(),
            },
            Instant::now(),
        );

        let navs = navigations(&events);
        assert_eq!(navs.len(), 1);
        assert_eq!(
            navs[0].query.to_query_string(),
            "status=APPROVED&paymentStatus=PAID"
        );
        assert_eq!(navs[0].mode, HistoryMode::Push);
    }

    #[test]
    fn selecting_all_on_unset_filter_is_quiet() {
        let mut page = mount(ListKind::Users, "");
        let events = page.dispatch(
            PageCommand::Select {
                key: FilterKey::Status,
                value: "all".to_owned(),
            },
            Instant::now(),
        );
        assert_eq!(
            events,
            vec![PageEvent::InputUpdated {
                key: FilterKey::Status,
                value: "all".to_owned(),
            }]
        );
    }

    #[test]
    fn unknown_select_value_is_rejected() {
        let mut page = mount(ListKind::Users, "");
        let events = page.dispatch(
            PageCommand::Select {
                key: FilterKey::Status,
                value: "PAID".to_owned(),
            },
            Instant::now(),
        );
        assert_eq!(
            events,
            vec![PageEvent::Rejected {
                key: FilterKey::Status,
                value: "PAID".to_owned(),
            }]
        );
        assert!(page.snapshot().is_empty());
    }

    #[test]
    fn keys_outside_the_page_are_ignored() {
        let mut page = mount(ListKind::Users, "");
        let now = Instant::now();
        let events = page.dispatch(
            PageCommand::Select {
                key: FilterKey::Topic,
                value: "Sets".to_owned(),
            },
            now,
        );
        assert_eq!(events, vec![PageEvent::Ignored(FilterKey::Topic)]);

        let events = page.dispatch(
            PageCommand::Type {
                key: FilterKey::Status,
                text: "APP".to_owned(),
            },
            now,
        );
        assert_eq!(events, vec![PageEvent::Ignored(FilterKey::Status)]);
    }

    #[test]
    fn paging_keeps_filters_and_first_page_drops_key() {
        let now = Instant::now();
        let mut page = mount(ListKind::Topics, "section=Algebra");

        let events = page.dispatch(PageCommand::GoToPage(2), now);
        assert_eq!(
            navigations(&events)[0].query.to_query_string(),
            "section=Algebra&page=2"
        );
        assert_eq!(page.request().page, 1);

        let events = page.dispatch(PageCommand::GoToPage(1), now);
        assert_eq!(
            navigations(&events)[0].query.to_query_string(),
            "section=Algebra"
        );

        assert!(page.dispatch(PageCommand::GoToPage(1), now).is_empty());
        assert!(matches!(
            page.dispatch(PageCommand::GoToPage(0), now).as_slice(),
            [PageEvent::Rejected { .. }]
        ));
    }

    #[test]
    fn unmount_cancels_pending_search() {
        let start = Instant::now();
        let mut page = mount(ListKind::Users, "");
        page.dispatch(typed("jo"), start);

        let events = page.dispatch(PageCommand::Unmount, start + ms(100));
        assert_eq!(events, vec![PageEvent::TimersCancelled(1)]);
        assert!(page.next_deadline().is_none());
        assert!(page.dispatch(PageCommand::Tick, start + ms(1_000)).is_empty());
        assert!(!page.is_mounted());
    }

    #[test]
    fn clear_filters_resets_everything_in_one_navigation() {
        let start = Instant::now();
        let mut page = mount(ListKind::Questions, "search=x&section=A&topic=B&page=4");
        page.dispatch(typed("xy"), start);

        let events = page.dispatch(PageCommand::ClearFilters, start);
        assert_eq!(events[0], PageEvent::TimersCancelled(1));
        let navs = navigations(&events);
        assert_eq!(navs.len(), 1);
        assert!(navs[0].query.is_empty());
        assert_eq!(page.filters().get(FilterKey::Section), Some("all"));
        assert_eq!(page.filters().get(FilterKey::Search), Some(""));
    }

    #[test]
    fn sync_reseeds_controls_and_drops_timers() {
        let start = Instant::now();
        let mut page = mount(ListKind::Payments, "search=a");
        page.dispatch(typed("ab"), start);

        let target = QuerySnapshot::parse("paymentStatus=FAILED");
        let events = page.dispatch(PageCommand::Sync(target.clone()), start);
        assert_eq!(
            events,
            vec![PageEvent::TimersCancelled(1), PageEvent::Synced(target)]
        );
        assert_eq!(page.filters().get(FilterKey::Search), Some(""));
        assert_eq!(page.filters().get(FilterKey::PaymentStatus), Some("FAILED"));
    }

    #[test]
    fn push_policy_pushes_debounced_commits() {
        let start = Instant::now();
        let settings = PageSettings {
            debounce: ms(100),
            history: HistoryPolicy::Push,
        };
        let mut page = ListPage::mount(ListKind::Tests, QuerySnapshot::new(), settings);
        page.dispatch(typed("math"), start);
        assert_eq!(page.next_deadline(), Some(start + ms(100)));

        let events = page.dispatch(PageCommand::Tick, start + ms(100));
        assert_eq!(navigations(&events)[0].mode, HistoryMode::Push);
    }

    #[test]
    fn huge_debounce_setting_does_not_panic_on_keystroke() {
        let start = Instant::now();
        let settings = PageSettings {
            debounce: Duration::MAX,
            history: HistoryPolicy::Mixed,
        };
        let mut page = ListPage::mount(ListKind::Users, QuerySnapshot::new(), settings);
        page.dispatch(typed("jo"), start);
        assert!(page.next_deadline().is_some_and(|deadline| deadline > start));
    }
}
