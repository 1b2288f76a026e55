// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use examdesk_app::{
    FilterKey, History, ListKind, ListPage, PageCommand, PageEvent, PageSettings, QuerySnapshot,
};
use log::error;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use crate::runtime::PageLoader;

const BROWSE_HELP: &str = "commands: /text | set <key> <value> | page <n> | clear | back | show | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct BrowseSession<L, W> {
    page: ListPage,
    history: History,
    loader: L,
    out: W,
}

impl<L: PageLoader, W: Write> BrowseSession<L, W> {
    pub fn new(
        kind: ListKind,
        snapshot: QuerySnapshot,
        settings: PageSettings,
        loader: L,
        out: W,
    ) -> Self {
        Self {
            history: History::new(snapshot.clone()),
            page: ListPage::mount(kind, snapshot, settings),
            loader,
            out,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        writeln!(self.out, "{BROWSE_HELP}")?;
        self.fetch()
    }

    pub fn handle_line(&mut self, line: &str, now: Instant) -> Result<Flow> {
        let line = line.trim();
        if let Some(text) = line.strip_prefix('/') {
            return self.dispatch(
                PageCommand::Type {
                    key: FilterKey::Search,
                    text: text.to_owned(),
                },
                now,
            );
        }

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => Ok(Flow::Continue),
            (Some("quit" | "q" | "exit"), _) => Ok(Flow::Quit),
            (Some("show"), _) => {
                self.fetch()?;
                Ok(Flow::Continue)
            }
            (Some("clear"), _) => self.dispatch(PageCommand::ClearFilters, now),
            (Some("back"), _) => self.back(now),
            (Some("page"), Some(number)) => match number.parse::<u32>() {
                Ok(page) => self.dispatch(PageCommand::GoToPage(page), now),
                Err(_) => self.say(&format!("page expects a number, got {number:?}")),
            },
            (Some("set"), Some(key)) => {
                let value = words.collect::<Vec<_>>().join(" ");
                self.set(key, value, now)
            }
            _ => self.say(BROWSE_HELP),
        }
    }

    pub fn tick(&mut self, now: Instant) -> Result<()> {
        self.dispatch(PageCommand::Tick, now)?;
        Ok(())
    }

    pub fn unmount(&mut self, now: Instant) {
        self.page.dispatch(PageCommand::Unmount, now);
    }

    pub fn run(&mut self, lines: Receiver<String>) -> Result<()> {
        let result = self.drive(&lines);
        self.unmount(Instant::now());
        result
    }

    fn drive(&mut self, lines: &Receiver<String>) -> Result<()> {
        self.start()?;
        loop {
            let received = match self.page.next_deadline() {
                Some(deadline) => {
                    lines.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(line) => {
                    if self.handle_line(&line, Instant::now())? == Flow::Quit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => self.tick(Instant::now())?,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: String, now: Instant) -> Result<Flow> {
        let Some(filter) = FilterKey::parse(key) else {
            return self.say(&format!("unknown filter {key:?}"));
        };
        let command = match filter {
            FilterKey::Search => PageCommand::Type {
                key: filter,
                text: value,
            },
            FilterKey::Page => match value.parse::<u32>() {
                Ok(page) => PageCommand::GoToPage(page),
                Err(_) => return self.say(&format!("page expects a number, got {value:?}")),
            },
            _ => PageCommand::Select { key: filter, value },
        };
        self.dispatch(command, now)
    }

    fn back(&mut self, now: Instant) -> Result<Flow> {
        let Some(previous) = self.history.back().cloned() else {
            return self.say("already at the first entry");
        };
        self.dispatch(PageCommand::Sync(previous), now)
    }

    fn dispatch(&mut self, command: PageCommand, now: Instant) -> Result<Flow> {
        for event in self.page.dispatch(command, now) {
            match event {
                PageEvent::Navigate(navigation) => {
                    self.history.apply(&navigation);
                    self.fetch()?;
                }
                PageEvent::Synced(_) => self.fetch()?,
                PageEvent::Ignored(key) => {
                    writeln!(
                        self.out,
                        "{} is not a filter on the {} page",
                        key.as_str(),
                        self.page.kind().label()
                    )?;
                }
                PageEvent::Rejected { key, value } => {
                    writeln!(self.out, "{value:?} is not a valid {}", key.as_str())?;
                }
                PageEvent::InputUpdated { .. }
                | PageEvent::TimerArmed(_)
                | PageEvent::TimersCancelled(_) => {}
            }
        }
        Ok(Flow::Continue)
    }

    fn fetch(&mut self) -> Result<()> {
        let kind = self.page.kind();
        writeln!(self.out, "?{}", self.page.snapshot())?;
        match self.loader.load_page(kind, &self.page.request()) {
            Ok(view) => write!(self.out, "{}", view.to_text())?,
            Err(fetch_error) => {
                error!("{} fetch failed: {fetch_error:#}", kind.label());
                writeln!(self.out, "fetch failed: {fetch_error}")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn say(&mut self, message: &str) -> Result<Flow> {
        writeln!(self.out, "{message}")?;
        Ok(Flow::Continue)
    }
}

pub fn spawn_stdin_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

#[cfg(test)]
mod tests {
    use super::{BrowseSession, Flow};
    use crate::runtime::PageLoader;
    use anyhow::{Result, bail};
    use examdesk_app::{
        HistoryPolicy, ListKind, ListQuery, PageSettings, QuerySnapshot, TableView,
    };
    use std::io::{self, Write};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingLoader {
        requests: Vec<ListQuery>,
        fail: bool,
    }

    impl PageLoader for RecordingLoader {
        fn load_page(&mut self, kind: ListKind, query: &ListQuery) -> Result<TableView> {
            self.requests.push(query.clone());
            if self.fail {
                bail!("backend offline");
            }
            Ok(TableView {
                title: kind.label(),
                columns: vec!["id"],
                rows: Vec::new(),
                page: query.page + 1,
                total_pages: 1,
                total_items: 0,
            })
        }
    }

    fn browse(
        kind: ListKind,
        query: &str,
    ) -> BrowseSession<RecordingLoader, Vec<u8>> {
        BrowseSession::new(
            kind,
            QuerySnapshot::parse(query),
            PageSettings::default(),
            RecordingLoader::default(),
            Vec::new(),
        )
    }

    fn output(session: &BrowseSession<RecordingLoader, Vec<u8>>) -> String {
        String::from_utf8_lossy(&session.out).into_owned()
    }

    #[test]
    fn typing_fetches_once_after_quiet_period() -> Result<()> {
        let mut session = browse(ListKind::Users, "status=APPROVED&page=3");
        session.start()?;
        let start = Instant::now();

        session.handle_line("/j", start)?;
        session.handle_line("/jo", start + Duration::from_millis(100))?;
        session.handle_line("/john", start + Duration::from_millis(200))?;
        session.tick(start + Duration::from_millis(450))?;
        assert_eq!(session.loader.requests.len(), 1);

        session.tick(start + Duration::from_millis(500))?;
        assert_eq!(session.loader.requests.len(), 2);
        assert_eq!(
            session.page.snapshot().to_query_string(),
            "status=APPROVED&search=john"
        );
        assert_eq!(session.loader.requests[1].page, 0);
        Ok(())
    }

    #[test]
    fn debounced_commit_replaces_history_and_select_pushes() -> Result<()> {
        let mut session = browse(ListKind::Users, "");
        let now = Instant::now();

        session.handle_line("/ada", now)?;
        session.tick(now + Duration::from_millis(300))?;
        assert_eq!(session.history.depth(), 1);

        session.handle_line("set status BLOCKED", now)?;
        assert_eq!(session.history.depth(), 2);
        assert_eq!(
            session.history.current().to_query_string(),
            "search=ada&status=BLOCKED"
        );
        Ok(())
    }

    #[test]
    fn back_restores_previous_query_and_refetches() -> Result<()> {
        let mut session = browse(ListKind::Payments, "paymentStatus=PAID");
        let now = Instant::now();

        session.handle_line("page 2", now)?;
        assert_eq!(session.page.snapshot().page(), 2);
        session.handle_line("back", now)?;
        assert_eq!(
            session.page.snapshot().to_query_string(),
            "paymentStatus=PAID"
        );
        assert_eq!(session.loader.requests.len(), 2);

        session.handle_line("back", now)?;
        assert!(output(&session).contains("already at the first entry"));
        Ok(())
    }

    #[test]
    fn invalid_selections_are_reported_not_sent() -> Result<()> {
        let mut session = browse(ListKind::Users, "");
        let now = Instant::now();

        session.handle_line("set status MAYBE", now)?;
        session.handle_line("set topic Angles", now)?;
        session.handle_line("set colour red", now)?;
        session.handle_line("page zero", now)?;

        assert!(session.loader.requests.is_empty());
        let text = output(&session);
        assert!(text.contains("\"MAYBE\" is not a valid status"));
        assert!(text.contains("topic is not a filter on the users page"));
        assert!(text.contains("unknown filter \"colour\""));
        assert!(text.contains("page expects a number"));
        Ok(())
    }

    #[test]
    fn unchanged_selection_does_not_refetch() -> Result<()> {
        let mut session = browse(ListKind::Tests, "status=DRAFT");
        let now = Instant::now();
        session.handle_line("set status DRAFT", now)?;
        session.handle_line("set status all", now)?;
        session.handle_line("set status all", now)?;
        assert_eq!(session.loader.requests.len(), 1);
        assert!(session.page.snapshot().is_empty());
        Ok(())
    }

    #[test]
    fn fetch_failures_keep_the_session_alive() -> Result<()> {
        let mut session = browse(ListKind::Topics, "");
        session.loader.fail = true;
        session.start()?;
        let flow = session.handle_line("set section Geometry", Instant::now())?;
        assert_eq!(flow, Flow::Continue);
        assert!(output(&session).contains("fetch failed: backend offline"));
        assert_eq!(session.loader.requests.len(), 2);
        Ok(())
    }

    #[test]
    fn run_commits_pending_search_and_stops_on_eof() -> Result<()> {
        let mut session = BrowseSession::new(
            ListKind::Questions,
            QuerySnapshot::default(),
            PageSettings {
                debounce: Duration::from_millis(20),
                history: HistoryPolicy::Mixed,
            },
            RecordingLoader::default(),
            Vec::new(),
        );
        let (sender, receiver) = mpsc::channel();
        let writer = std::thread::spawn(move || {
            sender.send("/triangle".to_owned()).ok();
            std::thread::sleep(Duration::from_millis(150));
            sender.send("quit".to_owned()).ok();
        });

        session.run(receiver)?;
        writer.join().ok();

        assert!(!session.page.is_mounted());
        assert_eq!(session.loader.requests.len(), 2);
        assert_eq!(
            session.loader.requests[1].search[0].to_string(),
            "content:like:triangle"
        );
        Ok(())
    }

    #[test]
    fn quit_before_deadline_cancels_pending_search() -> Result<()> {
        let mut session = browse(ListKind::Users, "");
        let (sender, receiver) = mpsc::channel();
        sender.send("/pending".to_owned())?;
        sender.send("quit".to_owned())?;
        drop(sender);

        session.run(receiver)?;
        assert_eq!(session.loader.requests.len(), 1);
        assert!(session.page.next_deadline().is_none());
        assert!(session.page.snapshot().is_empty());
        Ok(())
    }

    struct LimitedWriter {
        written: usize,
        limit: usize,
    }

    impl Write for LimitedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written + buf.len() > self.limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_failure_still_cancels_pending_timers() -> Result<()> {
        let mut reference = browse(ListKind::Users, "");
        reference.start()?;
        let limit = reference.out.len();

        let mut session = BrowseSession::new(
            ListKind::Users,
            QuerySnapshot::default(),
            PageSettings::default(),
            RecordingLoader::default(),
            LimitedWriter { written: 0, limit },
        );
        let (sender, receiver) = mpsc::channel();
        sender.send("/pending".to_owned())?;
        sender.send("set colour red".to_owned())?;

        let error = session.run(receiver).expect_err("write should fail");
        assert!(format!("{error:#}").contains("stdout closed"));
        assert!(!session.page.is_mounted());
        assert!(session.page.next_deadline().is_none());
        drop(sender);
        Ok(())
    }
}
