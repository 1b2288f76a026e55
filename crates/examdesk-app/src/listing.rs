// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::{
    ALL_SENTINEL, FilterKey, ListKind, PAGE_KEY, Page, Payment, Question, QuerySnapshot, Section,
    Test, TestAccess, Topic, User,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub field: &'static str,
    pub op: &'static str,
    pub value: String,
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.field, self.op, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub search: Vec<SearchTerm>,
}

impl ListQuery {
    pub fn from_snapshot(kind: ListKind, snapshot: &QuerySnapshot) -> Self {
        let search = kind
            .filters()
            .iter()
            .filter_map(|field| {
                let value = snapshot.get(field.key.as_str())?;
                if value.is_empty() || value == ALL_SENTINEL || !field.accepts(value) {
                    return None;
                }
                Some(SearchTerm {
                    field: field.search_field,
                    op: field.op.as_str(),
                    value: value.to_owned(),
                })
            })
            .collect();

        Self {
            page: snapshot.page() - 1,
            search,
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(PAGE_KEY, self.page.to_string())];
        pairs.extend(
            self.search
                .iter()
                .map(|term| (FilterKey::Search.as_str(), term.to_string())),
        );
        pairs
    }
}

pub trait Tabular {
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub title: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl TableView {
    pub fn from_page<T: Tabular>(kind: ListKind, page: &Page<T>) -> Self {
        Self {
            title: kind.label(),
            columns: T::COLUMNS.to_vec(),
            rows: page.data.iter().map(Tabular::cells).collect(),
            page: page.current_page.saturating_add(1),
            total_pages: page.total_pages,
            total_items: page.total_items,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: page {}/{}, {} item{}",
            self.title,
            self.page,
            self.total_pages.max(1),
            self.total_items,
            if self.total_items == 1 { "" } else { "s" }
        )
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.summary());
        out.push('\n');
        if self.rows.is_empty() {
            out.push_str("(no rows)\n");
            return out;
        }

        out.push_str(&self.columns.join(" | "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(" | "));
            out.push('\n');
        }
        out
    }
}

fn format_timestamp(value: Option<OffsetDateTime>) -> String {
    value
        .and_then(|value| {
            value
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_default()
}

fn format_optional(value: Option<&str>) -> String {
    value.unwrap_or_default().to_owned()
}

impl Tabular for User {
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "email", "role", "status", "created"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.full_name.clone(),
            self.email.clone(),
            self.role.as_str().to_owned(),
            self.status.as_str().to_owned(),
            format_timestamp(self.created_at),
        ]
    }
}

impl Tabular for Test {
    const COLUMNS: &'static [&'static str] = &["id", "title", "price", "minutes", "status"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.price.to_string(),
            self.duration_minutes.to_string(),
            self.status.as_str().to_owned(),
        ]
    }
}

impl Tabular for Section {
    const COLUMNS: &'static [&'static str] = &["id", "title", "test", "status"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.test_id.map(|id| id.to_string()).unwrap_or_default(),
            self.status.as_str().to_owned(),
        ]
    }
}

impl Tabular for Topic {
    const COLUMNS: &'static [&'static str] = &["id", "title", "section"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.section_title
                .clone()
                .unwrap_or_else(|| self.section_id.to_string()),
        ]
    }
}

impl Tabular for Question {
    const COLUMNS: &'static [&'static str] = &["id", "content", "section", "topic", "answer"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.content.clone(),
            format_optional(self.section_title.as_deref()),
            format_optional(self.topic_title.as_deref()),
            self.correct_option.clone(),
        ]
    }
}

impl Tabular for Payment {
    const COLUMNS: &'static [&'static str] =
        &["id", "user", "amount", "status", "reference", "created"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.user_email.clone(),
            self.amount.to_string(),
            self.status.as_str().to_owned(),
            self.reference.clone(),
            format_timestamp(self.created_at),
        ]
    }
}

impl Tabular for TestAccess {
    const COLUMNS: &'static [&'static str] = &["id", "user", "test", "granted", "expires"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.user_email
                .clone()
                .unwrap_or_else(|| self.user_id.to_string()),
            self.test_title
                .clone()
                .unwrap_or_else(|| self.test_id.to_string()),
            format_timestamp(self.granted_at),
            format_timestamp(self.expires_at),
        ]
    }
}
