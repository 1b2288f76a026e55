// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{ALL_SENTINEL, PAGE_KEY, PaymentStatus, TestStatus, UserStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKey {
    Search,
    Status,
    PaymentStatus,
    Section,
    Topic,
    Page,
}

impl FilterKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Status => "status",
            Self::PaymentStatus => "paymentStatus",
            Self::Section => "section",
            Self::Topic => "topic",
            Self::Page => PAGE_KEY,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "search" => Some(Self::Search),
            "status" => Some(Self::Status),
            "paymentStatus" => Some(Self::PaymentStatus),
            "section" => Some(Self::Section),
            "topic" => Some(Self::Topic),
            PAGE_KEY => Some(Self::Page),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOp {
    Like,
    Eq,
}

impl SearchOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Eq => "eq",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    Select { options: &'static [&'static str] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub key: FilterKey,
    pub kind: FilterKind,
    pub search_field: &'static str,
    pub op: SearchOp,
}

impl FilterField {
    const fn text(search_field: &'static str) -> Self {
        Self {
            key: FilterKey::Search,
            kind: FilterKind::Text,
            search_field,
            op: SearchOp::Like,
        }
    }

    const fn select(
        key: FilterKey,
        options: &'static [&'static str],
        search_field: &'static str,
    ) -> Self {
        Self {
            key,
            kind: FilterKind::Select { options },
            search_field,
            op: SearchOp::Eq,
        }
    }

    pub const fn is_debounced(&self) -> bool {
        matches!(self.kind, FilterKind::Text)
    }

    pub const fn unset_value(&self) -> &'static str {
        match self.kind {
            FilterKind::Text => "",
            FilterKind::Select { .. } => ALL_SENTINEL,
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self.kind {
            FilterKind::Text => true,
            FilterKind::Select { options } => {
                value == ALL_SENTINEL
                    || value.is_empty()
                    || options.is_empty()
                    || options.contains(&value)
            }
        }
    }
}

const USER_STATUSES: [&str; 4] = [
    UserStatus::ALL[0].as_str(),
    UserStatus::ALL[1].as_str(),
    UserStatus::ALL[2].as_str(),
    UserStatus::ALL[3].as_str(),
];

const TEST_STATUSES: [&str; 3] = [
    TestStatus::ALL[0].as_str(),
    TestStatus::ALL[1].as_str(),
    TestStatus::ALL[2].as_str(),
];

const PAYMENT_STATUSES: [&str; 4] = [
    PaymentStatus::ALL[0].as_str(),
    PaymentStatus::ALL[1].as_str(),
    PaymentStatus::ALL[2].as_str(),
    PaymentStatus::ALL[3].as_str(),
];

const USER_FILTERS: [FilterField; 2] = [
    FilterField::text("fullName"),
    FilterField::select(FilterKey::Status, &USER_STATUSES, "status"),
];

const TEST_FILTERS: [FilterField; 2] = [
    FilterField::text("title"),
    FilterField::select(FilterKey::Status, &TEST_STATUSES, "status"),
];

const SECTION_FILTERS: [FilterField; 2] = [
    FilterField::text("title"),
    FilterField::select(FilterKey::Status, &TEST_STATUSES, "status"),
];

const TOPIC_FILTERS: [FilterField; 2] = [
    FilterField::text("title"),
    FilterField::select(FilterKey::Section, &[], "section.title"),
];

const QUESTION_FILTERS: [FilterField; 3] = [
    FilterField::text("content"),
    FilterField::select(FilterKey::Section, &[], "section.title"),
    FilterField::select(FilterKey::Topic, &[], "topic.title"),
];

const PAYMENT_FILTERS: [FilterField; 2] = [
    FilterField::text("user.email"),
    FilterField::select(FilterKey::PaymentStatus, &PAYMENT_STATUSES, "status"),
];

const TEST_ACCESS_FILTERS: [FilterField; 1] = [FilterField::text("user.email")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Users,
    Tests,
    Sections,
    Topics,
    Questions,
    Payments,
    TestAccess,
}

impl ListKind {
    pub const ALL: [Self; 7] = [
        Self::Users,
        Self::Tests,
        Self::Sections,
        Self::Topics,
        Self::Questions,
        Self::Payments,
        Self::TestAccess,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tests => "tests",
            Self::Sections => "sections",
            Self::Topics => "topics",
            Self::Questions => "questions",
            Self::Payments => "payments",
            Self::TestAccess => "access",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "users" | "user" => Some(Self::Users),
            "tests" | "test" => Some(Self::Tests),
            "sections" | "section" => Some(Self::Sections),
            "topics" | "topic" => Some(Self::Topics),
            "questions" | "question" => Some(Self::Questions),
            "payments" | "payment" => Some(Self::Payments),
            "access" | "test-access" => Some(Self::TestAccess),
            _ => None,
        }
    }

    pub const fn filters(self) -> &'static [FilterField] {
        match self {
            Self::Users => &USER_FILTERS,
            Self::Tests => &TEST_FILTERS,
            Self::Sections => &SECTION_FILTERS,
            Self::Topics => &TOPIC_FILTERS,
            Self::Questions => &QUESTION_FILTERS,
            Self::Payments => &PAYMENT_FILTERS,
            Self::TestAccess => &TEST_ACCESS_FILTERS,
        }
    }

    pub fn field(self, key: FilterKey) -> Option<&'static FilterField> {
        self.filters().iter().find(|field| field.key == key)
    }

    pub fn recognizes(self, key: FilterKey) -> bool {
        key == FilterKey::Page || self.field(key).is_some()
    }
}
