// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::QuerySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryMode {
    Push,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryPolicy {
    Push,
    Replace,
    #[default]
    Mixed,
}

impl HistoryPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Replace => "replace",
            Self::Mixed => "mixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "push" => Some(Self::Push),
            "replace" => Some(Self::Replace),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub const fn mode_for(self, debounced: bool) -> HistoryMode {
        match self {
            Self::Push => HistoryMode::Push,
            Self::Replace => HistoryMode::Replace,
            Self::Mixed if debounced => HistoryMode::Replace,
            Self::Mixed => HistoryMode::Push,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub query: QuerySnapshot,
    pub mode: HistoryMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<QuerySnapshot>,
}

impl History {
    pub fn new(initial: QuerySnapshot) -> Self {
        Self {
            entries: vec![initial],
        }
    }

    pub fn current(&self) -> &QuerySnapshot {
        // `entries` always holds the initial snapshot.
        &self.entries[self.entries.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn apply(&mut self, navigation: &Navigation) {
        match navigation.mode {
            HistoryMode::Push => self.entries.push(navigation.query.clone()),
            HistoryMode::Replace => {
                let last = self.entries.len() - 1;
                self.entries[last] = navigation.query.clone();
            }
        }
    }

    pub fn back(&mut self) -> Option<&QuerySnapshot> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop();
        Some(self.current())
    }
}
