// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::fmt;
use url::form_urlencoded;

pub const ALL_SENTINEL: &str = "all";
pub const PAGE_KEY: &str = "page";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySnapshot {
    pairs: Vec<(String, String)>,
}

impl QuerySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_start_matches('?');
        let mut snapshot = Self::new();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() || snapshot.get(&key).is_some() {
                continue;
            }
            snapshot.pairs.push((key.into_owned(), value.into_owned()));
        }
        snapshot
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.pairs.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, existing)) => value.clone_into(existing),
            None => self.pairs.push((key.to_owned(), value.to_owned())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.pairs.iter().position(|(existing, _)| existing == key)?;
        Some(self.pairs.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    pub fn page(&self) -> u32 {
        self.get(PAGE_KEY)
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1)
    }
}

impl fmt::Display for QuerySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    entries: Vec<(String, Option<String>)>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.push(key, Some(value));
        self
    }

    pub fn clear(mut self, key: &str) -> Self {
        self.push(key, None);
        self
    }

    pub fn push(&mut self, key: &str, value: Option<&str>) {
        self.entries
            .push((key.to_owned(), value.map(ToOwned::to_owned)));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn from_assignments<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patch = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let Some((key, value)) = arg.split_once('=') else {
                bail!("filter change {arg:?} must look like key=value (use key= to clear)");
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("filter change {arg:?} has an empty key");
            }
            patch.push(key, Some(value.trim()));
        }
        Ok(patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub next: QuerySnapshot,
    pub changed: bool,
}

// Any change to a key other than `page` drops `page`.
pub fn reconcile(current: &QuerySnapshot, proposed: &FilterPatch) -> Reconciled {
    let mut next = current.clone();
    let mut changed = false;
    let mut filter_changed = false;

    for (key, value) in proposed.iter() {
        let old = next.get(key).filter(|old| *old != ALL_SENTINEL);
        let key_changed = match normalize(value) {
            None => old.is_some() && next.remove(key).is_some(),
            Some(value) if old != Some(value) => {
                next.set(key, value);
                true
            }
            Some(_) => false,
        };

        if key_changed {
            changed = true;
            if key != PAGE_KEY {
                filter_changed = true;
            }
        }
    }

    if filter_changed {
        next.remove(PAGE_KEY);
    }

    Reconciled { next, changed }
}

fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|value| *value != ALL_SENTINEL && !value.is_empty())
}
