// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerHandle<K> {
    key: K,
    generation: u64,
}

impl<K> TimerHandle<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    deadline: Instant,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    pending: HashMap<K, Pending>,
    next_generation: u64,
}

impl<K: Clone + Eq + Hash> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: delay.min(MAX_DEBOUNCE),
            pending: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn arm(&mut self, key: K, now: Instant) -> TimerHandle<K> {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(
            key.clone(),
            Pending {
                deadline: now + self.delay,
                generation,
            },
        );
        TimerHandle { key, generation }
    }

    pub fn cancel(&mut self, handle: &TimerHandle<K>) -> bool {
        match self.pending.get(&handle.key) {
            Some(pending) if pending.generation == handle.generation => {
                self.pending.remove(&handle.key);
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    pub fn fire_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, u64, K)> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(key, pending)| (pending.deadline, pending.generation, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, generation, _)| (*deadline, *generation));

        for (_, _, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, _, key)| key).collect()
    }
}
