//! Per-request timing keyed by host and path.
//!
//! Shared by every connection task; each finished exchange folds its
//! duration into the running aggregate for `host + path`, so memory grows
//! with the number of distinct keys only.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

/// Concurrent store of per-key request timing aggregates.
#[derive(Debug, Default)]
pub struct Profiler {
    stats: DashMap<String, KeyStats>,
}

/// Running count, total and maximum for one key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    pub count: usize,
    pub total: Duration,
    pub max: Duration,
}

impl KeyStats {
    fn add(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }
}

/// Aggregate for one host+path key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub key: String,
    pub count: usize,
    pub total_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(host: &str, path: &str) -> String {
        format!("{}{}", host, path)
    }

    pub fn record(&self, host: &str, path: &str, elapsed: Duration) {
        self.stats.entry(Self::key(host, path)).or_default().add(elapsed);
    }

    /// Aggregate for one key, if anything was recorded under it.
    pub fn stats(&self, host: &str, path: &str) -> Option<KeyStats> {
        self.stats.get(&Self::key(host, path)).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// One entry per key, slowest total first.
    pub fn summary(&self) -> Vec<ProfileEntry> {
        let mut entries: Vec<ProfileEntry> = self
            .stats
            .iter()
            .map(|entry| {
                let stats = entry.value();
                let total_ms = stats.total.as_secs_f64() * 1000.0;
                ProfileEntry {
                    key: entry.key().clone(),
                    count: stats.count,
                    total_ms,
                    mean_ms: if stats.count == 0 { 0.0 } else { total_ms / stats.count as f64 },
                    max_ms: stats.max.as_secs_f64() * 1000.0,
                }
            })
            .collect();
        entries.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms));
        entries
    }

    pub fn clear(&self) {
        self.stats.clear();
    }
}
