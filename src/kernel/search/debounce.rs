//! 搜索输入去抖：连续输入合并为一次查询

use super::pattern::SearchOptions;
use crate::kernel::services::ports::settings::DEFAULT_SEARCH_DEBOUNCE_MS;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub query: String,
    pub options: SearchOptions,
}

/// Holds the latest query until it has been quiet for `delay`.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(PendingQuery, Instant)>,
    last_issued: Option<PendingQuery>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS))
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            last_issued: None,
        }
    }

    pub fn input(&mut self, query: impl Into<String>, options: SearchOptions) {
        self.input_at(query, options, Instant::now());
    }

    pub fn input_at(&mut self, query: impl Into<String>, options: SearchOptions, now: Instant) {
        let query = PendingQuery {
            query: query.into(),
            options,
        };
        self.pending = Some((query, now + self.delay));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// The query to run, once its deadline has passed. A query identical to
    /// the last one issued is swallowed.
    pub fn poll(&mut self, now: Instant) -> Option<PendingQuery> {
        let (_, deadline) = self.pending.as_ref()?;
        if now < *deadline {
            return None;
        }
        let (query, _) = self.pending.take()?;
        if self.last_issued.as_ref() == Some(&query) {
            return None;
        }
        self.last_issued = Some(query.clone());
        Some(query)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/search/debounce.rs"]
mod tests;
