use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::domain::types::QueryStat;
use crate::error::DbError;

/// Telemetry for one physical attempt, handed to a [`QueryObserver`].
#[derive(Debug, Clone, Copy)]
pub struct ObservedQuery<'a> {
    pub statement: &'a str,
    /// Cumulative attempts for the logical query, this one included.
    pub attempts: u32,
    pub start: Instant,
    pub end: Instant,
    pub host: &'a str,
    pub rows: usize,
    pub error: Option<&'a DbError>,
}

pub trait QueryObserver: Send + Sync {
    fn observe_query(&self, query: &ObservedQuery<'_>);
}

/// Collects one [`QueryStat`] per attempt, in the order attempts complete.
///
/// Created per request and never shared between requests.
#[derive(Debug, Default)]
pub struct QueryLogger {
    stats: Mutex<Vec<QueryStat>>,
}

impl QueryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_stats(self) -> Vec<QueryStat> {
        self.stats.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueryObserver for QueryLogger {
    fn observe_query(&self, query: &ObservedQuery<'_>) {
        let stat = QueryStat {
            statement: query.statement.to_string(),
            attempts: query.attempts,
            time_ms: query.end.saturating_duration_since(query.start).as_secs_f64() * 1000.0,
            host: query.host.to_string(),
            rows: query.rows,
        };
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stat);
    }
}
