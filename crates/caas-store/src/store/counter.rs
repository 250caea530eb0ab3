use std::sync::Arc;

use crate::config::Config;
use crate::domain::statements::{Consistency, CounterQuery, CounterRow, Statement};
use crate::domain::types::Counter;
use crate::error::{Error, ReadFailure, Result};
use crate::metrics::{Counters, QueryLogger};
use crate::retry::{RetryPolicy, SimpleRetryPolicy};
use crate::store::exec::execute;
use crate::store::traits::CounterSession;

/// Increment-then-read over a single owned session.
pub struct CounterStore<S: CounterSession> {
    session: S,
    host: String,
    config: Config,
    retry_policy: Arc<dyn RetryPolicy>,
    counters: Counters,
}

impl<S: CounterSession> CounterStore<S> {
    pub fn new(session: S, host: impl Into<String>, config: Config) -> Self {
        let retry_policy = Arc::new(SimpleRetryPolicy::new(config.max_retries));
        Self {
            session,
            host: host.into(),
            config,
            retry_policy,
            counters: Counters::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Releases the session. Outstanding borrows must have ended.
    pub fn close(self) {
        tracing::info!(host = %self.host, "closing counter store");
    }

    pub(crate) async fn increment_counter(&self, name: &str) -> Result<Counter> {
        self.counters.inc_request();
        let res = self.run_protocol(name).await;
        if let Err(e) = &res {
            self.counters.record_error(e);
            tracing::error!(name, error = %e, applied = e.increment_applied(), "increment_and_get failed");
        }
        res
    }

    async fn run_protocol(&self, name: &str) -> Result<Counter> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }

        let observer = QueryLogger::new();
        self.run(CounterQuery::Increment, name, &observer).await?;
        let rows = self.run(CounterQuery::Read, name, &observer).await?;
        let row = rows.into_iter().next().ok_or_else(|| Error::Read {
            name: name.to_string(),
            source: ReadFailure::MissingRow,
        })?;

        let counter = Counter {
            name: name.to_string(),
            value: row.value,
            host: self.host.clone(),
            db_stats: observer.into_stats(),
        };
        tracing::debug!(
            name,
            value = counter.value,
            queries = counter.db_stats.len(),
            "counter incremented"
        );
        Ok(counter)
    }

    async fn run(
        &self,
        query: CounterQuery,
        name: &str,
        observer: &QueryLogger,
    ) -> Result<Vec<CounterRow>> {
        let statement = Statement {
            query,
            name,
            consistency: self.consistency_for(query),
        };
        let exec = execute(
            &self.session,
            &statement,
            self.retry_policy.as_ref(),
            observer,
        );
        let outcome = match self.config.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, exec)
                .await
                .map_err(|_| Error::Timeout {
                    name: name.to_string(),
                    query,
                    timeout,
                })?,
            None => exec.await,
        };
        outcome.map_err(|source| match query {
            CounterQuery::Increment => Error::Increment {
                name: name.to_string(),
                source,
            },
            CounterQuery::Read => Error::Read {
                name: name.to_string(),
                source: ReadFailure::Db(source),
            },
        })
    }

    fn consistency_for(&self, query: CounterQuery) -> Consistency {
        match query {
            CounterQuery::Increment => self.config.write_consistency,
            CounterQuery::Read => self.config.read_consistency,
        }
    }
}
