use std::time::Instant;

use crate::domain::statements::{CounterRow, Statement};
use crate::error::DbError;
use crate::metrics::{ObservedQuery, QueryObserver};
use crate::retry::RetryPolicy;
use crate::store::traits::{Attempt, CounterSession};

/// Runs `statement` until it succeeds or `policy` gives up, reporting every
/// attempt to `observer`. Attempts are sequential; the last error is returned
/// unchanged.
pub async fn execute<S: CounterSession + ?Sized>(
    session: &S,
    statement: &Statement<'_>,
    policy: &dyn RetryPolicy,
    observer: &dyn QueryObserver,
) -> Result<Vec<CounterRow>, DbError> {
    let cql = statement.query.cql();
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let start = Instant::now();
        let Attempt { host, result } = session.attempt(statement).await;
        let end = Instant::now();

        observer.observe_query(&ObservedQuery {
            statement: cql,
            attempts,
            start,
            end,
            host: &host,
            rows: result.as_ref().map_or(0, Vec::len),
            error: result.as_ref().err(),
        });

        match result {
            Ok(rows) => return Ok(rows),
            Err(e) => {
                if !policy.should_retry(attempts, &e) {
                    return Err(e);
                }
                tracing::warn!(
                    query = %statement.query,
                    name = statement.name,
                    attempts,
                    host = %host,
                    error = %e,
                    "retrying counter query"
                );
            }
        }
    }
}
