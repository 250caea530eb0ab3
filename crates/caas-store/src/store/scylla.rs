use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use scylla::frame::value::Counter as CqlCounter;
use scylla::history::{AttemptId, HistoryListener, QueryId, SpeculativeId};
use scylla::query::Query;
use scylla::retry_policy::{
    FallthroughRetryPolicy, RetryDecision, RetryPolicy as DriverRetryPolicy,
};
use scylla::statement::Consistency as CqlConsistency;
use scylla::transport::errors::{DbError as ServerError, QueryError};
use scylla::{Session, SessionBuilder};

use crate::domain::statements::{
    Consistency, CounterQuery, CounterRow, SchemaStatement, Statement,
};
use crate::error::DbError;
use crate::store::traits::{Attempt, Connector, CounterSession};

const UNKNOWN_HOST: &str = "unknown";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaConnector;

#[async_trait::async_trait]
impl Connector for ScyllaConnector {
    type Session = ScyllaSession;

    async fn connect(
        &self,
        nodes: &[String],
        keyspace: Option<&str>,
    ) -> Result<ScyllaSession, DbError> {
        let mut builder = SessionBuilder::new();
        for node in nodes {
            builder = builder.known_node(node);
        }
        let session = builder
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("scylla connect: {e}")))?;

        if let Some(keyspace) = keyspace {
            session
                .use_keyspace(keyspace, false)
                .await
                .map_err(|e| DbError::classify(format!("use keyspace: {e}")))?;
        }

        Ok(ScyllaSession {
            session: Arc::new(session),
        })
    }
}

/// Driver session with driver-side retries disabled; every attempt goes
/// through the caller's retry loop.
#[derive(Clone)]
pub struct ScyllaSession {
    session: Arc<Session>,
}

#[async_trait::async_trait]
impl CounterSession for ScyllaSession {
    async fn attempt(&self, statement: &Statement<'_>) -> Attempt {
        let target = Arc::new(AttemptTarget::default());
        let fallthrough: Arc<dyn DriverRetryPolicy> = Arc::new(FallthroughRetryPolicy::new());

        let mut query = Query::new(statement.query.cql());
        query.set_consistency(cql_consistency(statement.consistency));
        query.set_retry_policy(Some(fallthrough));
        query.set_history_listener(target.clone());

        let res = self.session.query_unpaged(query, (statement.name,)).await;
        let result = match res {
            Ok(res) => decode_rows(statement.query, res),
            Err(e) => Err(classify_query_error(&e)),
        };
        Attempt {
            host: target.host(),
            result,
        }
    }

    async fn execute_schema(&self, statement: &SchemaStatement<'_>) -> Result<(), DbError> {
        self.session
            .query_unpaged(statement.cql(), ())
            .await
            .map_err(|e| classify_query_error(&e))?;
        Ok(())
    }
}

/// Remembers the node the driver sent the attempt to.
#[derive(Debug, Default)]
struct AttemptTarget {
    node: Mutex<Option<SocketAddr>>,
}

impl AttemptTarget {
    fn host(&self) -> String {
        self.node
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_HOST.to_string())
    }
}

impl HistoryListener for AttemptTarget {
    fn log_query_start(&self) -> QueryId {
        QueryId(0)
    }

    fn log_query_success(&self, _query_id: QueryId) {}

    fn log_query_error(&self, _query_id: QueryId, _error: &QueryError) {}

    fn log_new_speculative_fiber(&self, _query_id: QueryId) -> SpeculativeId {
        SpeculativeId(0)
    }

    fn log_attempt_start(
        &self,
        _query_id: QueryId,
        _speculative_id: Option<SpeculativeId>,
        node_addr: SocketAddr,
    ) -> AttemptId {
        *self.node.lock().unwrap_or_else(PoisonError::into_inner) = Some(node_addr);
        AttemptId(0)
    }

    fn log_attempt_success(&self, _attempt_id: AttemptId) {}

    fn log_attempt_error(
        &self,
        _attempt_id: AttemptId,
        _error: &QueryError,
        _retry_decision: &RetryDecision,
    ) {
    }
}

fn decode_rows(query: CounterQuery, res: scylla::QueryResult) -> Result<Vec<CounterRow>, DbError> {
    if query == CounterQuery::Increment {
        return Ok(Vec::new());
    }
    let rows_result = res
        .into_rows_result()
        .map_err(|e| DbError::Decode(format!("counter rows: {e}")))?;
    let iter = rows_result
        .rows::<(String, CqlCounter)>()
        .map_err(|e| DbError::Decode(format!("counter row type: {e}")))?;
    iter.map(|row| {
        row.map(|(name, value)| CounterRow {
            name,
            value: value.0,
        })
        .map_err(|e| DbError::Decode(format!("decode row: {e}")))
    })
    .collect()
}

fn classify_query_error(err: &QueryError) -> DbError {
    let message = err.to_string();
    match err {
        QueryError::DbError(code, _) => classify_server_error(code, message),
        QueryError::RequestTimeout(_) => DbError::Timeout(message),
        _ => DbError::classify(message),
    }
}

fn classify_server_error(code: &ServerError, message: String) -> DbError {
    match code {
        ServerError::ReadTimeout { .. } | ServerError::WriteTimeout { .. } => {
            DbError::Timeout(message)
        }
        ServerError::Unavailable { .. }
        | ServerError::Overloaded
        | ServerError::IsBootstrapping => DbError::Unavailable(message),
        ServerError::SyntaxError
        | ServerError::Invalid
        | ServerError::ConfigError
        | ServerError::Unauthorized
        | ServerError::AlreadyExists { .. } => DbError::Invalid(message),
        _ => DbError::Backend(message),
    }
}

fn cql_consistency(c: Consistency) -> CqlConsistency {
    match c {
        Consistency::Any => CqlConsistency::Any,
        Consistency::One => CqlConsistency::One,
        Consistency::Two => CqlConsistency::Two,
        Consistency::Three => CqlConsistency::Three,
        Consistency::Quorum => CqlConsistency::Quorum,
        Consistency::All => CqlConsistency::All,
        Consistency::LocalQuorum => CqlConsistency::LocalQuorum,
        Consistency::EachQuorum => CqlConsistency::EachQuorum,
        Consistency::LocalOne => CqlConsistency::LocalOne,
    }
}
