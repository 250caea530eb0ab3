use crate::domain::statements::{CounterRow, SchemaStatement, Statement};
use crate::error::DbError;

/// Outcome of one physical attempt, tagged with the node that served it.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub host: String,
    pub result: Result<Vec<CounterRow>, DbError>,
}

/// Long-lived handle to the cluster. Safe for concurrent use.
#[async_trait::async_trait]
pub trait CounterSession: Send + Sync {
    /// Sends `statement` once, to a single node, without retrying.
    async fn attempt(&self, statement: &Statement<'_>) -> Attempt;
    async fn execute_schema(&self, statement: &SchemaStatement<'_>) -> Result<(), DbError>;
}

/// Opens sessions against a set of contact points.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Session: CounterSession;

    async fn connect(
        &self,
        nodes: &[String],
        keyspace: Option<&str>,
    ) -> Result<Self::Session, DbError>;
}
