use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::domain::statements::{
    COUNTER_TABLE, CounterQuery, CounterRow, SchemaStatement, Statement,
};
use crate::error::DbError;
use crate::store::traits::{Attempt, Connector, CounterSession};

#[derive(Debug, Default)]
struct Keyspace {
    replication_factor: u32,
    tables: BTreeSet<String>,
    counters: BTreeMap<String, i64>,
}

/// Process-local stand-in for a cluster: keyspaces, the counter table and
/// counter semantics, shared by every session it opens.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    inner: Arc<RwLock<BTreeMap<String, Keyspace>>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyspaces(&self) -> Result<Vec<String>, DbError> {
        Ok(self.read()?.keys().cloned().collect())
    }

    pub fn replication_factor(&self, keyspace: &str) -> Result<Option<u32>, DbError> {
        Ok(self.read()?.get(keyspace).map(|ks| ks.replication_factor))
    }

    pub fn tables(&self, keyspace: &str) -> Result<Vec<String>, DbError> {
        Ok(self
            .read()?
            .get(keyspace)
            .map(|ks| ks.tables.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn counter_value(&self, keyspace: &str, name: &str) -> Result<Option<i64>, DbError> {
        Ok(self
            .read()?
            .get(keyspace)
            .and_then(|ks| ks.counters.get(name).copied()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Keyspace>>, DbError> {
        self.inner
            .read()
            .map_err(|_| DbError::Backend("poisoned lock".to_string()))
    }

    fn create_keyspace(&self, keyspace: &str, replication_factor: u32) -> Result<(), DbError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| DbError::Backend("poisoned lock".to_string()))?;
        guard
            .entry(keyspace.to_string())
            .or_insert_with(|| Keyspace {
                replication_factor,
                ..Keyspace::default()
            });
        Ok(())
    }

    fn create_counter_table(&self, keyspace: &str) -> Result<(), DbError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| DbError::Backend("poisoned lock".to_string()))?;
        let ks = guard
            .get_mut(keyspace)
            .ok_or_else(|| DbError::Invalid(format!("keyspace {keyspace} does not exist")))?;
        ks.tables.insert(COUNTER_TABLE.to_string());
        Ok(())
    }

    fn apply(&self, keyspace: &str, statement: &Statement<'_>) -> Result<Vec<CounterRow>, DbError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| DbError::Backend("poisoned lock".to_string()))?;
        let ks = guard
            .get_mut(keyspace)
            .ok_or_else(|| DbError::Invalid(format!("keyspace {keyspace} does not exist")))?;
        if !ks.tables.contains(COUNTER_TABLE) {
            return Err(DbError::Invalid(format!("unconfigured table {COUNTER_TABLE}")));
        }

        match statement.query {
            CounterQuery::Increment => {
                *ks.counters.entry(statement.name.to_string()).or_insert(0) += 1;
                Ok(Vec::new())
            }
            CounterQuery::Read => Ok(ks
                .counters
                .get(statement.name)
                .map(|&value| CounterRow {
                    name: statement.name.to_string(),
                    value,
                })
                .into_iter()
                .collect()),
        }
    }
}

#[async_trait::async_trait]
impl Connector for InMemoryCluster {
    type Session = InMemorySession;

    async fn connect(
        &self,
        nodes: &[String],
        keyspace: Option<&str>,
    ) -> Result<InMemorySession, DbError> {
        if nodes.is_empty() {
            return Err(DbError::Connection("no known nodes".to_string()));
        }
        if let Some(ks) = keyspace
            && self.replication_factor(ks)?.is_none()
        {
            return Err(DbError::Invalid(format!("keyspace {ks} does not exist")));
        }
        Ok(InMemorySession {
            cluster: self.clone(),
            keyspace: keyspace.map(str::to_string),
            nodes: nodes.to_vec(),
            next_node: AtomicUsize::new(0),
        })
    }
}

/// Session over an [`InMemoryCluster`]. Attempts round-robin over the
/// contact points so each one reports the node it was "sent" to.
#[derive(Debug)]
pub struct InMemorySession {
    cluster: InMemoryCluster,
    keyspace: Option<String>,
    nodes: Vec<String>,
    next_node: AtomicUsize,
}

impl InMemorySession {
    pub fn cluster(&self) -> &InMemoryCluster {
        &self.cluster
    }

    fn pick_node(&self) -> String {
        let i = self.next_node.fetch_add(1, Ordering::Relaxed);
        self.nodes[i % self.nodes.len()].clone()
    }

    fn keyspace(&self) -> Result<&str, DbError> {
        self.keyspace
            .as_deref()
            .ok_or_else(|| DbError::Invalid("no keyspace has been specified".to_string()))
    }
}

#[async_trait::async_trait]
impl CounterSession for InMemorySession {
    async fn attempt(&self, statement: &Statement<'_>) -> Attempt {
        let host = self.pick_node();
        let result = self
            .keyspace()
            .and_then(|ks| self.cluster.apply(ks, statement));
        Attempt { host, result }
    }

    async fn execute_schema(&self, statement: &SchemaStatement<'_>) -> Result<(), DbError> {
        match statement {
            SchemaStatement::CreateKeyspace {
                keyspace,
                replication_factor,
            } => self.cluster.create_keyspace(keyspace, *replication_factor),
            SchemaStatement::CreateCounterTable => {
                let ks = self.keyspace()?;
                self.cluster.create_counter_table(ks)
            }
        }
    }
}
