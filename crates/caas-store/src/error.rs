use std::time::Duration;

use crate::domain::statements::CounterQuery;

/// Failure of a single physical attempt against the cluster.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("replicas unavailable: {0}")]
    Unavailable(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl DbError {
    /// Buckets a driver error message into a coarse class. Used for errors that
    /// carry no typed server code.
    pub fn classify(message: String) -> Self {
        let s = message.to_ascii_lowercase();
        if s.contains("timeout") || s.contains("timed out") || s.contains("in time") {
            Self::Timeout(message)
        } else if s.contains("unavailable")
            || s.contains("overloaded")
            || s.contains("not enough nodes are alive")
            || s.contains("bootstrapping")
        {
            Self::Unavailable(message)
        } else if s.contains("connection")
            || s.contains("refused")
            || s.contains("reset")
            || s.contains("broken pipe")
        {
            Self::Connection(message)
        } else if s.contains("syntax")
            || s.contains("invalid")
            || s.contains("unconfigured")
            || s.contains("bad query")
        {
            Self::Invalid(message)
        } else {
            Self::Backend(message)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadFailure {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("no row returned")]
    MissingRow,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("cluster connection failed: {0}")]
    Connection(#[source] DbError),
    #[error("schema error during {op}: {source}")]
    Schema {
        op: &'static str,
        #[source]
        source: DbError,
    },
    #[error("invalid counter name: {0:?}")]
    InvalidName(String),
    #[error("error incrementing {name:?}: {source}")]
    Increment {
        name: String,
        #[source]
        source: DbError,
    },
    #[error("error reading {name:?}: {source}")]
    Read {
        name: String,
        #[source]
        source: ReadFailure,
    },
    #[error("{query} of {name:?} exceeded its deadline of {timeout:?}")]
    Timeout {
        name: String,
        query: CounterQuery,
        timeout: Duration,
    },
}

impl Error {
    /// Whether the increment may have been applied even though an error was returned.
    ///
    /// A read-stage failure means the write went through but its result could not be
    /// confirmed. A deadline can expire after the increment reached a replica, so any
    /// timeout counts as possibly applied.
    pub fn increment_applied(&self) -> bool {
        matches!(self, Error::Read { .. } | Error::Timeout { .. })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
