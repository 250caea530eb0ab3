use std::time::Duration;

use crate::domain::statements::Consistency;
use crate::error::{Error, Result};
use crate::retry::DEFAULT_MAX_RETRIES;

pub const DEFAULT_KEYSPACE: &str = "caas";
pub const DEFAULT_CQL_PORT: u16 = 9042;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub keyspace: String,
    pub replication_factor: u32,
    pub max_retries: u32,
    pub write_consistency: Consistency,
    pub read_consistency: Consistency,
    /// Deadline applied to each sub-operation, retries included.
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyspace: DEFAULT_KEYSPACE.to_string(),
            replication_factor: 3,
            max_retries: DEFAULT_MAX_RETRIES,
            write_consistency: Consistency::Quorum,
            read_consistency: Consistency::One,
            request_timeout: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_keyspace(&self.keyspace) {
            return Err(Error::Configuration(format!(
                "keyspace must be 1-48 alphanumeric or underscore characters starting with a letter, got {:?}",
                self.keyspace
            )));
        }
        if self.replication_factor == 0 {
            return Err(Error::Configuration(
                "replication_factor must be at least 1".to_string(),
            ));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(Error::Configuration(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_valid_keyspace(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 48
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
