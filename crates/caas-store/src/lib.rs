pub mod api;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod store;

pub use api::CounterService;
pub use bootstrap::{bootstrap, resolve_nodes};
pub use config::Config;
pub use domain::types::{Counter, QueryStat};
pub use error::{DbError, Error, ReadFailure, Result};
pub use retry::{RetryPolicy, SimpleRetryPolicy};
pub use store::counter::CounterStore;
