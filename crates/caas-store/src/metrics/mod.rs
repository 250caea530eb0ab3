pub mod counters;
pub mod observer;

pub use counters::Counters;
pub use observer::{ObservedQuery, QueryLogger, QueryObserver};
