pub mod counter;
pub mod exec;
pub mod memory;
pub mod traits;

#[cfg(feature = "cluster")]
pub mod scylla;
