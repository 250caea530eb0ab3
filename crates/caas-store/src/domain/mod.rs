pub mod statements;
pub mod types;
