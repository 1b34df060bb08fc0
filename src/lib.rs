// src/lib.rs
pub mod aggregator;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod sources;
pub mod types;

pub use aggregator::Aggregator;
pub use cli::Args;
pub use engine::LeviathanEngine;
pub use output::{ConsoleReporter, Reporter};
pub use types::{Config, LeviathanError, LivenessResult, RunReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
