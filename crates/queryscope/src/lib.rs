#![forbid(unsafe_code)]

pub mod advisor;
pub mod backend;
pub mod cli;
pub mod config;
pub mod estimator;
pub mod models;
pub mod scanner;
pub mod sqlite;
pub mod utils;

pub use advisor::{Advisor, AdvisoryStore, ExecutionBackend};
pub use cli::app::{Cli, Command};
