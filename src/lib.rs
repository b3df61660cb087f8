pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod output;
pub mod prompts;
pub mod report;
pub mod server;
pub mod session;
pub mod types;

pub use error::{Error, Result};
