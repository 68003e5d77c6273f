//! # flink-cli
//!
//! Interactive shell for the Flink SQL statement service.
//!
//! Provides:
//! - Statement splitting for interactive input and scripts
//! - An HTTP implementation of [`flink_store::FlinkGateway`]
//! - Table and JSON rendering of results and errors
//! - Persistent statement history and a line-editing prompt
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐   lines   ┌───────┐  statements  ┌────────────────┐   HTTP   ┌─────────┐
//! │  stdin  │──────────►│ Shell │─────────────►│ StatementStore │─────────►│ service │
//! └─────────┘           └───────┘              └────────────────┘          └─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod output;
pub mod readline;
pub mod shell;

pub use cli::{Cli, Format};
pub use client::HttpGateway;
pub use config::ShellConfig;
pub use error::CliError;
pub use history::History;
pub use output::OutputFormat;
pub use readline::Readline;
pub use shell::{AsyncLines, LineReader, ReadLine, Shell, StatementSplitter, Step, split_statements};
