//! # TIM
//!
//! Command line for managing the OpenSearch indexes behind TIMDEX: cluster
//! views, index creation and deletion, alias promotion and demotion, and bulk
//! loads of transformed records from a dataset file.
//!
//! ## Modules
//!
//! - [`cli`]: Argument definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Environment settings and dependency wiring
//! - [`console`]: Prompts and output
//! - [`logging`]: Tracing subscriber set-up
//! - [`reader`]: Transformed record dataset reader
//! - [`reporting`]: Sentry error reporting
//! - [`errors`]: Error types and exit codes

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod errors;
pub mod logging;
pub mod reader;
pub mod reporting;

pub use cli::{Cli, Command};
pub use config::{Dependencies, Settings};
pub use console::Console;
pub use errors::CommandError;
