//! Command handlers, one module per subcommand.

pub mod completions;
pub mod config;
pub mod list;
pub mod progress;
pub mod review;
pub mod rules;
pub mod run;
