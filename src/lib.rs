//! regen - rebuild a versions history from captured snapshots
//!
//! Snapshots are replayed in fetch order through the declarations in force
//! at their fetch date and the operator's skip rules. Every snapshot whose
//! extracted text differs from the latest recorded version becomes a new
//! version.

pub mod cli;
pub mod config;
pub mod declarations;
pub mod error;
pub mod extract;
pub mod files;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod rules;
pub mod snapshots;
pub mod theme;
pub mod versions;

pub use config::Config;
pub use error::{RegenError, Result};
