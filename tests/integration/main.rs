//! Integration tests for regen
//!
//! All integration tests live in this single binary.

mod cli_test;
mod helpers;
mod pipeline_test;
mod rules_test;
