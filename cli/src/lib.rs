//! toolgraph CLI library: demo capabilities, one-shot runs and output formatting.
//!
//! The binary (`toolgraph`) is a thin clap layer over [`run_query`] and the graph renderers.

pub mod demo;
pub mod display;
mod run;

pub use run::{engine_config, run_query, CliError, RunFailure, RunOptions, RunReport};
