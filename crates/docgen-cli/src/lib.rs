//! Library side of the `conga-docgen` command line tool.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
