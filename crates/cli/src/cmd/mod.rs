//! CLI command implementations

pub mod config;
pub mod status;
pub mod stop;
pub mod watch;
