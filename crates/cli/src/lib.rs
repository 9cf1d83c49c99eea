//! Library half of the wsync binary
//!
//! This crate provides:
//! - The lifecycle supervisor and the flush loop
//! - Per-root daemon locks
//! - Configuration file handling and logging setup

pub mod daemon;
pub mod flush;
pub mod locks;
pub mod logging;
pub mod system_config;
pub mod util;

#[cfg(test)]
mod testing;
