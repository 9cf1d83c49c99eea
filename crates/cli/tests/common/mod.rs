//! Common utilities for integration tests

pub mod cli;

#[allow(unused_imports)]
pub use cli::{wait_until, CommandResult, Sandbox, WsyncCommand};
