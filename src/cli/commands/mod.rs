//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod config;
pub mod extract;
pub mod init;
pub mod session;
