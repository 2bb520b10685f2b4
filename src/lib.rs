//! modcheck - black-box conformance harness for kernel modules
//!
//! Loads a module, drives it through its parameter namespace, and checks
//! the kernel log for the lines each command should produce.

pub mod channel;
pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use channel::CommandChannel;
pub use common::{Error, Result};
