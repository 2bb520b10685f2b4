//! Command channel to the module under test
//!
//! Every interaction with the module goes through [`CommandChannel`]:
//! one call, one external operation, completed before the next is issued.

mod sysfs;

pub use sysfs::{shell_quote, SysfsChannel};

use async_trait::async_trait;
use std::fmt;

use crate::common::Result;

/// External operations issued to the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Load,
    Unload,
    WriteParameter { key: String },
    ReadLog,
    ClearLog,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => write!(f, "load"),
            Operation::Unload => write!(f, "unload"),
            Operation::WriteParameter { key } => write!(f, "write parameter '{}'", key),
            Operation::ReadLog => write!(f, "read log"),
            Operation::ClearLog => write!(f, "clear log"),
        }
    }
}

/// Control surface of a module under test
///
/// Implementations report a non-zero external status as
/// [`Error::Execution`](crate::common::Error::Execution).
#[async_trait]
pub trait CommandChannel: Send {
    /// Name of the module this channel drives
    fn module(&self) -> &str;

    /// Load the module
    async fn load(&mut self) -> Result<()>;

    /// Unload the module
    async fn unload(&mut self) -> Result<()>;

    /// Write one parameter in the module's namespace
    async fn write_parameter(&mut self, key: &str, value: &str) -> Result<()>;

    /// Full content of the diagnostic log
    async fn read_log(&mut self) -> Result<String>;

    /// Reset the diagnostic log to empty
    async fn clear_log(&mut self) -> Result<()>;
}
