//! Shell-backed channel: modprobe/rmmod, sysfs parameter writes, dmesg
//!
//! The commands are templates from [`ChannelConfig`] so the same engine can
//! drive a module through sudo, a container exec, or a test double script.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::{CommandChannel, Operation};
use crate::common::config::ChannelConfig;
use crate::common::{Error, Result};

/// Captured result of one shell invocation
#[derive(Debug)]
struct ShellOutput {
    stdout: String,
    stderr: String,
    status: i32,
    success: bool,
}

/// Channel that runs the configured shell templates
pub struct SysfsChannel {
    module: String,
    config: ChannelConfig,
}

impl SysfsChannel {
    pub fn new(module: &str, config: ChannelConfig) -> Self {
        Self {
            module: module.to_string(),
            config,
        }
    }

    /// Verify the configured shell can be found before anything runs
    pub fn check_shell(&self) -> Result<()> {
        which::which(&self.config.shell)
            .map(|_| ())
            .map_err(|_| Error::ToolMissing(self.config.shell.clone()))
    }

    /// Path of a parameter inside the module's namespace
    pub fn parameter_path(&self, key: &str) -> String {
        let root = self.config.parameter_root.replace("{module}", &self.module);
        format!("{}/{}", root.trim_end_matches('/'), key)
    }

    /// Render a command template for this module
    pub fn render(&self, template: &str, key: Option<&str>, value: Option<&str>) -> String {
        let mut cmd = template.replace("{module}", &shell_quote(&self.module));
        if let Some(key) = key {
            cmd = cmd
                .replace("{path}", &shell_quote(&self.parameter_path(key)))
                .replace("{key}", &shell_quote(key));
        }
        if let Some(value) = value {
            cmd = cmd.replace("{value}", &shell_quote(value));
        }
        cmd
    }

    async fn run(&self, op: Operation, command: &str) -> Result<ShellOutput> {
        debug!(operation = %op, command, "Running channel command");

        let output = Command::new(&self.config.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::execution(&op.to_string(), -1, &e.to_string()))?;

        let result = ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        };

        if !result.success {
            debug!(operation = %op, status = result.status, "Channel command failed");
            return Err(Error::execution(&op.to_string(), result.status, &result.stderr));
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl CommandChannel for SysfsChannel {
    fn module(&self) -> &str {
        &self.module
    }

    async fn load(&mut self) -> Result<()> {
        let cmd = self.render(&self.config.load, None, None);
        self.run(Operation::Load, &cmd).await?;
        tokio::time::sleep(self.config.load_settle()).await;
        Ok(())
    }

    async fn unload(&mut self) -> Result<()> {
        let cmd = self.render(&self.config.unload, None, None);
        self.run(Operation::Unload, &cmd).await?;
        tokio::time::sleep(self.config.load_settle()).await;
        Ok(())
    }

    async fn write_parameter(&mut self, key: &str, value: &str) -> Result<()> {
        let cmd = self.render(&self.config.write, Some(key), Some(value));
        self.run(
            Operation::WriteParameter {
                key: key.to_string(),
            },
            &cmd,
        )
        .await?;
        tokio::time::sleep(self.config.settle()).await;
        Ok(())
    }

    async fn read_log(&mut self) -> Result<String> {
        let cmd = self.render(&self.config.read_log, None, None);
        let output = self.run(Operation::ReadLog, &cmd).await?;
        Ok(output.stdout.trim_end().to_string())
    }

    async fn clear_log(&mut self) -> Result<()> {
        let cmd = self.render(&self.config.clear_log, None, None);
        self.run(Operation::ClearLog, &cmd).await?;
        Ok(())
    }
}

/// Quote a string for POSIX `sh`
///
/// Bracket sequences like `({[]})` are valid operands and must reach the
/// module verbatim.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '='))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}
