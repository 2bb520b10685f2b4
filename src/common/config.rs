//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How commands reach the module and its log
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Log polling for assertions
    #[serde(default)]
    pub assertions: AssertionConfig,

    /// Artifact checks before the module is touched
    #[serde(default)]
    pub preflight: PreflightConfig,

    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Shell command templates for the command channel
///
/// Placeholders: `{module}`, `{key}`, `{value}`, `{path}`.
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Shell used to run the templates
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default = "default_load")]
    pub load: String,

    #[serde(default = "default_unload")]
    pub unload: String,

    /// Parameter write, `{path}` is `<parameter_root>/<key>`
    #[serde(default = "default_write")]
    pub write: String,

    #[serde(default = "default_read_log")]
    pub read_log: String,

    #[serde(default = "default_clear_log")]
    pub clear_log: String,

    /// Root of the writable parameter namespace
    #[serde(default = "default_parameter_root")]
    pub parameter_root: String,

    /// Settle delay after a parameter write
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Settle delay after load and unload
    #[serde(default = "default_load_settle")]
    pub load_settle_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            load: default_load(),
            unload: default_unload(),
            write: default_write(),
            read_log: default_read_log(),
            clear_log: default_clear_log(),
            parameter_root: default_parameter_root(),
            settle_ms: default_settle(),
            load_settle_ms: default_load_settle(),
        }
    }
}

impl ChannelConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn load_settle(&self) -> Duration {
        Duration::from_millis(self.load_settle_ms)
    }
}

fn default_shell() -> String {
    "sh".to_string()
}
fn default_load() -> String {
    "sudo modprobe {module}".to_string()
}
fn default_unload() -> String {
    "sudo rmmod {module}".to_string()
}
fn default_write() -> String {
    "echo {value} | sudo tee {path}".to_string()
}
fn default_read_log() -> String {
    "dmesg".to_string()
}
fn default_clear_log() -> String {
    "sudo dmesg -C".to_string()
}
fn default_parameter_root() -> String {
    "/sys/module/{module}/parameters".to_string()
}
fn default_settle() -> u64 {
    200
}
fn default_load_settle() -> u64 {
    500
}

/// Assertion polling settings
#[derive(Debug, Deserialize, Clone)]
pub struct AssertionConfig {
    /// Give up on a pattern after this long
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,

    /// Delay between log reads while polling
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Trailing log characters shown on failure
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for AssertionConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout(),
            poll_interval_ms: default_poll_interval(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

impl AssertionConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_poll_timeout() -> u64 {
    1000
}
fn default_poll_interval() -> u64 {
    100
}
fn default_excerpt_chars() -> usize {
    500
}

/// Pre-flight artifact check
#[derive(Debug, Deserialize, Clone)]
pub struct PreflightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directories searched for `<module>.ko`; `{release}` is the kernel release
    #[serde(default = "default_artifact_dirs")]
    pub artifact_dirs: Vec<String>,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            artifact_dirs: default_artifact_dirs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_artifact_dirs() -> Vec<String> {
    vec![
        "/lib/modules/{release}/extra/src".to_string(),
        "/lib/modules/{release}/extra".to_string(),
    ]
}

/// Report settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Where the log is dumped when a run aborts
    #[serde(default = "default_failure_log")]
    pub failure_log: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            failure_log: default_failure_log(),
        }
    }
}

fn default_failure_log() -> PathBuf {
    PathBuf::from("dmesg_failure.log")
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
