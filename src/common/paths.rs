//! Configuration and module artifact paths

use std::path::{Path, PathBuf};

/// Name used for the configuration directory
const APP_NAME: &str = "modcheck";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/modcheck/`
/// - macOS: `~/Library/Application Support/modcheck/`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Release string of the running kernel (`uname -r`)
#[cfg(unix)]
pub fn kernel_release() -> Option<String> {
    // SAFETY: utsname is plain C data, all-zero is a valid value
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    // SAFETY: uname only writes into the struct we own
    if unsafe { libc::uname(&mut uts) } != 0 {
        return None;
    }
    // SAFETY: on success uname leaves `release` NUL-terminated
    let release = unsafe { std::ffi::CStr::from_ptr(uts.release.as_ptr()) };
    Some(release.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
pub fn kernel_release() -> Option<String> {
    None
}

/// Expand `{release}` in an artifact directory template
pub fn expand_release(template: &str, release: Option<&str>) -> Option<PathBuf> {
    if template.contains("{release}") {
        release.map(|r| PathBuf::from(template.replace("{release}", r)))
    } else {
        Some(PathBuf::from(template))
    }
}

/// Candidate locations of `<module>.ko` across the given directories
pub fn artifact_candidates(module: &str, dirs: &[PathBuf]) -> Vec<PathBuf> {
    let file = format!("{}.ko", module);
    dirs.iter().map(|d| d.join(&file)).collect()
}

/// First existing artifact among the candidates
pub fn find_artifact(candidates: &[PathBuf]) -> Option<&Path> {
    candidates.iter().map(PathBuf::as_path).find(|p| p.is_file())
}
