//! Pre-flight checks run before the module is touched

use std::path::PathBuf;
use tracing::debug;

use crate::common::config::PreflightConfig;
use crate::common::paths::{artifact_candidates, expand_release, find_artifact, kernel_release};
use crate::common::{Error, Result};

/// Locate the module's build artifact or fail with the searched paths
pub fn check_artifact(module: &str, config: &PreflightConfig) -> Result<PathBuf> {
    let release = kernel_release();
    let dirs: Vec<PathBuf> = config
        .artifact_dirs
        .iter()
        .filter_map(|d| expand_release(d, release.as_deref()))
        .collect();
    let candidates = artifact_candidates(module, &dirs);

    match find_artifact(&candidates) {
        Some(path) => {
            debug!(module, path = %path.display(), "Found module artifact");
            Ok(path.to_path_buf())
        }
        None => {
            let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            Err(Error::artifact_missing(module, &searched))
        }
    }
}
