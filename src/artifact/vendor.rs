//! Dependency vendoring.
//!
//! A staged unit that ships a dependency manifest gets its packages
//! installed right next to its sources, so the archive is self-contained.

use std::path::Path;

use tracing::info;

use crate::artifact::filesystem::non_hidden_files;
use crate::error::UnitBuildError;
use crate::process::{render_command, run_checked, ProcessExecutor};

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "requirements.txt";

/// Default install command; installs into the working directory.
pub const DEFAULT_INSTALL_COMMAND: &str = "pip3 install -r {manifest} -t .";

/// Whether `dir` has the manifest among its top-level files.
pub fn requires_install(dir: &Path, manifest: &str) -> Result<bool, UnitBuildError> {
    let files = non_hidden_files(dir).map_err(UnitBuildError::Inspect)?;
    Ok(files
        .iter()
        .any(|f| f.file_name().is_some_and(|name| name == manifest)))
}

/// Install the manifest's dependencies into `staging`.
///
/// Returns `false` when there was no manifest and nothing ran.
pub fn vendor_dependencies(
    executor: &dyn ProcessExecutor,
    command_template: &str,
    manifest: &str,
    staging: &Path,
) -> Result<bool, UnitBuildError> {
    if !requires_install(staging, manifest)? {
        return Ok(false);
    }

    info!("Installing dependencies in {}", staging.display());
    let command = render_command(command_template, &[("manifest", manifest)]);
    run_checked(executor, &command, staging).map_err(UnitBuildError::Vendor)?;
    Ok(true)
}
