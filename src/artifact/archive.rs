//! Archive creation for staged units.
//!
//! The archive is produced by an external command run inside the staging
//! directory. Its name comes from the staging directory's *parent*, i.e.
//! the unit, because the deployment template refers to functions by unit
//! name (`lambdas/fnA/dist/fnA.zip`).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::UnitBuildError;
use crate::process::{render_command, run_checked, ProcessExecutor};

/// Default archive command; `{archive}` is replaced by `<unit>.zip`.
pub const DEFAULT_ARCHIVE_COMMAND: &str = "zip -r {archive} .";

/// Archive file name for a staging directory: `<parent dir name>.zip`.
pub fn archive_name(staging: &Path) -> Result<String, UnitBuildError> {
    staging
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .map(|name| format!("{name}.zip"))
        .ok_or_else(|| UnitBuildError::ArchiveName(staging.to_path_buf()))
}

/// Zip the contents of `staging` in place.
///
/// Returns the path of the archive the command was asked to produce.
///
/// # Example
///
/// ```rust,ignore
/// use sam_deployer::artifact::archive::{build_archive, DEFAULT_ARCHIVE_COMMAND};
///
/// let archive = build_archive(&executor, DEFAULT_ARCHIVE_COMMAND, Path::new("lambdas/fnA/dist"))?;
/// assert!(archive.ends_with("fnA.zip"));
/// ```
pub fn build_archive(
    executor: &dyn ProcessExecutor,
    command_template: &str,
    staging: &Path,
) -> Result<PathBuf, UnitBuildError> {
    let name = archive_name(staging)?;
    info!("Creating {} in {}", name, staging.display());

    let command = render_command(command_template, &[("archive", &name)]);
    run_checked(executor, &command, staging).map_err(UnitBuildError::Archive)?;

    Ok(staging.join(name))
}
