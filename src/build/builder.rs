//! Per-unit artifact builds.
//!
//! A build always starts from a clean staging directory, so a crashed or
//! interrupted previous run never leaks into the next artifact. Failures are
//! contained: they come back as [`UnitResult::Failed`] and never abort the
//! caller's loop over the remaining units.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::artifact::archive::build_archive;
use crate::artifact::filesystem::{copy_dir_recursive, remove_dir_if_exists};
use crate::artifact::vendor::vendor_dependencies;
use crate::build::unit::Unit;
use crate::error::{FilesystemError, UnitBuildError};
use crate::pipeline::config::BuildSettings;
use crate::process::ProcessExecutor;

pub const SHARED_SKIP_REASON: &str = "shared module, not packaged";

/// Outcome of building one unit.
#[derive(Debug)]
pub enum UnitResult {
    Skipped(String),
    Built {
        staging: PathBuf,
        archive: PathBuf,
        vendored: bool,
    },
    Failed(UnitBuildError),
}

impl UnitResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, UnitResult::Failed(_))
    }
}

impl fmt::Display for UnitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitResult::Skipped(reason) => write!(f, "skipped ({reason})"),
            UnitResult::Built {
                archive, vendored, ..
            } => {
                write!(f, "built {}", archive.display())?;
                if *vendored {
                    write!(f, " (with vendored dependencies)")?;
                }
                Ok(())
            }
            UnitResult::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Builds units with a fixed set of settings and an executor.
pub struct UnitBuilder<'a> {
    settings: &'a BuildSettings,
    executor: &'a dyn ProcessExecutor,
}

impl<'a> UnitBuilder<'a> {
    pub fn new(settings: &'a BuildSettings, executor: &'a dyn ProcessExecutor) -> Self {
        Self { settings, executor }
    }

    /// Build one unit.
    ///
    /// 1. Shared units are skipped without touching the filesystem.
    /// 2. Any stale staging directory is removed.
    /// 3. The unit is copied into its staging directory.
    /// 4. Dependencies are vendored if the staged copy has a manifest.
    /// 5. The staging directory is archived as `<unit>.zip`.
    pub fn build(&self, unit: &Unit) -> UnitResult {
        if unit.is_shared() {
            info!("Ignoring {}: {}", unit.name(), SHARED_SKIP_REASON);
            return UnitResult::Skipped(SHARED_SKIP_REASON.to_string());
        }

        match self.try_build(unit) {
            Ok(result) => result,
            Err(err) => {
                warn!("Build of {} failed: {}", unit.name(), err);
                UnitResult::Failed(err)
            }
        }
    }

    fn try_build(&self, unit: &Unit) -> Result<UnitResult, UnitBuildError> {
        let staging = unit.staging_path(&self.settings.staging_dir);

        self.remove_staging(unit).map_err(UnitBuildError::Clean)?;

        info!("Copying {} to {}", unit.path().display(), staging.display());
        copy_dir_recursive(unit.path(), &staging).map_err(UnitBuildError::Copy)?;

        let vendored = vendor_dependencies(
            self.executor,
            &self.settings.install_command,
            &self.settings.manifest,
            &staging,
        )?;

        let archive = build_archive(self.executor, &self.settings.archive_command, &staging)?;

        Ok(UnitResult::Built {
            staging,
            archive,
            vendored,
        })
    }

    /// Remove the unit's staging directory if it exists.
    ///
    /// Returns whether anything was removed.
    pub fn remove_staging(&self, unit: &Unit) -> Result<bool, FilesystemError> {
        let staging = unit.staging_path(&self.settings.staging_dir);
        info!("Removing {} if it exists", staging.display());
        remove_dir_if_exists(&staging)
    }
}
