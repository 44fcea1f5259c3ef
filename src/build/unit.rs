//! Deployable units and their discovery.

use std::path::{Path, PathBuf};

use crate::artifact::filesystem::non_hidden_dirs;
use crate::error::FilesystemError;
use crate::pipeline::config::BuildSettings;

/// One deployable function: a directory directly inside the units root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    path: PathBuf,
    name: String,
    is_shared: bool,
}

impl Unit {
    /// Describe the unit at `path`, made absolute without resolving symlinks.
    ///
    /// The name is the listed directory name even when that entry is a
    /// symlink, so archives and shared checks follow the units root listing.
    pub fn from_path(path: &Path, settings: &BuildSettings) -> Result<Self, FilesystemError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FilesystemError::NotADirectory(path.to_path_buf()))?;
        let path = std::path::absolute(path).map_err(|e| FilesystemError::io("resolving", path, e))?;
        let is_shared = settings.is_shared(&name);
        Ok(Self {
            path,
            name,
            is_shared,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared code lives next to the units but is never packaged.
    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    /// Staging directory for this unit: `<unit>/<staging_dir>`.
    pub fn staging_path(&self, staging_dir: &str) -> PathBuf {
        self.path.join(staging_dir)
    }
}

/// List the units under `root_path`, in listing order.
///
/// Always reads the directory fresh; nothing is cached between calls.
pub fn discover_units(
    root_path: &Path,
    settings: &BuildSettings,
) -> Result<Vec<Unit>, FilesystemError> {
    non_hidden_dirs(root_path)?
        .iter()
        .map(|dir| Unit::from_path(dir, settings))
        .collect()
}
