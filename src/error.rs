//! Error types for sam-deployer.
//!
//! One enum per failure family. Validation errors abort a run before any
//! unit is touched; unit build errors are caught at the unit boundary and
//! recorded in the run report; external command errors are always wrapped
//! by one of the two.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("path not found: '{}'", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a directory: '{}'", .0.display())]
    NotADirectory(PathBuf),

    #[error("{action} '{}': {cause}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        cause: std::io::Error,
    },
}

impl FilesystemError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            cause,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExternalCommandError {
    #[error(
        "failed to start '{command}' in '{}': {cause}",
        .working_dir.display()
    )]
    Spawn {
        command: String,
        working_dir: PathBuf,
        cause: std::io::Error,
    },

    #[error(
        "'{command}' in '{}' exited with {}{}",
        .working_dir.display(),
        exit_label(.code),
        stderr_suffix(.stderr)
    )]
    NonZeroExit {
        command: String,
        working_dir: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error(
        "'{command}' in '{}' timed out after {}s",
        .working_dir.display(),
        .timeout.as_secs()
    )]
    TimedOut {
        command: String,
        working_dir: PathBuf,
        timeout: Duration,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(
        "Did not find a \"{units_root}\" directory in {}. \
         Did you run this command from the root of your project?",
        .cwd.display()
    )]
    MissingUnitsRoot { units_root: String, cwd: PathBuf },

    #[error("Directory {units_root} does not contain any subdirectories")]
    EmptyUnitsRoot { units_root: String },

    #[error("Could not find {extension} files in {}", .unit.display())]
    MissingSource { unit: PathBuf, extension: String },

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

#[derive(Debug, Error)]
pub enum UnitBuildError {
    #[error("removing stale staging directory: {0}")]
    Clean(FilesystemError),

    #[error("copying unit into staging directory: {0}")]
    Copy(FilesystemError),

    #[error("inspecting staged files: {0}")]
    Inspect(FilesystemError),

    #[error("vendoring dependencies: {0}")]
    Vendor(ExternalCommandError),

    #[error("creating archive: {0}")]
    Archive(ExternalCommandError),

    #[error("cannot derive archive name from staging directory '{}'", .0.display())]
    ArchiveName(PathBuf),
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Template {template} does not exist in {}", .project_root.display())]
    MissingTemplate {
        template: String,
        project_root: PathBuf,
    },

    #[error("packaging stack: {0}")]
    Package(ExternalCommandError),

    #[error("deploying stack: {0}")]
    Deploy(ExternalCommandError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required value: {0}")]
    Missing(&'static str),

    #[error("value for {0} must not be empty")]
    Empty(&'static str),

    #[error("build.staging_dir must be a single directory name, got '{0}'")]
    InvalidStagingDir(String),

    #[error("reading config '{}': {cause}", .path.display())]
    Read {
        path: PathBuf,
        cause: std::io::Error,
    },

    #[error("parsing config '{}': {cause}", .path.display())]
    Parse {
        path: PathBuf,
        cause: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_mentions_command_and_status() {
        let err = ExternalCommandError::NonZeroExit {
            command: "zip -r fnA.zip .".into(),
            working_dir: PathBuf::from("/tmp/lambdas/fnA/dist"),
            code: Some(12),
            stderr: "zip error: Nothing to do!\n".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("zip -r fnA.zip ."));
        assert!(msg.contains("status 12"));
        assert!(msg.ends_with("Nothing to do!"));
    }

    #[test]
    fn test_signal_exit_has_no_code() {
        let err = ExternalCommandError::NonZeroExit {
            command: "pip3 install".into(),
            working_dir: PathBuf::from("/tmp"),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_cause_is_printed_once_in_alternate_chain() {
        let err = UnitBuildError::Copy(FilesystemError::io(
            "copying file",
            "/tmp/lambdas/fnA/handler.py",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access refused"),
        ));

        let chain = format!("{:#}", anyhow::Error::new(err));

        assert_eq!(chain.matches("access refused").count(), 1);
        assert_eq!(chain.matches("handler.py").count(), 1);
        assert!(chain.starts_with("copying unit into staging directory: copying file"));
    }

    #[test]
    fn test_missing_units_root_names_directory_and_cwd() {
        let err = ValidationError::MissingUnitsRoot {
            units_root: "lambdas".into(),
            cwd: PathBuf::from("/home/me/project"),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"lambdas\""));
        assert!(msg.contains("/home/me/project"));
    }
}
