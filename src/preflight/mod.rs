//! Preflight checks for build validation.
//!
//! Two families of checks run before anything is built:
//!
//! - **Structural checks** ([`validate_in`]) confirm the project layout. They
//!   run in a fixed order and stop at the first failure, because each one
//!   relies on the previous one having passed: there is no point hunting for
//!   source files in a units root that does not exist.
//! - **Host tool checks** ([`check_required_tools`]) confirm the external
//!   programs the command templates call are on `PATH`.
//!
//! # Example
//!
//! ```rust,ignore
//! use sam_deployer::preflight::{command_exists, validate_in};
//! use sam_deployer::pipeline::config::BuildSettings;
//!
//! let units_root = validate_in(Path::new("."), "lambdas", &BuildSettings::default())?;
//!
//! if !command_exists("zip") {
//!     println!("zip not installed");
//! }
//! ```

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::filesystem::{non_hidden_dirs, non_hidden_files};
use crate::error::{FilesystemError, ValidationError};
use crate::pipeline::config::{BuildSettings, DeploySettings};
use crate::process::command_program;

/// Run the structural checks against the current working directory.
pub fn validate(units_root: &str, settings: &BuildSettings) -> Result<String, ValidationError> {
    let cwd = std::env::current_dir()
        .map_err(|e| FilesystemError::io("resolving current directory", ".", e))?;
    validate_in(&cwd, units_root, settings)
}

/// Run the structural checks against `project_root`.
///
/// In order:
/// 1. `project_root` holds a non-hidden directory named `units_root`
/// 2. that directory has at least one non-hidden subdirectory
/// 3. every non-shared subdirectory has a top-level file ending in
///    `settings.source_extension`
///
/// Returns the validated units-root name.
pub fn validate_in(
    project_root: &Path,
    units_root: &str,
    settings: &BuildSettings,
) -> Result<String, ValidationError> {
    check_units_root_present(project_root, units_root)?;
    let root_path = project_root.join(units_root);
    let units = check_units_root_not_empty(&root_path, units_root)?;
    check_units_contain_source(&units, settings)?;
    Ok(units_root.to_string())
}

fn check_units_root_present(project_root: &Path, units_root: &str) -> Result<(), ValidationError> {
    let found = non_hidden_dirs(project_root)?
        .iter()
        .any(|d| d.file_name().is_some_and(|name| name == units_root));
    if found {
        return Ok(());
    }
    Err(ValidationError::MissingUnitsRoot {
        units_root: units_root.to_string(),
        cwd: fs::canonicalize(project_root).unwrap_or_else(|_| project_root.to_path_buf()),
    })
}

fn check_units_root_not_empty(
    root_path: &Path,
    units_root: &str,
) -> Result<Vec<PathBuf>, ValidationError> {
    let units = non_hidden_dirs(root_path)?;
    if units.is_empty() {
        return Err(ValidationError::EmptyUnitsRoot {
            units_root: units_root.to_string(),
        });
    }
    Ok(units)
}

fn check_units_contain_source(
    units: &[PathBuf],
    settings: &BuildSettings,
) -> Result<(), ValidationError> {
    for unit in units {
        let name = unit
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if settings.is_shared(&name) {
            continue;
        }
        let has_source = non_hidden_files(unit)?.iter().any(|f| {
            f.file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(settings.source_extension.as_str()))
        });
        if !has_source {
            return Err(ValidationError::MissingSource {
                unit: unit.clone(),
                extension: settings.source_extension.clone(),
            });
        }
    }
    Ok(())
}

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Package hint shown next to a missing tool.
fn package_hint(tool: &str) -> &str {
    match tool {
        "pip3" | "pip" => "python3-pip",
        "aws" => "awscli",
        "sam" => "aws-sam-cli",
        "npm" => "nodejs",
        other => other,
    }
}

/// Tools the configured command templates need.
///
/// The install tool is only listed when `needs_install` is set, i.e. some
/// unit actually ships a manifest.
pub fn required_tools(
    build: &BuildSettings,
    deploy: Option<&DeploySettings>,
    needs_install: bool,
) -> Vec<(String, String)> {
    let mut templates = vec![build.archive_command.as_str()];
    if needs_install {
        templates.push(build.install_command.as_str());
    }
    if let Some(deploy) = deploy {
        templates.push(deploy.package_command.as_str());
        templates.push(deploy.deploy_command.as_str());
    }

    let mut tools: Vec<(String, String)> = Vec::new();
    for program in templates.into_iter().filter_map(command_program) {
        if !tools.iter().any(|(t, _)| t == program) {
            tools.push((program.to_string(), package_hint(program).to_string()));
        }
    }
    tools
}

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, package) tuples
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools<S: AsRef<str>>(tools: &[(S, S)]) -> Result<()> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool.as_ref()))
        .map(|(tool, package)| format!("  {} (install: {})", tool.as_ref(), package.as_ref()))
        .collect();

    if !missing.is_empty() {
        bail!("Missing required host tools:\n{}", missing.join("\n"));
    }

    Ok(())
}

/// Whether any non-shared unit under `root_path` ships the manifest.
pub fn any_unit_needs_install(
    root_path: &Path,
    settings: &BuildSettings,
) -> Result<bool, FilesystemError> {
    for unit in non_hidden_dirs(root_path)? {
        let shared = unit
            .file_name()
            .is_some_and(|n| settings.is_shared(&n.to_string_lossy()));
        if shared {
            continue;
        }
        if non_hidden_files(&unit)?
            .iter()
            .any(|f| f.file_name().is_some_and(|n| n == settings.manifest.as_str()))
        {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("lambdas")).unwrap();
        temp
    }

    fn add_unit(temp: &TempDir, name: &str, files: &[&str]) {
        let dir = temp.path().join("lambdas").join(name);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), "").unwrap();
        }
    }

    #[test]
    fn test_validate_passes() {
        let temp = project();
        add_unit(&temp, "fnA", &["handler.py"]);
        add_unit(&temp, "fnB", &["app.py", "requirements.txt"]);

        let name = validate_in(temp.path(), "lambdas", &BuildSettings::default()).unwrap();
        assert_eq!(name, "lambdas");
    }

    #[test]
    fn test_missing_units_root_stops_chain() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("functions")).unwrap();

        let err = validate_in(temp.path(), "lambdas", &BuildSettings::default()).unwrap_err();
        match &err {
            ValidationError::MissingUnitsRoot { units_root, cwd } => {
                assert_eq!(units_root, "lambdas");
                assert_eq!(cwd, &fs::canonicalize(temp.path()).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("\"lambdas\""));
    }

    #[test]
    fn test_hidden_units_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".lambdas/fnA")).unwrap();

        let err = validate_in(temp.path(), ".lambdas", &BuildSettings::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingUnitsRoot { .. }));
    }

    #[test]
    fn test_units_root_as_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("lambdas"), "").unwrap();

        let err = validate_in(temp.path(), "lambdas", &BuildSettings::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingUnitsRoot { .. }));
    }

    #[test]
    fn test_empty_units_root() {
        let temp = project();
        // Hidden directories and plain files don't count as units.
        fs::create_dir(temp.path().join("lambdas/.cache")).unwrap();
        fs::write(temp.path().join("lambdas/README.md"), "").unwrap();

        let err = validate_in(temp.path(), "lambdas", &BuildSettings::default()).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyUnitsRoot { ref units_root } if units_root == "lambdas"));
        assert_eq!(
            err.to_string(),
            "Directory lambdas does not contain any subdirectories"
        );
    }

    #[test]
    fn test_unit_without_source_is_named() {
        let temp = project();
        add_unit(&temp, "fnA", &["handler.py"]);
        add_unit(&temp, "fnB", &["README.md"]);
        add_unit(&temp, "fnC", &[]);

        let err = validate_in(temp.path(), "lambdas", &BuildSettings::default()).unwrap_err();
        match err {
            ValidationError::MissingSource { unit, extension } => {
                assert_eq!(unit.file_name().unwrap(), "fnB");
                assert_eq!(extension, ".py");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_source_does_not_count() {
        let temp = project();
        add_unit(&temp, "fnA", &[]);
        fs::create_dir_all(temp.path().join("lambdas/fnA/src")).unwrap();
        fs::write(temp.path().join("lambdas/fnA/src/handler.py"), "").unwrap();

        let err = validate_in(temp.path(), "lambdas", &BuildSettings::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSource { .. }));
    }

    #[test]
    fn test_shared_unit_is_exempt_from_source_check() {
        let temp = project();
        add_unit(&temp, "fnA", &["handler.py"]);
        add_unit(&temp, "common", &[]);

        assert!(validate_in(temp.path(), "lambdas", &BuildSettings::default()).is_ok());
    }

    #[test]
    fn test_only_shared_units_still_pass_non_empty_check() {
        let temp = project();
        add_unit(&temp, "common", &[]);

        assert!(validate_in(temp.path(), "lambdas", &BuildSettings::default()).is_ok());
    }

    #[test]
    fn test_source_extension_is_configurable() {
        let temp = project();
        add_unit(&temp, "fnA", &["index.js"]);
        let settings = BuildSettings {
            source_extension: ".js".into(),
            ..Default::default()
        };

        assert!(validate_in(temp.path(), "lambdas", &settings).is_ok());
        assert!(validate_in(temp.path(), "lambdas", &BuildSettings::default()).is_err());
    }

    #[test]
    fn test_any_unit_needs_install() {
        let temp = project();
        add_unit(&temp, "fnA", &["handler.py"]);
        add_unit(&temp, "common", &["requirements.txt"]);
        let root = temp.path().join("lambdas");
        let settings = BuildSettings::default();

        assert!(!any_unit_needs_install(&root, &settings).unwrap());

        add_unit(&temp, "fnB", &["handler.py", "requirements.txt"]);
        assert!(any_unit_needs_install(&root, &settings).unwrap());
    }

    #[test]
    fn test_required_tools() {
        let build = BuildSettings::default();

        let tools = required_tools(&build, None, false);
        assert_eq!(tools, [("zip".to_string(), "zip".to_string())]);

        let deploy = DeploySettings::default();
        let tools = required_tools(&build, Some(&deploy), true);
        let names: Vec<&str> = tools.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, ["zip", "pip3", "aws"]);
        assert_eq!(tools[1].1, "python3-pip");
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools() {
        assert!(check_required_tools(&[("sh", "dash")]).is_ok());

        let err = check_required_tools(&[("nonexistent_command_xyz", "fake-package")]).unwrap_err();
        assert!(err.to_string().contains("nonexistent_command_xyz (install: fake-package)"));
    }
}
