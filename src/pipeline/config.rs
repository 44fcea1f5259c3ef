//! Project configuration.
//!
//! Settings come from three layers: built-in defaults, an optional
//! `sam-deployer.toml` in the project root, and command-line overrides.
//! The file layer is parsed strictly (`deny_unknown_fields`) so typos fail
//! loudly instead of silently falling back to defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::artifact::archive::DEFAULT_ARCHIVE_COMMAND;
use crate::artifact::vendor::{DEFAULT_INSTALL_COMMAND, DEFAULT_MANIFEST};
use crate::deploy::{DEFAULT_DEPLOY_COMMAND, DEFAULT_OUTPUT_TEMPLATE, DEFAULT_PACKAGE_COMMAND};
use crate::error::ConfigError;

pub const CONFIG_FILENAME: &str = "sam-deployer.toml";
pub const DEFAULT_UNITS_ROOT: &str = "lambdas";
pub const DEFAULT_TEMPLATE: &str = "template.yaml";
pub const DEFAULT_SOURCE_EXTENSION: &str = ".py";
pub const DEFAULT_SHARED_MARKER: &str = "common";
pub const DEFAULT_STAGING_DIR: &str = "dist";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 900;

/// Knobs for validation and unit builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Extension a unit's top-level source files end with.
    pub source_extension: String,
    /// Dependency manifest that triggers vendoring.
    pub manifest: String,
    /// Units whose name contains this marker are shared code, never packaged.
    pub shared_marker: String,
    /// Staging directory name, nested inside each unit.
    pub staging_dir: String,
    pub install_command: String,
    pub archive_command: String,
    pub command_timeout: Duration,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            manifest: DEFAULT_MANIFEST.to_string(),
            shared_marker: DEFAULT_SHARED_MARKER.to_string(),
            staging_dir: DEFAULT_STAGING_DIR.to_string(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
            archive_command: DEFAULT_ARCHIVE_COMMAND.to_string(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl BuildSettings {
    pub fn is_shared(&self, unit_name: &str) -> bool {
        unit_name.contains(self.shared_marker.as_str())
    }
}

/// Command templates for the deployment trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub package_command: String,
    pub deploy_command: String,
    /// Intermediate template written by the package step.
    pub output_template: String,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            package_command: DEFAULT_PACKAGE_COMMAND.to_string(),
            deploy_command: DEFAULT_DEPLOY_COMMAND.to_string(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }
}

/// Target stack. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    stack_name: String,
    bucket: String,
    bucket_prefix: Option<String>,
    template_name: String,
}

impl StackConfig {
    pub fn new(stack_name: &str, bucket: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            stack_name: non_empty(stack_name, "stack name")?,
            bucket: non_empty(bucket, "bucket")?,
            bucket_prefix: None,
            template_name: DEFAULT_TEMPLATE.to_string(),
        })
    }

    pub fn with_bucket_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
        self.bucket_prefix = Some(non_empty(prefix, "bucket prefix")?);
        Ok(self)
    }

    pub fn with_template(mut self, template: &str) -> Result<Self, ConfigError> {
        self.template_name = non_empty(template, "template")?;
        Ok(self)
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Effective object prefix: the configured prefix, else the stack name.
    pub fn bucket_prefix(&self) -> &str {
        self.bucket_prefix.as_deref().unwrap_or(&self.stack_name)
    }
}

/// Partially specified stack, as read from the file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackInput {
    pub name: Option<String>,
    pub bucket: Option<String>,
    pub bucket_prefix: Option<String>,
    pub template: Option<String>,
}

impl StackInput {
    /// Fill unset fields from `fallback`.
    pub fn or(self, fallback: StackInput) -> StackInput {
        StackInput {
            name: self.name.or(fallback.name),
            bucket: self.bucket.or(fallback.bucket),
            bucket_prefix: self.bucket_prefix.or(fallback.bucket_prefix),
            template: self.template.or(fallback.template),
        }
    }

    pub fn resolve(self) -> Result<StackConfig, ConfigError> {
        let name = self.name.ok_or(ConfigError::Missing("stack name"))?;
        let bucket = self.bucket.ok_or(ConfigError::Missing("bucket"))?;
        let mut stack = StackConfig::new(&name, &bucket)?;
        if let Some(prefix) = self.bucket_prefix {
            stack = stack.with_bucket_prefix(&prefix)?;
        }
        if let Some(template) = self.template {
            stack = stack.with_template(&template)?;
        }
        Ok(stack)
    }
}

/// Everything loaded for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub units_root: String,
    pub build: BuildSettings,
    pub deploy: DeploySettings,
    pub stack: StackInput,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            units_root: DEFAULT_UNITS_ROOT.to_string(),
            build: BuildSettings::default(),
            deploy: DeploySettings::default(),
            stack: StackInput::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    units_root: Option<String>,
    build: Option<BuildToml>,
    deploy: Option<DeployToml>,
    stack: Option<StackToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildToml {
    source_extension: Option<String>,
    manifest: Option<String>,
    shared_marker: Option<String>,
    staging_dir: Option<String>,
    install_command: Option<String>,
    archive_command: Option<String>,
    command_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeployToml {
    package_command: Option<String>,
    deploy_command: Option<String>,
    output_template: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StackToml {
    name: Option<String>,
    bucket: Option<String>,
    bucket_prefix: Option<String>,
    template: Option<String>,
}

impl ProjectConfig {
    /// Load configuration for `project_root`.
    ///
    /// With `explicit` set, that file must exist. Otherwise
    /// `<project_root>/sam-deployer.toml` is used when present and defaults
    /// apply when it is not.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = project_root.join(CONFIG_FILENAME);
                if !default_path.is_file() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let raw = fs::read_to_string(&path).map_err(|cause| ConfigError::Read {
            path: path.clone(),
            cause,
        })?;
        Self::parse(&raw, &path)
    }

    /// Parse a config document; `path` is only used in error messages.
    pub fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let parsed: ConfigToml = toml::from_str(raw).map_err(|cause| ConfigError::Parse {
            path: path.to_path_buf(),
            cause,
        })?;

        let mut config = Self::default();
        if let Some(units_root) = parsed.units_root {
            config.units_root = non_empty(&units_root, "units_root")?;
        }

        if let Some(build) = parsed.build {
            let settings = &mut config.build;
            set_non_empty(&mut settings.source_extension, build.source_extension, "build.source_extension")?;
            set_non_empty(&mut settings.manifest, build.manifest, "build.manifest")?;
            set_non_empty(&mut settings.shared_marker, build.shared_marker, "build.shared_marker")?;
            set_non_empty(&mut settings.staging_dir, build.staging_dir, "build.staging_dir")?;
            check_staging_dir(&settings.staging_dir)?;
            set_non_empty(&mut settings.install_command, build.install_command, "build.install_command")?;
            set_non_empty(&mut settings.archive_command, build.archive_command, "build.archive_command")?;
            if let Some(secs) = build.command_timeout_secs {
                if secs == 0 {
                    return Err(ConfigError::Empty("build.command_timeout_secs"));
                }
                settings.command_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(deploy) = parsed.deploy {
            let settings = &mut config.deploy;
            set_non_empty(&mut settings.package_command, deploy.package_command, "deploy.package_command")?;
            set_non_empty(&mut settings.deploy_command, deploy.deploy_command, "deploy.deploy_command")?;
            set_non_empty(&mut settings.output_template, deploy.output_template, "deploy.output_template")?;
        }

        if let Some(stack) = parsed.stack {
            config.stack = StackInput {
                name: stack.name,
                bucket: stack.bucket,
                bucket_prefix: stack.bucket_prefix,
                template: stack.template,
            };
        }

        Ok(config)
    }
}

fn non_empty(value: &str, field: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(field));
    }
    Ok(trimmed.to_string())
}

/// The staging directory is removed recursively, so it must name exactly one
/// directory inside the unit: no separators, no `.`/`..`, not absolute.
pub fn check_staging_dir(name: &str) -> Result<(), ConfigError> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !name.contains(['/', '\\']) {
        return Ok(());
    }
    Err(ConfigError::InvalidStagingDir(name.to_string()))
}

fn set_non_empty(
    slot: &mut String,
    value: Option<String>,
    field: &'static str,
) -> Result<(), ConfigError> {
    if let Some(value) = value {
        *slot = non_empty(&value, field)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stack_prefix_defaults_to_stack_name() {
        let stack = StackConfig::new("orders", "artifacts-bucket").unwrap();
        assert_eq!(stack.bucket_prefix(), "orders");
        assert_eq!(stack.template_name(), "template.yaml");

        let stack = stack.with_bucket_prefix("releases/orders").unwrap();
        assert_eq!(stack.bucket_prefix(), "releases/orders");
    }

    #[test]
    fn test_stack_rejects_empty_values() {
        assert!(matches!(
            StackConfig::new("  ", "bucket"),
            Err(ConfigError::Empty("stack name"))
        ));
        assert!(matches!(
            StackConfig::new("orders", ""),
            Err(ConfigError::Empty("bucket"))
        ));
    }

    #[test]
    fn test_stack_input_resolution() {
        let cli = StackInput {
            name: Some("from-cli".into()),
            ..Default::default()
        };
        let file = StackInput {
            name: Some("from-file".into()),
            bucket: Some("file-bucket".into()),
            ..Default::default()
        };

        let stack = cli.or(file).resolve().unwrap();
        assert_eq!(stack.stack_name(), "from-cli");
        assert_eq!(stack.bucket(), "file-bucket");

        let missing = StackInput::default().resolve();
        assert!(matches!(missing, Err(ConfigError::Missing("stack name"))));
    }

    #[test]
    fn test_shared_marker_matches_substring() {
        let settings = BuildSettings::default();
        assert!(settings.is_shared("common"));
        assert!(settings.is_shared("common_utils"));
        assert!(!settings.is_shared("orders"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig::load(temp.path(), None).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.units_root, "lambdas");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = ProjectConfig::load(temp.path(), Some(&temp.path().join("custom.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_reads_project_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILENAME),
            r#"
units_root = "functions"

[build]
source_extension = ".js"
manifest = "package.json"
command_timeout_secs = 60

[stack]
name = "orders"
bucket = "deploy-bucket"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(temp.path(), None).unwrap();
        assert_eq!(config.units_root, "functions");
        assert_eq!(config.build.source_extension, ".js");
        assert_eq!(config.build.manifest, "package.json");
        assert_eq!(config.build.command_timeout, Duration::from_secs(60));
        assert_eq!(config.build.staging_dir, "dist");
        assert_eq!(config.deploy, DeploySettings::default());

        let stack = config.stack.resolve().unwrap();
        assert_eq!(stack.stack_name(), "orders");
        assert_eq!(stack.bucket_prefix(), "orders");
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let result = ProjectConfig::parse("[build]\nsource_ext = \".py\"\n", Path::new("x.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_parse_rejects_empty_values() {
        let result = ProjectConfig::parse("[build]\nstaging_dir = \"\"\n", Path::new("x.toml"));
        assert!(matches!(result, Err(ConfigError::Empty("build.staging_dir"))));

        let result = ProjectConfig::parse("[build]\ncommand_timeout_secs = 0\n", Path::new("x.toml"));
        assert!(matches!(result, Err(ConfigError::Empty(_))));
    }

    #[test]
    fn test_parse_rejects_staging_dir_outside_unit() {
        let outside = TempDir::new().unwrap();
        let absolute = outside.path().to_string_lossy().into_owned();
        for value in [".", "..", "../dist", "build/dist", "./dist", "dist/", absolute.as_str()] {
            let raw = format!("[build]\nstaging_dir = {value:?}\n");
            let result = ProjectConfig::parse(&raw, Path::new("x.toml"));
            assert!(
                matches!(result, Err(ConfigError::InvalidStagingDir(ref v)) if v == value),
                "accepted staging_dir {value:?}"
            );
        }
    }

    #[test]
    fn test_parse_accepts_plain_staging_dir() {
        let config = ProjectConfig::parse("[build]\nstaging_dir = \".build\"\n", Path::new("x.toml"))
            .unwrap();
        assert_eq!(config.build.staging_dir, ".build");
        assert!(check_staging_dir(DEFAULT_STAGING_DIR).is_ok());
    }
}
