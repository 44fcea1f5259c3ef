//! Pipeline orchestration.
//!
//! Ties the stages together for one invocation:
//!
//! ```text
//! validate ──> discover units ──> build each unit ──> deploy ──> clean up
//!    │                               │                  │
//!    └─ stop on first failure        └─ never aborts    └─ skipped if any
//!                                       the loop           unit failed
//! ```
//!
//! Every operation returns a [`RunReport`]; nothing here panics or exits
//! the process.

pub mod config;
pub mod report;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::build::{discover_units, Unit, UnitBuilder};
use crate::deploy::deploy_stack;
use crate::error::ValidationError;
use crate::preflight::validate_in;
use crate::process::ProcessExecutor;

use config::{check_staging_dir, BuildSettings, DeploySettings, StackConfig};
pub use report::{RunReport, UnitOutcome, UnitStatus};

/// Runs validate/build/deploy/clean for one project directory.
pub struct Pipeline<'a> {
    project_root: PathBuf,
    build: BuildSettings,
    deploy: DeploySettings,
    executor: &'a dyn ProcessExecutor,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        project_root: impl Into<PathBuf>,
        build: BuildSettings,
        deploy: DeploySettings,
        executor: &'a dyn ProcessExecutor,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            build,
            deploy,
            executor,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn build_settings(&self) -> &BuildSettings {
        &self.build
    }

    pub fn deploy_settings(&self) -> &DeploySettings {
        &self.deploy
    }

    /// Structural checks only.
    pub fn validate(&self, units_root: &str) -> Result<String, ValidationError> {
        validate_in(&self.project_root, units_root, &self.build)
    }

    /// Validate and build every unit. Artifacts are left in place.
    pub fn build(&self, units_root: &str) -> RunReport {
        let mut report = RunReport::new();
        self.build_units(units_root, &mut report);
        report
    }

    /// Validate and remove every non-shared unit's staging directory.
    pub fn clean(&self, units_root: &str) -> RunReport {
        let mut report = RunReport::new();
        let Some(units) = self.validated_units(units_root, &mut report) else {
            return report;
        };

        let builder = UnitBuilder::new(&self.build, self.executor);
        for unit in &units {
            if unit.is_shared() {
                report.record(unit.name(), UnitStatus::Skipped, "skipped (shared module)");
                continue;
            }
            match builder.remove_staging(unit) {
                Ok(true) => {
                    let staging = unit.staging_path(&self.build.staging_dir);
                    report.record(
                        unit.name(),
                        UnitStatus::Removed,
                        format!("removed {}", staging.display()),
                    );
                }
                Ok(false) => report.record(unit.name(), UnitStatus::Skipped, "nothing to remove"),
                Err(err) => report.record(unit.name(), UnitStatus::Failed, format!("failed: {err}")),
            }
        }
        report
    }

    /// Validate, build every unit, deploy if all builds succeeded, then
    /// remove the staging directories.
    ///
    /// Cleanup runs whatever the deploy outcome; a cleanup failure is
    /// reported and fails the run.
    pub fn deploy(&self, stack: &StackConfig, units_root: &str) -> RunReport {
        let mut report = RunReport::new();
        let Some(units) = self.build_units(units_root, &mut report) else {
            return report;
        };

        if report.success() {
            match deploy_stack(self.executor, &self.deploy, stack, &self.project_root) {
                Ok(()) => report.note(format!("Deployed stack {}", stack.stack_name())),
                Err(err) => {
                    warn!("Deployment of {} failed: {}", stack.stack_name(), err);
                    report.fail(format!("Deployment failed: {err}"));
                }
            }
        } else {
            warn!("Not deploying {}: at least one unit failed to build", stack.stack_name());
        }

        self.cleanup(&units, &mut report);
        report
    }

    fn cleanup(&self, units: &[Unit], report: &mut RunReport) {
        let builder = UnitBuilder::new(&self.build, self.executor);
        for unit in units.iter().filter(|u| !u.is_shared()) {
            if let Err(err) = builder.remove_staging(unit) {
                warn!("Cleanup of {} failed: {}", unit.name(), err);
                report.fail(format!("Cleanup of {} failed: {err}", unit.name()));
            }
        }
    }

    fn build_units(&self, units_root: &str, report: &mut RunReport) -> Option<Vec<Unit>> {
        let units = self.validated_units(units_root, report)?;
        let builder = UnitBuilder::new(&self.build, self.executor);
        for unit in &units {
            let result = builder.build(unit);
            report.record_unit(unit.name(), &result);
        }
        Some(units)
    }

    fn validated_units(&self, units_root: &str, report: &mut RunReport) -> Option<Vec<Unit>> {
        if let Err(err) = check_staging_dir(&self.build.staging_dir) {
            report.fail(err.to_string());
            return None;
        }
        let units_root = match self.validate(units_root) {
            Ok(root) => root,
            Err(err) => {
                warn!("Validation failed: {}", err);
                report.fail(err.to_string());
                return None;
            }
        };
        info!("Validated {}", units_root);

        let root_path = self.project_root.join(&units_root);
        match discover_units(&root_path, &self.build) {
            Ok(units) => Some(units),
            Err(err) => {
                report.fail(format!("Listing units in {}: {err}", root_path.display()));
                None
            }
        }
    }
}
