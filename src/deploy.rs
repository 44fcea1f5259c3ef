//! Deployment trigger.
//!
//! Hands the built project over to the cloud tooling: a `package` command
//! uploads artifacts and writes an intermediate template, a `deploy` command
//! applies that template to the stack, and the intermediate template is
//! removed afterwards. From the pipeline's point of view this is one step.

use std::path::Path;

use tracing::info;

use crate::artifact::filesystem::{non_hidden_files, remove_file_if_exists};
use crate::error::DeployError;
use crate::pipeline::config::{DeploySettings, StackConfig};
use crate::process::{render_command, run_checked, ProcessExecutor};

pub const DEFAULT_OUTPUT_TEMPLATE: &str = "outputSamTemplate.yaml";

pub const DEFAULT_PACKAGE_COMMAND: &str = "aws cloudformation package \
     --template-file {template} \
     --s3-bucket {bucket} \
     --s3-prefix {prefix} \
     --output-template-file {output_template}";

pub const DEFAULT_DEPLOY_COMMAND: &str = "aws cloudformation deploy \
     --template-file {output_template} \
     --stack-name {stack} \
     --capabilities CAPABILITY_IAM";

/// Fail unless the stack template is a file in the project root.
pub fn check_template_exists(project_root: &Path, stack: &StackConfig) -> Result<(), DeployError> {
    let found = non_hidden_files(project_root)?
        .iter()
        .any(|f| f.file_name().is_some_and(|n| n == stack.template_name()));
    if found {
        return Ok(());
    }
    Err(DeployError::MissingTemplate {
        template: stack.template_name().to_string(),
        project_root: project_root.to_path_buf(),
    })
}

/// Package and deploy `stack` from `project_root`.
///
/// The intermediate template is removed whether or not the commands
/// succeed; a command failure takes precedence over a removal failure.
pub fn deploy_stack(
    executor: &dyn ProcessExecutor,
    settings: &DeploySettings,
    stack: &StackConfig,
    project_root: &Path,
) -> Result<(), DeployError> {
    check_template_exists(project_root, stack)?;

    let outcome = package_and_deploy(executor, settings, stack, project_root);
    let removed = remove_file_if_exists(&project_root.join(&settings.output_template));
    outcome?;
    removed?;
    Ok(())
}

fn package_and_deploy(
    executor: &dyn ProcessExecutor,
    settings: &DeploySettings,
    stack: &StackConfig,
    project_root: &Path,
) -> Result<(), DeployError> {
    let vars = [
        ("template", stack.template_name()),
        ("bucket", stack.bucket()),
        ("prefix", stack.bucket_prefix()),
        ("output_template", settings.output_template.as_str()),
        ("stack", stack.stack_name()),
    ];

    info!(
        "Packaging {} to s3://{}/{}",
        stack.template_name(),
        stack.bucket(),
        stack.bucket_prefix()
    );
    let package = render_command(&settings.package_command, &vars);
    run_checked(executor, &package, project_root).map_err(DeployError::Package)?;

    info!("Deploying stack {}", stack.stack_name());
    let deploy = render_command(&settings.deploy_command, &vars);
    run_checked(executor, &deploy, project_root).map_err(DeployError::Deploy)?;
    Ok(())
}
