//! sam-deployer CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sam_deployer::pipeline::config::{ProjectConfig, StackInput};
use sam_deployer::preflight::{any_unit_needs_install, check_required_tools, required_tools};
use sam_deployer::{Pipeline, RunReport, ShellExecutor};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sam-deployer", version)]
#[command(about = "Build and deploy serverless function units", long_about = None)]
struct Cli {
    /// Project root containing the units root and the stack template
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (default: <project-dir>/sam-deployer.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct UnitsArgs {
    /// Directory holding one subdirectory per function
    #[arg(long)]
    units_root: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and build every unit, leaving artifacts in place
    Build {
        #[command(flatten)]
        units: UnitsArgs,
    },
    /// Validate and remove every unit's staging directory
    Clean {
        #[command(flatten)]
        units: UnitsArgs,
    },
    /// Validate, build, deploy the stack, then clean up
    Deploy {
        #[command(flatten)]
        units: UnitsArgs,
        /// Target stack name
        #[arg(long, env = "SAM_DEPLOYER_STACK")]
        stack_name: Option<String>,
        /// Bucket receiving the packaged artifacts
        #[arg(long, env = "SAM_DEPLOYER_BUCKET")]
        bucket: Option<String>,
        /// Key prefix inside the bucket (default: the stack name)
        #[arg(long)]
        bucket_prefix: Option<String>,
        /// Stack template file in the project root
        #[arg(long)]
        template: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("Arguments: {:?}", cli);

    match run(cli) {
        Ok(report) => {
            for message in report.messages() {
                println!("{message}");
            }
            ExitCode::from(report.exit_code())
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<RunReport> {
    let config = ProjectConfig::load(&cli.project_dir, cli.config.as_deref()).with_context(|| {
        format!(
            "Failed to load configuration for '{}'",
            cli.project_dir.display()
        )
    })?;
    let executor = ShellExecutor::new(config.build.command_timeout);
    let ProjectConfig {
        units_root: default_units_root,
        build,
        deploy,
        stack: file_stack,
    } = config;
    let pipeline = Pipeline::new(&cli.project_dir, build, deploy, &executor);

    match cli.command {
        Commands::Build { units } => {
            let units_root = units.units_root.unwrap_or(default_units_root);
            if let Some(report) = preflight(&pipeline, &units_root, false)? {
                return Ok(report);
            }
            Ok(pipeline.build(&units_root))
        }
        Commands::Clean { units } => {
            let units_root = units.units_root.unwrap_or(default_units_root);
            Ok(pipeline.clean(&units_root))
        }
        Commands::Deploy {
            units,
            stack_name,
            bucket,
            bucket_prefix,
            template,
        } => {
            let units_root = units.units_root.unwrap_or(default_units_root);
            let stack = StackInput {
                name: stack_name,
                bucket,
                bucket_prefix,
                template,
            }
            .or(file_stack)
            .resolve()
            .context("Invalid stack settings (pass --stack-name/--bucket or set [stack] in the config)")?;

            if let Some(report) = preflight(&pipeline, &units_root, true)? {
                return Ok(report);
            }
            Ok(pipeline.deploy(&stack, &units_root))
        }
    }
}

/// Structural validation, then host tools.
///
/// A structural failure is returned as a one-message report; a missing
/// tool is an error.
fn preflight(
    pipeline: &Pipeline<'_>,
    units_root: &str,
    deploying: bool,
) -> Result<Option<RunReport>> {
    if let Err(err) = pipeline.validate(units_root) {
        let mut report = RunReport::new();
        report.fail(err.to_string());
        return Ok(Some(report));
    }

    let settings = pipeline.build_settings();
    let root_path = pipeline.project_root().join(units_root);
    let needs_install = any_unit_needs_install(&root_path, settings)
        .with_context(|| format!("Failed to inspect units in '{}'", root_path.display()))?;

    let tools = required_tools(
        settings,
        deploying.then(|| pipeline.deploy_settings()),
        needs_install,
    );
    check_required_tools(tools.as_slice())?;
    Ok(None)
}
