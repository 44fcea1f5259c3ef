//! Build and deploy serverless function units.
//!
//! A project keeps each function in its own directory under a units root
//! (`lambdas/` by default). This crate validates that layout, builds one zip
//! artifact per function, and hands the project to the cloud tooling for
//! packaging and deployment:
//!
//! - **Preflight checks** - Project layout and host tool validation
//! - **Unit builds** - Staging copy, dependency vendoring, archive creation
//! - **Deployment** - Package and deploy commands against a stack template
//! - **Pipeline** - Orchestration with per-unit outcomes and one verdict
//!
//! # Architecture
//!
//! ```text
//! sam-deployer (binary)
//!     │
//!     ├── pipeline::config   sam-deployer.toml + CLI overrides
//!     │
//!     └── pipeline::Pipeline
//!             ├── preflight   structural checks, stop at first failure
//!             ├── build       one UnitResult per unit, failures contained
//!             ├── deploy      package + deploy via ProcessExecutor
//!             └── cleanup     staging directories removed afterwards
//! ```
//!
//! All external programs run through [`process::ProcessExecutor`] with an
//! explicit working directory. The process working directory is never
//! changed.
//!
//! # Example
//!
//! ```rust,ignore
//! use sam_deployer::pipeline::config::{BuildSettings, DeploySettings, StackConfig};
//! use sam_deployer::{Pipeline, ShellExecutor};
//!
//! let executor = ShellExecutor::new(Duration::from_secs(900));
//! let pipeline = Pipeline::new(".", BuildSettings::default(), DeploySettings::default(), &executor);
//! let stack = StackConfig::new("orders", "my-artifact-bucket")?;
//!
//! let report = pipeline.deploy(&stack, "lambdas");
//! for message in report.messages() {
//!     println!("{message}");
//! }
//! ```

pub mod artifact;
pub mod build;
pub mod deploy;
pub mod error;
pub mod pipeline;
pub mod preflight;
pub mod process;

pub use build::{Unit, UnitResult};
pub use pipeline::{Pipeline, RunReport};
pub use process::{ProcessExecutor, ShellExecutor};
