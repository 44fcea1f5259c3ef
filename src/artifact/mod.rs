//! Artifact builders for deployable units.
//!
//! - [`filesystem`] - Directory listing, staging copies, idempotent removal
//! - [`vendor`] - Dependency installation into a staged unit
//! - [`archive`] - Zip creation, named after the unit

pub mod archive;
pub mod filesystem;
pub mod vendor;
