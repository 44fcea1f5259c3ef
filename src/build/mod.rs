//! Unit discovery and per-unit artifact builds.
//!
//! This module provides:
//! - [`unit`] - The [`Unit`] type and units-root discovery
//! - [`builder`] - Clean, contained per-unit builds

pub mod builder;
pub mod unit;

pub use builder::{UnitBuilder, UnitResult, SHARED_SKIP_REASON};
pub use unit::{discover_units, Unit};
