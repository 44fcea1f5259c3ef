//! Aggregated outcome of a pipeline run.

use crate::build::UnitResult;

/// Coarse status of one unit, for callers that don't need the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Built,
    Skipped,
    Failed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub name: String,
    pub status: UnitStatus,
}

/// Ordered messages plus one verdict.
///
/// The verdict only ever goes from success to failure; skipped units never
/// flip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    messages: Vec<String>,
    units: Vec<UnitOutcome>,
    success: bool,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            units: Vec::new(),
            success: true,
        }
    }

    /// Record a unit build result as `<unit>: <outcome>`.
    pub fn record_unit(&mut self, name: &str, result: &UnitResult) {
        let status = match result {
            UnitResult::Built { .. } => UnitStatus::Built,
            UnitResult::Skipped(_) => UnitStatus::Skipped,
            UnitResult::Failed(_) => UnitStatus::Failed,
        };
        self.record(name, status, result.to_string());
    }

    /// Record an arbitrary per-unit outcome.
    pub fn record(&mut self, name: &str, status: UnitStatus, detail: impl AsRef<str>) {
        if status == UnitStatus::Failed {
            self.success = false;
        }
        self.messages.push(format!("{name}: {}", detail.as_ref()));
        self.units.push(UnitOutcome {
            name: name.to_string(),
            status,
        });
    }

    /// Add a message that doesn't change the verdict.
    pub fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Add a message and mark the run as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
        self.success = false;
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn units(&self) -> &[UnitOutcome] {
        &self.units
    }

    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }
}
