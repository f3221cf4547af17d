//! Core types for convergence results

/// Result of converging a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// Resource was already in the desired state
    NoChange,
    /// Resource was changed and verified
    Changed,
}

impl ApplyResult {
    /// Check if the result represents a change
    ///
    /// Callers use this to trigger dependent follow-up work, e.g. restart a
    /// service only when its configuration file was rewritten.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Summary of a plan execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    /// Resources that had to be changed
    pub changed: usize,
    /// Resources already in the desired state
    pub unchanged: usize,
    /// Stages run to completion
    pub stages: usize,
}

impl ExecuteSummary {
    /// Total number of resources converged
    pub fn total(&self) -> usize {
        self.changed + self.unchanged
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: ApplyResult) {
        match result {
            ApplyResult::NoChange => self.unchanged += 1,
            ApplyResult::Changed => self.changed += 1,
        }
    }
}
