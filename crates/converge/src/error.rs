//! The fatal result
//!
//! Any unrecoverable condition is a [`Fatal`] value returned up the call
//! chain. By the time a caller sees one, its line has already been printed by
//! the [`Tracer`](crate::Tracer); the top level only has to turn it into the
//! process exit status.

use thiserror::Error;

use crate::command::CommandOutcome;

/// Exit status for a run that ended in a fatal condition
pub const FATAL_EXIT_CODE: u8 = 1;

/// Category of a fatal condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalKind {
    /// Environment is unsuitable (not root, wrong distribution, bad config)
    Precondition,
    /// A command that must succeed exited non-zero
    Command {
        command: String,
        outcome: Box<CommandOutcome>,
    },
    /// A mutation ran but the state is still not the desired one
    Verification,
    /// Captured output did not have the expected shape
    OutputMismatch,
    /// A policy rejected the input (e.g. password too short)
    Policy,
    /// Reading or writing a local file failed
    Filesystem,
}

/// An unrecoverable condition that aborts the whole plan
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Fatal {
    kind: FatalKind,
    message: String,
}

impl Fatal {
    /// Only the tracer creates fatals, so every one of them has been reported
    pub(crate) fn new(kind: FatalKind, message: String) -> Self {
        Self { kind, message }
    }

    pub fn kind(&self) -> &FatalKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        FATAL_EXIT_CODE
    }
}

/// Result type for everything that may abort the plan
pub type Result<T, E = Fatal> = std::result::Result<T, E>;
