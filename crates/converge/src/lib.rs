//! # Converge
//!
//! An idempotent convergence engine for provisioning a single machine.
//!
//! Every unit of work follows the same shape: check the current state, skip
//! when it is already the desired one, otherwise mutate, verify the mutation
//! took effect, and abort the whole run when it did not. Units nest into a
//! tree of named steps whose progress is printed as an indented trace.
//!
//! ## Core Concepts
//!
//! - **CommandRunner**: runs a [`CommandSpec`], failures are data in a [`CommandOutcome`]
//! - **Tracer / Step**: the nested progress trace
//! - **Resource**: something with a desired state, converged by [`converge()`]
//! - **ExecutionPlan**: ordered named stages, executed by [`execute`]
//! - **Fatal**: the value that aborts a run, already reported when you see it
//!
//! ## Example
//!
//! ```ignore
//! use converge::{ApplyContext, ExecutionPlan, LocalFs, SystemRunner, Tracer, execute};
//!
//! let plan = ExecutionPlan::new().stage("firewall", "Firewall", ensure_firewall);
//! let ctx = ApplyContext::new(Tracer::stdout(), &SystemRunner, &LocalFs);
//! let summary = execute(&plan, &ctx, &config)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`CommandRunner`]: executes commands ([`SystemRunner`] for real processes)
//! - [`FileStore`]: whole-file access ([`LocalFs`] for the real filesystem)
//!
//! [`mock`] has scripted implementations of both for tests.

pub mod command;
pub mod context;
pub mod error;
pub mod executor;
pub mod files;
pub mod matchers;
pub mod mock;
pub mod planner;
pub mod resource;
pub mod runner;
pub mod trace;
pub mod types;

// Re-export main types at crate root
pub use command::{CommandOutcome, CommandSpec, LaunchError, Program};
pub use context::ApplyContext;
pub use error::{FATAL_EXIT_CODE, Fatal, FatalKind, Result};
pub use executor::execute;
pub use files::{FileStore, LocalFs};
pub use matchers::LinePattern;
pub use planner::{ExecutionPlan, Stage, StageFn};
pub use resource::{BoxedResource, Resource, converge};
pub use runner::{CommandRunner, SystemRunner};
pub use trace::{Step, Tracer};
pub use types::{ApplyResult, ExecuteSummary};
