//! Resource trait for idempotent convergence
//!
//! A Resource is something on the target machine that can be in the desired
//! state or not, and can be changed to reach it: a package, a user, a file,
//! a running service.

use std::fmt;

use crate::context::ApplyContext;
use crate::error::{FatalKind, Result};
use crate::types::ApplyResult;

/// Core trait for convergent resources
///
/// Every resource provides:
/// - Identity (id, type, description)
/// - Detection (is_satisfied), free of side effects
/// - Mutation (apply), which may itself fail hard through the context
///
/// [`converge`] ties them together: detect, mutate if needed, detect again.
///
/// # Example
///
/// ```ignore
/// use converge::{ApplyContext, CommandSpec, Resource, Result};
///
/// #[derive(Debug)]
/// struct Marker { path: String }
///
/// impl Resource for Marker {
///     fn id(&self) -> String { self.path.clone() }
///     fn resource_type(&self) -> &'static str { "marker" }
///     fn description(&self) -> String { format!("Checking marker {}...", self.path) }
///
///     fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
///         Ok(ctx.files().is_file(self.path.as_ref()))
///     }
///
///     fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
///         ctx.run(&CommandSpec::new("touch").arg(&self.path))?;
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Identifier, unique within the resource type (e.g. "curl" for a package)
    fn id(&self) -> String;

    /// Resource type category, e.g. "debian_package" or "systemd_service"
    fn resource_type(&self) -> &'static str;

    /// Label of the step that converges this resource
    fn description(&self) -> String;

    /// Detect whether the resource is already in the desired state
    ///
    /// Must not change anything. May return a fatal when the current state
    /// cannot even be determined.
    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool>;

    /// Change the system towards the desired state
    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()>;

    fn no_change_message(&self) -> String {
        "Nothing to do.".to_string()
    }

    fn applied_message(&self) -> String {
        "Done.".to_string()
    }

    /// Fatal message when the resource is still unsatisfied after apply
    fn verify_failure_message(&self) -> String {
        format!("{} '{}' is still not in the desired state!", self.resource_type(), self.id())
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Detect, mutate if needed, then verify
///
/// There is no retry: a resource that is still unsatisfied after
/// [`Resource::apply`] aborts the whole run.
pub fn converge(ctx: &ApplyContext<'_>, resource: &dyn Resource) -> Result<ApplyResult> {
    let step = ctx.step(resource.description());

    if resource.is_satisfied(ctx)? {
        step.no_op(&resource.no_change_message());
        ctx.record(ApplyResult::NoChange);
        return Ok(ApplyResult::NoChange);
    }

    log::info!("Applying {} '{}'", resource.resource_type(), resource.id());
    resource.apply(ctx)?;

    if !resource.is_satisfied(ctx)? {
        return Err(step.fatal(FatalKind::Verification, resource.verify_failure_message()));
    }

    step.done(&resource.applied_message());
    ctx.record(ApplyResult::Changed);
    Ok(ApplyResult::Changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutcome, CommandSpec};
    use crate::mock::{MemoryFs, ScriptedRunner, SharedBuffer};
    use crate::trace::Tracer;

    /// Satisfied when `test-probe` succeeds, fixed by `test-fix`
    #[derive(Debug)]
    struct Probe;

    impl Resource for Probe {
        fn id(&self) -> String {
            "probe".to_string()
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn description(&self) -> String {
            "Checking probe...".to_string()
        }

        fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
            Ok(ctx.succeeds(&CommandSpec::new("test-probe")))
        }

        fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
            ctx.run(&CommandSpec::new("test-fix"))?;
            Ok(())
        }

        fn applied_message(&self) -> String {
            "Probe fixed.".to_string()
        }
    }

    fn run(runner: &ScriptedRunner) -> (Result<ApplyResult>, String, crate::ExecuteSummary) {
        let fs = MemoryFs::new();
        let buffer = SharedBuffer::new();
        let ctx = ApplyContext::new(Tracer::new(buffer.clone()), runner, &fs);
        let result = converge(&ctx, &Probe);
        (result, buffer.contents(), ctx.summary())
    }

    #[test]
    fn test_satisfied_is_no_op() {
        let runner = ScriptedRunner::new();
        let (result, output, summary) = run(&runner);

        assert_eq!(result.unwrap(), ApplyResult::NoChange);
        assert_eq!(output, " ┌ Checking probe...\n └ Nothing to do. ✓\n");
        assert_eq!(runner.count("test-fix"), 0);
        assert_eq!(summary.unchanged, 1);
    }

    #[test]
    fn test_detect_mutate_detect() {
        let runner = ScriptedRunner::new()
            .respond("test-probe", CommandOutcome::failure(1, ""))
            .respond("test-probe", CommandOutcome::success(""));
        let (result, output, summary) = run(&runner);

        assert_eq!(result.unwrap(), ApplyResult::Changed);
        assert_eq!(output, " ┌ Checking probe...\n └ Probe fixed.\n");
        assert_eq!(runner.count("test-probe"), 2);
        assert_eq!(runner.count("test-fix"), 1);
        assert_eq!(summary.changed, 1);
    }

    #[test]
    fn test_still_unsatisfied_is_fatal() {
        let runner = ScriptedRunner::new().respond("test-probe", CommandOutcome::failure(1, ""));
        let (result, output, summary) = run(&runner);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), &FatalKind::Verification);
        assert_eq!(
            output,
            " ┌ Checking probe...\n 💀 test 'probe' is still not in the desired state!\n"
        );
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_failed_mutation_skips_verification() {
        let runner = ScriptedRunner::new()
            .respond("test-probe", CommandOutcome::failure(1, ""))
            .respond("test-fix", CommandOutcome::failure(2, "nope"));
        let (result, _, _) = run(&runner);

        assert!(matches!(result.unwrap_err().kind(), FatalKind::Command { .. }));
        assert_eq!(runner.count("test-probe"), 1);
    }
}
