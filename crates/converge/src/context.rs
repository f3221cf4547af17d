//! Apply context and provider wiring
//!
//! [`ApplyContext`] is threaded through every stage and resource. It owns
//! the run's [`Tracer`] and borrows the command runner and file store, so
//! the convergence code never depends on a concrete implementation of
//! either.

use std::cell::Cell;
use std::path::Path;

use crate::command::{CommandOutcome, CommandSpec};
use crate::error::{Fatal, FatalKind, Result};
use crate::files::FileStore;
use crate::matchers::LinePattern;
use crate::resource::{self, Resource};
use crate::runner::CommandRunner;
use crate::trace::{Step, Tracer};
use crate::types::{ApplyResult, ExecuteSummary};

/// Context passed to stages and resource operations
pub struct ApplyContext<'a> {
    tracer: Tracer,
    runner: &'a dyn CommandRunner,
    files: &'a dyn FileStore,
    summary: Cell<ExecuteSummary>,
}

impl<'a> ApplyContext<'a> {
    pub fn new(tracer: Tracer, runner: &'a dyn CommandRunner, files: &'a dyn FileStore) -> Self {
        Self {
            tracer,
            runner,
            files,
            summary: Cell::new(ExecuteSummary::default()),
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn files(&self) -> &dyn FileStore {
        self.files
    }

    /// Start a traced step
    pub fn step(&self, label: impl Into<String>) -> Step<'_> {
        self.tracer.enter(label)
    }

    /// A progress line inside the innermost open step
    pub fn wip(&self, text: &str) {
        self.tracer.wip(text);
    }

    /// A progress line outside any step
    pub fn note(&self, text: &str) {
        self.tracer.note(text);
    }

    /// Report a fatal condition and return it for propagation
    pub fn fatal(&self, kind: FatalKind, message: impl Into<String>) -> Fatal {
        self.tracer.fatal(kind, message)
    }

    /// Run a command without any escalation
    pub fn execute(&self, spec: &CommandSpec) -> CommandOutcome {
        self.runner.execute(spec)
    }

    /// Run a command, escalating a failure to a fatal when the spec asks for it
    ///
    /// A missing executable is never escalated: the outcome comes back with
    /// `success == false` and callers treat it as a plain "no".
    pub fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome> {
        let outcome = self.runner.execute(spec);
        if outcome.success || !spec.aborts_on_error() || outcome.is_not_found() {
            return Ok(outcome);
        }

        let command = spec.to_string();
        let message = format!("Command '{command}' failed ({})", outcome.failure_reason());
        Err(self.fatal(
            FatalKind::Command {
                command,
                outcome: Box::new(outcome),
            },
            message,
        ))
    }

    /// Run a command and report whether it exited 0
    pub fn succeeds(&self, spec: &CommandSpec) -> bool {
        self.runner.execute(spec).success
    }

    /// Run a command and check its stdout against a line pattern
    ///
    /// A failed or missing command counts as "does not match".
    pub fn check_output(&self, spec: &CommandSpec, pattern: &LinePattern) -> bool {
        let outcome = self.runner.execute(spec);
        outcome.success && outcome.stdout_matches(pattern)
    }

    /// Like [`check_output`](Self::check_output), but a mismatch is fatal
    pub fn require_output(&self, spec: &CommandSpec, pattern: &LinePattern) -> Result<()> {
        if self.check_output(spec, pattern) {
            return Ok(());
        }
        Err(self.fatal(
            FatalKind::OutputMismatch,
            format!(
                "Command '{spec}' output does not match '{}'",
                pattern.as_str()
            ),
        ))
    }

    /// Whole file contents, `None` when the file cannot be read
    pub fn read_file(&self, path: &Path) -> Option<String> {
        match self.files.read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                log::debug!("Cannot read {}: {e}", path.display());
                None
            }
        }
    }

    /// Overwrite a file, a failure is fatal
    pub fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        self.files.write(path, contents).map_err(|e| {
            self.fatal(
                FatalKind::Filesystem,
                format!("Cannot write {}: {e}", path.display()),
            )
        })
    }

    /// Converge one resource and record the result
    pub fn converge(&self, resource: &dyn Resource) -> Result<ApplyResult> {
        resource::converge(self, resource)
    }

    /// Run a named stage body between "Ensuring ..." and "... setup ok." lines
    pub fn ensuring<F>(&self, title: &str, body: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let step = self.step(format!("Ensuring {title} setup..."));
        body()?;
        step.done(&format!("{title} setup ok."));
        self.tracer.blank_line();
        Ok(())
    }

    pub fn record(&self, result: ApplyResult) {
        let mut summary = self.summary.get();
        summary.add_result(result);
        self.summary.set(summary);
    }

    pub fn record_stage(&self) {
        let mut summary = self.summary.get();
        summary.stages += 1;
        self.summary.set(summary);
    }

    pub fn summary(&self) -> ExecuteSummary {
        self.summary.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryFs, ScriptedRunner, SharedBuffer};

    fn context<'a>(runner: &'a ScriptedRunner, fs: &'a MemoryFs) -> (ApplyContext<'a>, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (ApplyContext::new(Tracer::new(buffer.clone()), runner, fs), buffer)
    }

    #[test]
    fn test_run_escalates_failure() {
        let runner = ScriptedRunner::new().respond("apt install", CommandOutcome::failure(100, "E: broken"));
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        let err = ctx
            .run(&CommandSpec::new("apt").args(["install", "-y", "nope"]))
            .unwrap_err();

        match err.kind() {
            FatalKind::Command { command, outcome } => {
                assert_eq!(command, "apt install -y nope");
                assert_eq!(outcome.exit_code, Some(100));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert_eq!(
            buffer.contents(),
            " 💀 Command 'apt install -y nope' failed (exit status 100: E: broken)\n"
        );
    }

    #[test]
    fn test_run_allow_failure_returns_outcome() {
        let runner = ScriptedRunner::new().respond("false", CommandOutcome::failure(1, ""));
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        let outcome = ctx.run(&CommandSpec::new("false").allow_failure()).unwrap();
        assert!(!outcome.success);
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_run_never_escalates_missing_executable() {
        let runner = ScriptedRunner::new().respond("ufw", CommandOutcome::not_found("ufw"));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        let outcome = ctx.run(&CommandSpec::new("ufw").arg("status")).unwrap();
        assert!(outcome.is_not_found());
        assert!(!ctx.tracer().is_aborted());
    }

    #[test]
    fn test_check_output() {
        let runner = ScriptedRunner::new()
            .respond("git --version", CommandOutcome::success("git version 2.17.1\n"))
            .respond("curl --version", CommandOutcome::failure(2, ""));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        let git = LinePattern::new(r"git version 2\.").unwrap();
        assert!(ctx.check_output(&CommandSpec::new("git").arg("--version"), &git));

        let curl = LinePattern::new("curl").unwrap();
        assert!(!ctx.check_output(&CommandSpec::new("curl").arg("--version"), &curl));
    }

    #[test]
    fn test_require_output_mismatch_is_fatal() {
        let runner = ScriptedRunner::new().respond("psql --version", CommandOutcome::success("psql (PostgreSQL) 9.6\n"));
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        let pattern = LinePattern::new(r"psql \(PostgreSQL\) 10\.").unwrap();
        let err = ctx
            .require_output(&CommandSpec::new("psql").arg("--version"), &pattern)
            .unwrap_err();

        assert_eq!(err.kind(), &FatalKind::OutputMismatch);
        assert!(buffer.contents().starts_with(" 💀 Command 'psql --version' output does not match"));
    }

    #[test]
    fn test_ensuring_wraps_body() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        ctx.ensuring("Firewall", || {
            ctx.step("Checking...").no_op("Nothing to do.");
            Ok(())
        })
        .unwrap();

        assert_eq!(
            buffer.contents(),
            " ┌ Ensuring Firewall setup...\n   ┌ Checking...\n   └ Nothing to do. ✓\n └ Firewall setup ok.\n\n"
        );
    }

    #[test]
    fn test_ensuring_stops_on_fatal() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        let result = ctx.ensuring("Nginx", || Err(ctx.fatal(FatalKind::Verification, "boom")));

        assert!(result.is_err());
        assert_eq!(buffer.contents(), " ┌ Ensuring Nginx setup...\n 💀 boom\n");
    }

    #[test]
    fn test_write_and_read_file() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        let path = Path::new("/etc/app.conf");
        assert!(ctx.read_file(path).is_none());
        ctx.write_file(path, "x = 1\n").unwrap();
        assert_eq!(ctx.read_file(path).as_deref(), Some("x = 1\n"));
    }

    #[test]
    fn test_summary_records() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        ctx.record(ApplyResult::Changed);
        ctx.record(ApplyResult::NoChange);
        ctx.record_stage();

        let summary = ctx.summary();
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.stages, 1);
    }
}
