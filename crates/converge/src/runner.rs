//! Command runner - executes a [`CommandSpec`] and reports its outcome
//!
//! The runner never panics and never aborts: launch failures and non-zero
//! exits are both data in the returned [`CommandOutcome`]. Escalation is the
//! caller's business (see [`ApplyContext::run`](crate::ApplyContext::run)).

use std::io::{self, Write};
use std::process::{Child, Command, Stdio};

use crate::command::{CommandOutcome, CommandSpec, LaunchError, Program};

/// Provider for command execution
///
/// Implement this trait to run commands somewhere other than the local
/// machine, or to script outcomes in tests.
pub trait CommandRunner {
    fn execute(&self, spec: &CommandSpec) -> CommandOutcome;
}

/// Runs commands as local child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(spec: &CommandSpec) -> Option<Command> {
        let mut cmd = match spec.program() {
            Program::Argv(argv) => {
                let (program, args) = argv.split_first()?;
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            Program::Shell(script) => {
                let mut cmd = Command::new("/bin/sh");
                cmd.arg("-c").arg(script);
                cmd
            }
        };
        cmd.envs(spec.envs().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Some(cmd)
    }

    /// Start the child, writing the spec's input to its stdin when it has one
    fn spawn(cmd: &mut Command, input: Option<&str>, stdin: Stdio) -> io::Result<Child> {
        let Some(input) = input else {
            return cmd.stdin(stdin).spawn();
        };
        let mut child = cmd.stdin(Stdio::piped()).spawn()?;
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes())?;
        }
        Ok(child)
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, spec: &CommandSpec) -> CommandOutcome {
        log::debug!("Running: {spec}");

        let Some(mut cmd) = Self::command(spec) else {
            return CommandOutcome::launch_failed(LaunchError {
                kind: std::io::ErrorKind::InvalidInput,
                message: "empty command".to_string(),
            });
        };

        let outcome = if spec.captures_output() {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            Self::spawn(&mut cmd, spec.input(), Stdio::null())
                .and_then(Child::wait_with_output)
                .map(|output| {
                    CommandOutcome::exited(
                        output.status.code(),
                        Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                        Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                    )
                })
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            Self::spawn(&mut cmd, spec.input(), Stdio::inherit())
                .and_then(|mut child| child.wait())
                .map(|status| CommandOutcome::exited(status.code(), None, None))
        };

        match outcome {
            Ok(outcome) => {
                log::debug!("Exit status of '{spec}': {:?}", outcome.exit_code);
                if let Some(stderr) = &outcome.stderr {
                    log::trace!("stderr of '{spec}':\n{stderr}");
                }
                outcome
            }
            Err(e) => {
                log::debug!("Failed to execute '{spec}': {e}");
                CommandOutcome::launch_failed(LaunchError::from_io(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_captures_stdout() {
        let outcome = SystemRunner.execute(&CommandSpec::new("echo").arg("hello"));
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout.as_deref(), Some("hello\n"));
        assert!(outcome.stderr.is_none());
    }

    #[test]
    fn test_failure_is_data() {
        let outcome = SystemRunner.execute(&CommandSpec::new("false"));
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome.launch_error.is_none());
    }

    #[test]
    fn test_shell_and_env() {
        let spec = CommandSpec::shell("echo \"$GREETING\" >&2; exit 3").env("GREETING", "hi");
        let outcome = SystemRunner.execute(&spec);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stderr.as_deref(), Some("hi\n"));
        assert!(outcome.stdout.is_none());
    }

    #[test]
    fn test_input_goes_to_stdin() {
        let outcome = SystemRunner.execute(&CommandSpec::new("cat").secret_stdin("select 1;\n"));
        assert!(outcome.success);
        assert_eq!(outcome.stdout.as_deref(), Some("select 1;\n"));
    }

    #[test]
    fn test_missing_executable() {
        let outcome = SystemRunner.execute(&CommandSpec::new("definitely-not-a-real-program-xyz"));
        assert!(!outcome.success);
        assert!(outcome.is_not_found());
        assert!(outcome.stdout.is_none());
        assert!(outcome.exit_code.is_none());
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let outcome = SystemRunner.execute(&CommandSpec::shell(r"printf 'a\377b'"));
        assert!(outcome.success);
        assert_eq!(outcome.stdout.as_deref(), Some("a\u{fffd}b"));
    }

    #[test]
    fn test_streamed_output_is_not_captured() {
        let outcome = SystemRunner.execute(&CommandSpec::new("true").stream());
        assert!(outcome.success);
        assert!(outcome.stdout.is_none());
    }
}
