//! Command specifications and outcomes
//!
//! A [`CommandSpec`] describes what to run; a [`CommandOutcome`] describes
//! what happened. Both are plain values: a spec is immutable once built and
//! an outcome is created by the runner and consumed by the caller.

use std::fmt;
use std::io;

use crate::matchers::{self, LinePattern};

/// What to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Program followed by its arguments, executed directly
    Argv(Vec<String>),
    /// A command line interpreted by `/bin/sh -c`
    Shell(String),
}

/// An executable unit plus its execution options
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: Program,
    env: Vec<(String, String)>,
    input: Option<String>,
    secret_input: bool,
    capture: bool,
    abort_on_error: bool,
}

impl CommandSpec {
    /// Run `program` directly (no shell)
    pub fn new(program: impl Into<String>) -> Self {
        Self::from_program(Program::Argv(vec![program.into()]))
    }

    /// Run a command line through `/bin/sh -c`
    ///
    /// Only for fixed command lines; never splice configuration values into
    /// the string, use [`CommandSpec::new`] with arguments instead.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::from_program(Program::Shell(script.into()))
    }

    fn from_program(program: Program) -> Self {
        Self {
            program,
            env: Vec::new(),
            input: None,
            secret_input: false,
            capture: true,
            abort_on_error: true,
        }
    }

    /// Append one argument (ignored for shell commands)
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        if let Program::Argv(argv) = &mut self.program {
            argv.push(arg.into());
        }
        self
    }

    /// Append several arguments (ignored for shell commands)
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Program::Argv(argv) = &mut self.program {
            argv.extend(args.into_iter().map(Into::into));
        }
        self
    }

    /// Set an extra environment variable for the child process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed `input` to the child's stdin
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Feed `input` to the child's stdin and never render it
    ///
    /// For payloads carrying credentials: they stay out of the process list
    /// and every rendered command line shows `<redacted>` instead.
    pub fn secret_stdin(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self.secret_input = true;
        self
    }

    /// Let the child inherit stdio so its output shows live instead of being captured
    pub fn stream(mut self) -> Self {
        self.capture = false;
        self
    }

    /// Return a failed outcome on non-zero exit instead of aborting the plan
    pub fn allow_failure(mut self) -> Self {
        self.abort_on_error = false;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn captures_output(&self) -> bool {
        self.capture
    }

    pub fn aborts_on_error(&self) -> bool {
        self.abort_on_error
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let input = match &self.input {
            Some(_) if self.secret_input => Some(REDACTED),
            other => other.as_deref(),
        };
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("env", &self.env)
            .field("input", &input)
            .field("capture", &self.capture)
            .field("abort_on_error", &self.abort_on_error)
            .finish()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.program {
            Program::Argv(argv) => {
                let quoted: Vec<String> = argv.iter().map(|a| quote(a)).collect();
                write!(f, "{}", quoted.join(" "))?;
            }
            Program::Shell(script) => write!(f, "sh -c {}", quote(script))?,
        }
        match &self.input {
            Some(_) if self.secret_input => write!(f, " <<< {REDACTED}"),
            Some(input) => write!(f, " <<< {}", quote(input)),
            None => Ok(()),
        }
    }
}

const REDACTED: &str = "<redacted>";

/// Quote an argument for display the way a POSIX shell would read it back
fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Why a process could not be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchError {
    pub kind: io::ErrorKind,
    pub message: String,
}

impl LaunchError {
    pub fn from_io(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// The executable does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind == io::ErrorKind::NotFound
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of running a [`CommandSpec`]
///
/// If `launch_error` is set, `success` is false and no output or exit code
/// is present. Otherwise `success` is true exactly when the exit code is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub launch_error: Option<LaunchError>,
}

impl CommandOutcome {
    /// Outcome of a process that ran to completion
    ///
    /// Empty output is stored as absent. `exit_code` is `None` when the
    /// process was killed by a signal, which counts as failure.
    pub fn exited(exit_code: Option<i32>, stdout: Option<String>, stderr: Option<String>) -> Self {
        Self {
            success: exit_code == Some(0),
            exit_code,
            stdout: stdout.filter(|s| !s.is_empty()),
            stderr: stderr.filter(|s| !s.is_empty()),
            launch_error: None,
        }
    }

    /// Outcome of a process that could not be started
    pub fn launch_failed(error: LaunchError) -> Self {
        Self {
            success: false,
            exit_code: None,
            stdout: None,
            stderr: None,
            launch_error: Some(error),
        }
    }

    /// Successful exit with the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::exited(Some(0), Some(stdout.into()), None)
    }

    /// Failed exit with the given code and stderr
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::exited(Some(exit_code), None, Some(stderr.into()))
    }

    /// Executable not found
    pub fn not_found(program: &str) -> Self {
        Self::launch_failed(LaunchError {
            kind: io::ErrorKind::NotFound,
            message: format!("{program}: command not found"),
        })
    }

    /// The executable was missing; callers treat this as a plain "false"
    pub fn is_not_found(&self) -> bool {
        self.launch_error.as_ref().is_some_and(LaunchError::is_not_found)
    }

    pub fn has_stdout(&self) -> bool {
        matchers::has_content(self.stdout.as_deref())
    }

    pub fn stdout_contains(&self, needle: &str) -> bool {
        matchers::contains(self.stdout.as_deref(), needle)
    }

    pub fn stdout_starts_with(&self, prefix: &str) -> bool {
        matchers::starts_with(self.stdout.as_deref(), prefix)
    }

    pub fn stdout_matches(&self, pattern: &LinePattern) -> bool {
        matchers::matches(self.stdout.as_deref(), pattern)
    }

    /// One-line reason for a failure, for diagnostics
    pub fn failure_reason(&self) -> String {
        if let Some(err) = &self.launch_error {
            return err.to_string();
        }
        let last_stderr_line = self
            .stderr
            .as_deref()
            .and_then(|s| s.lines().rev().find(|l| !l.trim().is_empty()))
            .map(str::trim);
        match (self.exit_code, last_stderr_line) {
            (Some(code), Some(line)) => format!("exit status {code}: {line}"),
            (Some(code), None) => format!("exit status {code}"),
            (None, Some(line)) => format!("terminated by signal: {line}"),
            (None, None) => "terminated by signal".to_string(),
        }
    }
}
