//! Step tracer - the nested progress trace
//!
//! Every line has the shape `" " + "  " * depth + glyph + " " + text`:
//!
//! ```text
//!  ┌ Ensuring Firewall setup...
//!    ┌ Checking firewall status...
//!    └ Firewall already enabled. ✓
//!  └ Firewall setup ok.
//! ```
//!
//! Fatal lines are never indented (` 💀 text`). After a fatal line the tracer
//! is aborted and drops all further output, so enclosing steps never print
//! their close line.
//!
//! Consumers may parse this output, so glyphs and indentation are stable.

use colored::Colorize;
use std::cell::{Cell, RefCell};
use std::io::{self, IsTerminal, Write};

use crate::error::{Fatal, FatalKind};

pub const START_GLYPH: &str = "┌";
pub const WIP_GLYPH: &str = "│";
pub const CLOSE_GLYPH: &str = "└";
pub const NOTE_GLYPH: &str = ".";
pub const FATAL_GLYPH: &str = "💀";
/// Suffix appended to the close line of a step that had nothing to do
pub const NO_OP_MARK: &str = "✓";

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy)]
enum LineKind {
    Start,
    Wip,
    Close,
    Note,
    Fatal,
}

/// Nesting-aware progress reporter
///
/// The depth counter belongs to this value, not to the process: give each
/// independent run its own tracer.
pub struct Tracer {
    out: RefCell<Box<dyn Write>>,
    color: bool,
    depth: Cell<usize>,
    entered: Cell<usize>,
    closed: Cell<usize>,
    aborted: Cell<bool>,
}

impl Tracer {
    /// Trace into any writer, without colors
    pub fn new(out: impl Write + 'static) -> Self {
        Self {
            out: RefCell::new(Box::new(out)),
            color: false,
            depth: Cell::new(0),
            entered: Cell::new(0),
            closed: Cell::new(0),
            aborted: Cell::new(false),
        }
    }

    /// Trace to stdout, colored when stdout is a terminal
    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal();
        Self::new(io::stdout()).with_color(color)
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Number of steps entered so far
    pub fn entered(&self) -> usize {
        self.entered.get()
    }

    /// Number of steps concluded with no-op or done
    pub fn closed(&self) -> usize {
        self.closed.get()
    }

    /// A fatal line has been printed
    pub fn is_aborted(&self) -> bool {
        self.aborted.get()
    }

    /// Start a step: print its label, then nest one level deeper
    pub fn enter(&self, label: impl Into<String>) -> Step<'_> {
        let label = label.into();
        self.emit(self.depth(), LineKind::Start, &label);
        self.depth.set(self.depth() + 1);
        self.entered.set(self.entered() + 1);
        Step {
            tracer: self,
            label,
            open: true,
        }
    }

    /// A progress line inside the innermost open step
    pub fn wip(&self, text: &str) {
        self.emit(self.depth(), LineKind::Wip, text);
    }

    /// A progress line at the current depth that belongs to no step
    pub fn note(&self, text: &str) {
        self.emit(self.depth(), LineKind::Note, text);
    }

    pub fn blank_line(&self) {
        self.write_line("");
    }

    /// Print the fatal line and return the value to propagate
    ///
    /// Depth is left untouched: the run is over.
    pub fn fatal(&self, kind: FatalKind, message: impl Into<String>) -> Fatal {
        let message = message.into();
        if let FatalKind::Command { command, outcome } = &kind {
            log::debug!("Fatal command: {command}");
            if let Some(stderr) = &outcome.stderr {
                log::debug!("stderr:\n{stderr}");
            }
        }
        let glyph = self.paint(FATAL_GLYPH, LineKind::Fatal);
        self.write_line(&format!(" {glyph} {message}"));
        self.aborted.set(true);
        Fatal::new(kind, message)
    }

    fn close(&self, text: &str) {
        self.depth.set(self.depth().saturating_sub(1));
        self.closed.set(self.closed() + 1);
        self.emit(self.depth(), LineKind::Close, text);
    }

    fn emit(&self, depth: usize, kind: LineKind, text: &str) {
        let glyph = match kind {
            LineKind::Start => START_GLYPH,
            LineKind::Wip => WIP_GLYPH,
            LineKind::Close => CLOSE_GLYPH,
            LineKind::Note => NOTE_GLYPH,
            LineKind::Fatal => FATAL_GLYPH,
        };
        let glyph = self.paint(glyph, kind);
        self.write_line(&format!(" {}{} {}", INDENT.repeat(depth), glyph, text));
    }

    fn paint(&self, glyph: &str, kind: LineKind) -> String {
        if !self.color {
            return glyph.to_string();
        }
        match kind {
            LineKind::Start => glyph.cyan().to_string(),
            LineKind::Wip => glyph.dimmed().to_string(),
            LineKind::Close => glyph.green().to_string(),
            LineKind::Note => glyph.blue().to_string(),
            LineKind::Fatal => glyph.red().bold().to_string(),
        }
    }

    fn write_line(&self, line: &str) {
        if self.aborted.get() {
            return;
        }
        let mut out = self.out.borrow_mut();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            log::debug!("Failed to write trace line: {e}");
        }
    }
}

/// A traced unit of work
///
/// Conclude it with exactly one of [`no_op`](Step::no_op),
/// [`done`](Step::done) or [`fatal`](Step::fatal); each consumes the step.
#[must_use = "a step must be concluded with no_op, done or fatal"]
pub struct Step<'t> {
    tracer: &'t Tracer,
    label: String,
    open: bool,
}

impl Step<'_> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// A progress line inside this step
    pub fn wip(&self, text: &str) {
        self.tracer.wip(text);
    }

    /// Nothing needed to change
    pub fn no_op(mut self, text: &str) {
        self.open = false;
        self.tracer.close(&format!("{text} {NO_OP_MARK}"));
    }

    /// The work was performed
    pub fn done(mut self, text: &str) {
        self.open = false;
        self.tracer.close(text);
    }

    /// Abort the whole run from inside this step
    pub fn fatal(mut self, kind: FatalKind, message: impl Into<String>) -> Fatal {
        self.open = false;
        self.tracer.fatal(kind, message)
    }
}

impl Drop for Step<'_> {
    fn drop(&mut self) {
        if self.open && !self.tracer.is_aborted() {
            log::debug!("Step '{}' dropped without a conclusion", self.label);
        }
    }
}
