//! Test doubles for the provider traits
//!
//! Deterministic stand-ins so plans can be exercised without spawning
//! processes or touching the real filesystem.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::command::{CommandOutcome, CommandSpec};
use crate::files::FileStore;
use crate::runner::CommandRunner;

/// A command runner that replays scripted outcomes
///
/// Responses are keyed by a prefix of the rendered command line; the
/// longest matching prefix wins. Responses for one prefix are consumed in
/// order and the last one repeats forever. Commands with no response
/// succeed with no output. Every call is recorded as its rendered command
/// line, and any stdin payload separately.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: RefCell<Vec<(String, VecDeque<CommandOutcome>)>>,
    calls: RefCell<Vec<String>>,
    inputs: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for commands starting with `prefix`
    pub fn respond(self, prefix: &str, outcome: CommandOutcome) -> Self {
        {
            let mut responses = self.responses.borrow_mut();
            match responses.iter_mut().find(|(p, _)| p == prefix) {
                Some((_, queue)) => queue.push_back(outcome),
                None => responses.push((prefix.to_string(), VecDeque::from([outcome]))),
            }
        }
        self
    }

    /// Every command line executed so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Every stdin payload fed so far, in order
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.borrow().clone()
    }

    /// Number of executed command lines starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, spec: &CommandSpec) -> CommandOutcome {
        let line = spec.to_string();
        self.calls.borrow_mut().push(line.clone());
        if let Some(input) = spec.input() {
            self.inputs.borrow_mut().push(input.to_string());
        }

        let mut responses = self.responses.borrow_mut();
        let queue = responses
            .iter_mut()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, queue)| queue);

        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| CommandOutcome::success("")),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| CommandOutcome::success("")),
            None => CommandOutcome::success(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File(String),
    Dir,
    Symlink(PathBuf),
}

/// An in-memory file store
///
/// Symlinks are resolved one level deep, which is all the nginx site
/// handling needs.
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: RefCell<BTreeMap<PathBuf, Entry>>,
    writes: RefCell<usize>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(path.into(), Entry::File(contents.to_string()));
        self
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.entries.borrow_mut().insert(path.into(), Entry::Dir);
        self
    }

    pub fn with_symlink(self, link: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.entries
            .borrow_mut()
            .insert(link.into(), Entry::Symlink(target.into()));
        self
    }

    /// Number of successful [`FileStore::write`] calls
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.read_to_string(path.as_ref()).ok()
    }

    fn resolve(&self, path: &Path) -> Option<Entry> {
        let entries = self.entries.borrow();
        match entries.get(path)? {
            Entry::Symlink(target) => entries.get(target).cloned(),
            other => Some(other.clone()),
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

impl FileStore for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.resolve(path) {
            Some(Entry::File(contents)) => Ok(contents),
            Some(_) => Err(io::Error::new(io::ErrorKind::InvalidInput, "not a file")),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if matches!(self.resolve(path), Some(Entry::Dir)) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory"));
        }
        self.entries
            .borrow_mut()
            .insert(path.to_path_buf(), Entry::File(contents.to_string()));
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.entries.borrow_mut();
        for dir in path.ancestors().filter(|p| !p.as_os_str().is_empty()) {
            entries.entry(dir.to_path_buf()).or_insert(Entry::Dir);
        }
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.resolve(path), Some(Entry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.resolve(path), Some(Entry::Dir))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.entries.borrow().get(path), Some(Entry::Symlink(_)))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.entries.borrow().get(path) {
            Some(Entry::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(io::ErrorKind::InvalidInput, "not a symlink")),
            None => Err(not_found(path)),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(link) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }
        entries.insert(link.to_path_buf(), Entry::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.entries.borrow_mut();
        match entries.get(path) {
            Some(Entry::Dir) => Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory")),
            Some(_) => {
                entries.remove(path);
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }
}

/// A cloneable in-memory writer for capturing trace output
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_responses_are_consumed_then_sticky() {
        let runner = ScriptedRunner::new()
            .respond("probe", CommandOutcome::failure(1, ""))
            .respond("probe", CommandOutcome::success("ok"));

        assert!(!runner.execute(&CommandSpec::new("probe")).success);
        assert!(runner.execute(&CommandSpec::new("probe")).success);
        assert!(runner.execute(&CommandSpec::new("probe")).success);
        assert_eq!(runner.count("probe"), 3);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let runner = ScriptedRunner::new()
            .respond("systemctl", CommandOutcome::success("generic"))
            .respond("systemctl status nginx", CommandOutcome::success("specific"));

        let outcome = runner.execute(&CommandSpec::new("systemctl").args(["status", "nginx"]));
        assert_eq!(outcome.stdout.as_deref(), Some("specific"));
        let outcome = runner.execute(&CommandSpec::new("systemctl").arg("daemon-reload"));
        assert_eq!(outcome.stdout.as_deref(), Some("generic"));
    }

    #[test]
    fn test_unscripted_command_succeeds_silently() {
        let runner = ScriptedRunner::new();
        let outcome = runner.execute(&CommandSpec::new("anything"));
        assert!(outcome.success);
        assert!(outcome.stdout.is_none());
        assert_eq!(runner.calls(), vec!["anything".to_string()]);
    }

    #[test]
    fn test_memory_fs_symlinks() {
        let fs = MemoryFs::new()
            .with_file("/etc/nginx/sites-available/app", "server {}")
            .with_symlink("/etc/nginx/sites-enabled/app", "/etc/nginx/sites-available/app");

        let link = Path::new("/etc/nginx/sites-enabled/app");
        assert!(fs.is_symlink(link));
        assert!(fs.is_file(link));
        assert_eq!(fs.read_to_string(link).unwrap(), "server {}");

        fs.remove_file(link).unwrap();
        assert!(!fs.is_symlink(link));
        assert!(fs.is_file(Path::new("/etc/nginx/sites-available/app")));
    }

    #[test]
    fn test_memory_fs_counts_writes() {
        let fs = MemoryFs::new().with_dir("/etc");
        fs.write(Path::new("/etc/a"), "1").unwrap();
        fs.write(Path::new("/etc/a"), "2").unwrap();
        assert!(fs.write(Path::new("/etc"), "x").is_err());

        assert_eq!(fs.write_count(), 2);
        assert_eq!(fs.contents("/etc/a").as_deref(), Some("2"));
    }

    #[test]
    fn test_shared_buffer() {
        let buffer = SharedBuffer::new();
        let mut writer = buffer.clone();
        writeln!(writer, "hello").unwrap();
        assert_eq!(buffer.contents(), "hello\n");
    }
}
