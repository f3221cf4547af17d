//! File store - the local filesystem behind a trait
//!
//! Resources that manage files go through [`FileStore`] so tests can swap
//! in an in-memory store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Provider for filesystem access
pub trait FileStore {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write the whole file, creating or truncating it
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Path is a regular file (symlinks followed)
    fn is_file(&self, path: &Path) -> bool;

    /// Path is a directory (symlinks followed)
    fn is_dir(&self, path: &Path) -> bool;

    /// Path itself is a symlink, dangling or not
    fn is_symlink(&self, path: &Path) -> bool;

    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create `link` pointing at `target`
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileStore for LocalFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are only supported on unix",
        ))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
