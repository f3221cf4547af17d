//! File content resource - a file with exactly the expected bytes

use std::path::{Path, PathBuf};

use converge::{ApplyContext, FatalKind, Resource, Result};

#[derive(Debug, Clone)]
pub struct FileContent {
    pub path: PathBuf,
    pub content: String,
}

impl FileContent {
    pub fn new(path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            content: content.into(),
        }
    }
}

impl Resource for FileContent {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn resource_type(&self) -> &'static str {
        "file"
    }

    fn description(&self) -> String {
        format!("Checking file '{}'...", self.path.display())
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        Ok(ctx.read_file(&self.path).is_some_and(|current| current == self.content))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.wip("Content differs or file is missing, writing it.");
        if let Some(parent) = self.path.parent() {
            ctx.files().create_dir_all(parent).map_err(|e| {
                ctx.fatal(
                    FatalKind::Filesystem,
                    format!("Cannot create {}: {e}", parent.display()),
                )
            })?;
        }
        ctx.write_file(&self.path, &self.content)
    }

    fn no_change_message(&self) -> String {
        "File already has the expected content.".to_string()
    }

    fn applied_message(&self) -> String {
        "File written.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::context;
    use converge::{ApplyResult, FileStore};
    use converge::mock::{MemoryFs, ScriptedRunner};

    #[test]
    fn test_identical_content_is_not_rewritten() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new().with_file("/etc/nginx/sites-available/app", "server {}\n");
        let (ctx, buffer) = context(&runner, &fs);

        let result = ctx
            .converge(&FileContent::new("/etc/nginx/sites-available/app", "server {}\n"))
            .unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(fs.write_count(), 0);
        assert!(buffer.contents().contains("└ File already has the expected content. ✓"));
    }

    #[test]
    fn test_different_content_is_rewritten_once() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new().with_file("/srv/app/passenger_wsgi.py", "old\n");
        let (ctx, _) = context(&runner, &fs);
        let file = FileContent::new("/srv/app/passenger_wsgi.py", "new\n");

        assert_eq!(ctx.converge(&file).unwrap(), ApplyResult::Changed);
        assert_eq!(ctx.converge(&file).unwrap(), ApplyResult::NoChange);
        assert_eq!(fs.write_count(), 1);
        assert_eq!(fs.contents("/srv/app/passenger_wsgi.py").as_deref(), Some("new\n"));
    }

    #[test]
    fn test_missing_file_and_parent_are_created() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        let result = ctx
            .converge(&FileContent::new("/etc/apt/sources.list.d/yarn.list", "deb x\n"))
            .unwrap();

        assert_eq!(result, ApplyResult::Changed);
        assert!(fs.is_dir(Path::new("/etc/apt/sources.list.d")));
    }

    #[test]
    fn test_byte_exact_comparison() {
        let runner = ScriptedRunner::new();
        let fs = MemoryFs::new().with_file("/etc/app.conf", "x = 1");
        let (ctx, _) = context(&runner, &fs);

        // A trailing newline is a difference
        let result = ctx.converge(&FileContent::new("/etc/app.conf", "x = 1\n")).unwrap();
        assert_eq!(result, ApplyResult::Changed);
    }
}
