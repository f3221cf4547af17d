//! Python package resource (pip)

use converge::{ApplyContext, CommandSpec, Resource, Result};

#[derive(Debug, Clone)]
pub struct PipPackage {
    pub name: String,
}

impl PipPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Whether `pip list --format=freeze` output lists this package
    ///
    /// pip treats `-`, `_` and `.` as the same character and ignores case.
    pub fn is_listed(&self, freeze: &str) -> bool {
        let wanted = normalize(&self.name);
        freeze
            .lines()
            .filter_map(|line| line.split_once("==").map(|(name, _)| name))
            .any(|name| normalize(name) == wanted)
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '.' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

impl Resource for PipPackage {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "pip_package"
    }

    fn description(&self) -> String {
        format!("Checking Python package '{}'...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let outcome = ctx.execute(&CommandSpec::new("pip").args(["list", "--format=freeze"]));
        Ok(outcome.success && outcome.stdout.as_deref().is_some_and(|s| self.is_listed(s)))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.run(&CommandSpec::new("pip").args(["install", &self.name]))?;
        Ok(())
    }

    fn no_change_message(&self) -> String {
        "Python package already installed.".to_string()
    }

    fn applied_message(&self) -> String {
        "Installed.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::context;
    use converge::mock::{MemoryFs, ScriptedRunner};
    use converge::{ApplyResult, CommandOutcome};

    const FREEZE: &str = "Django==2.1.2\npipenv==2018.10.13\npsycopg2-binary==2.7.5\npytz==2018.5\n";

    #[test]
    fn test_is_listed() {
        assert!(PipPackage::new("django").is_listed(FREEZE));
        assert!(PipPackage::new("psycopg2_binary").is_listed(FREEZE));
        assert!(!PipPackage::new("psycopg2").is_listed(FREEZE));
        assert!(!PipPackage::new("gunicorn").is_listed(FREEZE));
    }

    #[test]
    fn test_install_missing_package() {
        let runner = ScriptedRunner::new()
            .respond("pip list", CommandOutcome::success(FREEZE))
            .respond("pip list", CommandOutcome::success(format!("{FREEZE}gunicorn==19.9.0\n")));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        assert_eq!(ctx.converge(&PipPackage::new("gunicorn")).unwrap(), ApplyResult::Changed);
        assert_eq!(runner.count("pip install gunicorn"), 1);
    }

    #[test]
    fn test_missing_pip_means_not_installed() {
        let runner = ScriptedRunner::new().respond("pip", CommandOutcome::not_found("pip"));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        assert!(!PipPackage::new("pipenv").is_satisfied(&ctx).unwrap());
    }
}
