//! APT resources - Debian packages, PPAs and third-party repositories

use std::path::PathBuf;

use converge::{ApplyContext, CommandSpec, Resource, Result};

use super::FileContent;

const INSTALLED_STATUS: &str = "Status: install ok installed";

fn apt(args: &[&str]) -> CommandSpec {
    CommandSpec::new("apt")
        .args(args.iter().copied())
        .env("DEBIAN_FRONTEND", "noninteractive")
}

/// Refresh the package lists
pub fn apt_update(ctx: &ApplyContext<'_>) -> Result<()> {
    let step = ctx.step("Updating APT repositories...");
    ctx.run(&apt(&["update"]))?;
    step.done("Updated.");
    Ok(())
}

/// A Debian package that must be installed
#[derive(Debug, Clone)]
pub struct DebianPackage {
    pub name: String,
}

impl DebianPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Resource for DebianPackage {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "debian_package"
    }

    fn description(&self) -> String {
        format!("Checking Debian package '{}'...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let outcome = ctx.execute(&CommandSpec::new("dpkg").args(["-s", &self.name]));
        Ok(outcome.success && outcome.stdout_contains(INSTALLED_STATUS))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.wip(&format!("Installing '{}'...", self.name));
        ctx.run(&apt(&["install", "-y", &self.name]))?;
        Ok(())
    }

    fn no_change_message(&self) -> String {
        "Debian package already installed.".to_string()
    }

    fn applied_message(&self) -> String {
        "Installed.".to_string()
    }
}

/// A Launchpad PPA registered as an APT source
#[derive(Debug, Clone)]
pub struct Ppa {
    pub name: String,
}

impl Ppa {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn source_line(&self) -> String {
        format!("deb http://ppa.launchpad.net/{}/ppa/ubuntu", self.name)
    }
}

impl Resource for Ppa {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "ppa"
    }

    fn description(&self) -> String {
        format!("Checking PPA '{}'...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        // grep exits 1 when nothing matches; only the listing matters
        let outcome = ctx.execute(&CommandSpec::new("grep").args(["-rlF", &self.source_line(), "/etc/apt/"]));
        Ok(outcome.has_stdout())
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.run(&CommandSpec::new("add-apt-repository").args(["-y", &format!("ppa:{}/ppa", self.name)]))?;
        apt_update(ctx)
    }

    fn no_change_message(&self) -> String {
        "PPA already installed.".to_string()
    }

    fn applied_message(&self) -> String {
        "PPA added.".to_string()
    }
}

/// Where the signing key of a repository comes from
#[derive(Debug, Clone)]
pub enum KeySource {
    Keyserver { server: String, id: String },
    /// Armored key downloaded over HTTPS
    Url(String),
}

/// A third-party APT repository: signing key plus sources list file
#[derive(Debug, Clone)]
pub struct AptRepository {
    /// Also names the sources list file
    pub label: String,
    pub key: KeySource,
    /// Text `apt-key list` shows once the key is trusted
    pub key_name: String,
    pub source_line: String,
}

impl AptRepository {
    pub fn sources_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "/etc/apt/sources.list.d/{}.list",
            self.label.to_lowercase()
        ))
    }

    fn sources_file(&self) -> FileContent {
        FileContent::new(self.sources_path(), format!("{}\n", self.source_line))
    }

    fn key_is_trusted(&self, ctx: &ApplyContext<'_>) -> bool {
        let outcome = ctx.execute(
            &CommandSpec::new("apt-key")
                .arg("list")
                .env("APT_KEY_DONT_WARN_ON_DANGEROUS_USAGE", "1"),
        );
        outcome.success && outcome.stdout_contains(&self.key_name)
    }

    fn add_key(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        let step = ctx.step(format!("Adding signing key of '{}'...", self.label));
        let spec = match &self.key {
            KeySource::Keyserver { server, id } => CommandSpec::new("apt-key").args([
                "adv",
                "--keyserver",
                &format!("hkp://{server}"),
                "--recv-keys",
                id,
            ]),
            KeySource::Url(url) => CommandSpec::new("sh")
                .args(["-c", r#"curl -fsSL "$1" | apt-key add -"#, "sh", url]),
        };
        ctx.run(&spec.env("APT_KEY_DONT_WARN_ON_DANGEROUS_USAGE", "1"))?;
        step.done("Key added.");
        Ok(())
    }
}

impl Resource for AptRepository {
    fn id(&self) -> String {
        self.label.clone()
    }

    fn resource_type(&self) -> &'static str {
        "apt_repository"
    }

    fn description(&self) -> String {
        format!("Checking APT repository '{}'...", self.label)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        Ok(self.key_is_trusted(ctx) && self.sources_file().is_satisfied(ctx)?)
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        if !self.key_is_trusted(ctx) {
            self.add_key(ctx)?;
        }
        ctx.converge(&self.sources_file())?;
        apt_update(ctx)
    }

    fn no_change_message(&self) -> String {
        "APT repository already installed.".to_string()
    }

    fn applied_message(&self) -> String {
        "APT repository added.".to_string()
    }
}
