//! Versioned tool resource - a program whose version output must match

use converge::{ApplyContext, CommandSpec, LinePattern, Resource, Result};

/// A tool installed by a fixed recipe and detected by its version output
#[derive(Debug, Clone)]
pub struct VersionedTool {
    pub label: String,
    pub check: CommandSpec,
    pub pattern: LinePattern,
    pub install: Vec<CommandSpec>,
}

impl VersionedTool {
    pub fn new(label: impl Into<String>, check: CommandSpec, pattern: LinePattern) -> Self {
        Self {
            label: label.into(),
            check,
            pattern,
            install: Vec::new(),
        }
    }

    /// Append one command to the install recipe
    pub fn install_with(mut self, spec: CommandSpec) -> Self {
        self.install.push(spec);
        self
    }
}

/// Download the official Linux x64 tarball and unpack it over `/usr/local`
pub fn nodejs_tarball(version: &str) -> Vec<CommandSpec> {
    let archive = format!("/tmp/node-v{version}-linux-x64.tar.xz");
    let url = format!("https://nodejs.org/dist/v{version}/node-v{version}-linux-x64.tar.xz");
    vec![
        CommandSpec::new("curl").args(["-fsSL", "-o", &archive, &url]),
        CommandSpec::new("tar").args([
            &format!("--file={archive}"),
            "--extract",
            "--xz",
            "--directory",
            "/usr/local",
            "--strip-components=1",
        ]),
    ]
}

/// Bootstrap pip for `python_bin` with the official installer script
pub fn get_pip(python_bin: &str) -> Vec<CommandSpec> {
    let script = "/tmp/get-pip.py";
    vec![
        CommandSpec::new("curl").args(["-fsSL", "-o", script, "https://bootstrap.pypa.io/get-pip.py"]),
        CommandSpec::new(python_bin).arg(script),
    ]
}

impl Resource for VersionedTool {
    fn id(&self) -> String {
        self.label.clone()
    }

    fn resource_type(&self) -> &'static str {
        "tool"
    }

    fn description(&self) -> String {
        format!("Checking {} status...", self.label)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        Ok(ctx.check_output(&self.check, &self.pattern))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.wip(&format!("Installing {}...", self.label));
        for spec in &self.install {
            ctx.run(spec)?;
        }
        Ok(())
    }

    fn no_change_message(&self) -> String {
        format!("{} already installed.", self.label)
    }

    fn applied_message(&self) -> String {
        format!("{} installed.", self.label)
    }

    fn verify_failure_message(&self) -> String {
        format!(
            "Command '{}' output does not match '{}'",
            self.check,
            self.pattern.as_str()
        )
    }
}
