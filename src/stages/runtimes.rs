//! Python and Node.js toolchains

use converge::{ApplyContext, CommandSpec, Result};

use super::require_version;
use crate::config::ServerConfig;
use crate::resource::apt::{AptRepository, KeySource};
use crate::resource::tool::{self, VersionedTool};
use crate::resource::{DebianPackage, Ppa, line_pattern};

pub fn python(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let python = config.targets.python_bin();
    let version = regex::escape(&config.targets.python);

    ctx.converge(&Ppa::new("deadsnakes"))?;
    ctx.converge(&DebianPackage::new(&python))?;
    require_version(ctx, &python, &format!("Python {version}"))?;

    // pip must run on the target interpreter, not the system one
    let pip = VersionedTool::new(
        "pip",
        CommandSpec::new("pip").arg("--version"),
        line_pattern(ctx, &format!("pip .+python{version}"))?,
    );
    let pip = tool::get_pip(&python)
        .into_iter()
        .fold(pip, VersionedTool::install_with);
    ctx.converge(&pip)?;
    Ok(())
}

fn yarn_repository() -> AptRepository {
    AptRepository {
        label: "Yarn".to_string(),
        key: KeySource::Url("https://dl.yarnpkg.com/debian/pubkey.gpg".to_string()),
        key_name: "Yarn Packaging".to_string(),
        source_line: "deb https://dl.yarnpkg.com/debian/ stable main".to_string(),
    }
}

pub fn nodejs(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let version = &config.targets.nodejs;
    let node = VersionedTool::new(
        format!("Node.js 'v{version}'"),
        CommandSpec::new("node").arg("--version"),
        line_pattern(ctx, &format!("v{}", regex::escape(version)))?,
    );
    let node = tool::nodejs_tarball(version)
        .into_iter()
        .fold(node, VersionedTool::install_with);
    ctx.converge(&node)?;

    ctx.converge(&yarn_repository())?;
    ctx.converge(&DebianPackage::new("yarn"))?;
    require_version(ctx, "yarn", r"\d+\.\d")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::context;
    use converge::CommandOutcome;
    use converge::mock::{MemoryFs, ScriptedRunner};

    #[test]
    fn test_pip_for_another_interpreter_is_reinstalled() {
        let runner = ScriptedRunner::new()
            .respond("grep -rlF", CommandOutcome::success("/etc/apt/sources.list.d/deadsnakes.list\n"))
            .respond("dpkg -s", CommandOutcome::success("Status: install ok installed\n"))
            .respond("python3.7 --version", CommandOutcome::success("Python 3.7.1\n"))
            .respond(
                "pip --version",
                CommandOutcome::success("pip 9.0.1 from /usr/lib/python3/dist-packages (python 3.6)\n"),
            )
            .respond(
                "pip --version",
                CommandOutcome::success("pip 18.1 from /usr/local/lib/python3.7/dist-packages/pip (python 3.7)\n"),
            );
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        python(&ctx, &ServerConfig::default()).unwrap();

        assert_eq!(runner.count("python3.7 /tmp/get-pip.py"), 1);
    }

    #[test]
    fn test_node_version_follows_config() {
        let runner = ScriptedRunner::new()
            .respond("node --version", CommandOutcome::success("v10.11.0\n"))
            .respond("node --version", CommandOutcome::success("v12.0.0\n"))
            .respond("apt-key list", CommandOutcome::success("uid Yarn Packaging <yarn@dan.cx>\n"))
            .respond("dpkg -s yarn", CommandOutcome::success("Status: install ok installed\n"))
            .respond("yarn --version", CommandOutcome::success("1.10.1\n"));
        let fs = MemoryFs::new().with_file(
            "/etc/apt/sources.list.d/yarn.list",
            "deb https://dl.yarnpkg.com/debian/ stable main\n",
        );
        let (ctx, _) = context(&runner, &fs);
        let mut config = ServerConfig::default();
        config.targets.nodejs = "12.0.0".to_string();

        nodejs(&ctx, &config).unwrap();

        assert_eq!(
            runner.count("curl -fsSL -o /tmp/node-v12.0.0-linux-x64.tar.xz https://nodejs.org/dist/v12.0.0/"),
            1
        );
        assert_eq!(ctx.summary().changed, 1);
    }

    #[test]
    fn test_version_dots_are_literal() {
        // "v10x11y0" must not satisfy a 10.11.0 target
        let runner = ScriptedRunner::new().respond("node --version", CommandOutcome::success("v10x11y0\n"));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        let err = nodejs(&ctx, &ServerConfig::default()).unwrap_err();

        assert_eq!(err.message(), r"Command 'node --version' output does not match 'v10\.11\.0'");
    }
}
