//! Checks that run before anything is changed

use std::path::Path;

use converge::{ApplyContext, CommandSpec, FatalKind, Result};

use crate::config::ServerConfig;

const LSB_RELEASE: &str = "/etc/lsb-release";

/// Refuse to run as anyone but root, before any step is opened
pub fn require_root(ctx: &ApplyContext<'_>, _: &ServerConfig) -> Result<()> {
    let uid = ctx.execute(&CommandSpec::new("id").arg("-u"));
    if uid.stdout.as_deref().map(str::trim) != Some("0") {
        return Err(ctx.fatal(FatalKind::Precondition, "provision must be run as 'root'"));
    }
    Ok(())
}

pub fn check(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let target = &config.targets.distribution;
    let matches = ctx
        .read_file(Path::new(LSB_RELEASE))
        .is_some_and(|release| is_distribution(&release, target));
    if !matches {
        return Err(ctx.fatal(
            FatalKind::Precondition,
            format!("This only works for {target}; type `cat {LSB_RELEASE}` to check yours."),
        ));
    }
    Ok(())
}

/// The `DISTRIB_DESCRIPTION` line mentions `target`
fn is_distribution(release: &str, target: &str) -> bool {
    release
        .lines()
        .any(|line| line.starts_with("DISTRIB_DESCRIPTION") && line.contains(target))
}
