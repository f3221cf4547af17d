//! Database and web servers

use converge::{ApplyContext, CommandSpec, Result};

use super::require_version;
use crate::config::ServerConfig;
use crate::resource::apt::{AptRepository, KeySource};
use crate::resource::systemd::show_property;
use crate::resource::{DebianPackage, FirewallRule, line_pattern};

pub fn postgres(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let version = &config.targets.postgres;
    ctx.converge(&DebianPackage::new(format!("postgresql-{version}")))?;
    ctx.converge(&DebianPackage::new(format!("postgresql-client-{version}")))?;

    let version = regex::escape(version);
    let cluster = line_pattern(ctx, &format!(r"ConsistsOf=postgresql@{version}-main\.service"))?;
    ctx.require_output(&show_property("postgresql", "ConsistsOf"), &cluster)?;
    require_version(ctx, "psql", &format!(r"psql \(PostgreSQL\) {version}"))
}

pub fn nginx(ctx: &ApplyContext<'_>, _: &ServerConfig) -> Result<()> {
    ctx.converge(&DebianPackage::new("nginx"))?;
    let binary = line_pattern(ctx, r".+/usr/sbin/nginx")?;
    ctx.require_output(&show_property("nginx", "ExecStart"), &binary)?;
    ctx.converge(&FirewallRule::allow("Nginx Full"))?;
    Ok(())
}

fn passenger_repository() -> AptRepository {
    AptRepository {
        label: "Passenger".to_string(),
        key: KeySource::Keyserver {
            server: "keyserver.ubuntu.com:80".to_string(),
            id: "561F9B9CAC40B2F7".to_string(),
        },
        key_name: "Phusion Automated Software Signing".to_string(),
        source_line: "deb https://oss-binaries.phusionpassenger.com/apt/passenger bionic main".to_string(),
    }
}

pub fn passenger(ctx: &ApplyContext<'_>, _: &ServerConfig) -> Result<()> {
    ctx.converge(&passenger_repository())?;
    ctx.converge(&DebianPackage::new("libnginx-mod-http-passenger"))?;

    let validate = CommandSpec::new("/usr/bin/passenger-config").args(["validate-install", "--auto"]);
    ctx.require_output(&validate, &line_pattern(ctx, "Everything looks good")?)
}
