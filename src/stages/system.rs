//! Firewall, users and base software

use converge::{ApplyContext, FatalKind, Result};

use super::require_version;
use crate::config::ServerConfig;
use crate::resource::firewall::{self as ufw, FirewallEnabled, RuleStatus};
use crate::resource::{DebianPackage, LinuxUser};

const SSH_RULE: &str = "OpenSSH";

/// SSH must stay reachable: allow it before the firewall goes up
pub fn firewall(ctx: &ApplyContext<'_>, _: &ServerConfig) -> Result<()> {
    ufw::allow_unchecked(ctx, SSH_RULE)?;
    ctx.converge(&FirewallEnabled)?;

    if ufw::rule_status(ctx, SSH_RULE) != RuleStatus::Allow {
        return Err(ctx.fatal(FatalKind::Verification, "OpenSSH firewall rule is not allowed!"));
    }
    Ok(())
}

pub fn users(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let users = &config.users;
    ctx.converge(&LinuxUser::admin(&users.ssh_user, &users.ssh_group))?;
    ctx.converge(&LinuxUser::new(&users.app_user, &users.app_group))?;
    Ok(())
}

pub fn base(ctx: &ApplyContext<'_>, _: &ServerConfig) -> Result<()> {
    ctx.ensuring("Curl", || {
        ctx.converge(&DebianPackage::new("curl"))?;
        require_version(ctx, "curl", r"curl \d\.\d+(?:.|\n)+https")
    })?;
    ctx.ensuring("git", || {
        ctx.converge(&DebianPackage::new("git"))?;
        require_version(ctx, "git", r"git version 2\.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::context;
    use crate::stages::fixtures::{UFW_ACTIVE, converged_runner};
    use converge::CommandOutcome;
    use converge::mock::{MemoryFs, ScriptedRunner};

    #[test]
    fn test_ssh_is_allowed_before_enabling() {
        let runner = ScriptedRunner::new()
            .respond("ufw status", CommandOutcome::success("Status: inactive\n"))
            .respond("ufw status", CommandOutcome::success(UFW_ACTIVE));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        firewall(&ctx, &ServerConfig::default()).unwrap();

        let calls = runner.calls();
        let allow = calls.iter().position(|c| c == "ufw allow OpenSSH").unwrap();
        let enable = calls.iter().position(|c| c == "ufw --force enable").unwrap();
        assert!(allow < enable);
    }

    #[test]
    fn test_denied_ssh_rule_is_fatal() {
        let denied = UFW_ACTIVE.replacen("ALLOW", "DENY", 1);
        let runner = ScriptedRunner::new().respond("ufw status", CommandOutcome::success(denied));
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        let err = firewall(&ctx, &ServerConfig::default()).unwrap_err();

        assert_eq!(err.kind(), &FatalKind::Verification);
        assert!(buffer.contents().ends_with(
            " └ Firewall rule checked (DENY).\n 💀 OpenSSH firewall rule is not allowed!\n"
        ));
    }

    #[test]
    fn test_users_are_created_from_config() {
        let runner = ScriptedRunner::new()
            .respond("getent passwd admin", CommandOutcome::failure(2, ""))
            .respond("getent passwd admin", CommandOutcome::success("admin:x:1000:1000::/home/admin:/bin/bash\n"))
            .respond("getent passwd django", CommandOutcome::failure(2, ""))
            .respond("getent passwd django", CommandOutcome::success("django:x:1001:33::/home/django:/bin/bash\n"));
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);
        let mut config = ServerConfig::default();
        config.users.ssh_user = "admin".to_string();

        users(&ctx, &config).unwrap();

        assert_eq!(runner.count("useradd -m -s /bin/bash -g sshgroup admin"), 1);
        assert_eq!(runner.count("usermod -aG sudo admin"), 1);
        assert_eq!(runner.count("useradd -m -s /bin/bash -g www-data django"), 1);
        assert_eq!(runner.count("usermod -aG sudo django"), 0);
        assert_eq!(ctx.summary().changed, 2);
    }

    #[test]
    fn test_base_software_is_nested() {
        let runner = converged_runner();
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        base(&ctx, &ServerConfig::default()).unwrap();

        let trace = buffer.contents();
        assert!(trace.starts_with(" ┌ Ensuring Curl setup...\n   ┌ Checking Debian package 'curl'...\n"));
        assert!(trace.ends_with(" └ git setup ok.\n\n"));
    }
}
