//! Linux user resource

use converge::{ApplyContext, CommandSpec, Resource, Result};

/// A local user account with its primary group
#[derive(Debug, Clone)]
pub struct LinuxUser {
    pub name: String,
    pub group: String,
    pub shell: String,
    /// Member of the `sudo` group
    pub sudoer: bool,
    /// Gets a copy of root's `~/.ssh/authorized_keys`
    pub root_ssh_keys: bool,
}

impl LinuxUser {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            shell: "/bin/bash".to_string(),
            sudoer: false,
            root_ssh_keys: false,
        }
    }

    /// Admin account: sudoer that logs in with root's SSH keys
    pub fn admin(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            sudoer: true,
            root_ssh_keys: true,
            ..Self::new(name, group)
        }
    }

    fn owner(&self) -> String {
        format!("{}:{}", self.name, self.group)
    }

    fn copy_root_ssh_keys(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        let step = ctx.step("Giving this user the same '~/.ssh/authorized_keys' as the root user...");
        let ssh_dir = format!("/home/{}/.ssh", self.name);
        ctx.run(&CommandSpec::new("install").args([
            "-d", "-m", "700", "-o", &self.name, "-g", &self.group, &ssh_dir,
        ]))?;
        ctx.run(&CommandSpec::new("install").args([
            "-m",
            "600",
            "-o",
            &self.name,
            "-g",
            &self.group,
            "/root/.ssh/authorized_keys",
            &format!("{ssh_dir}/authorized_keys"),
        ]))?;
        step.done("'Authorized keys' copied from root user.");
        Ok(())
    }
}

impl Resource for LinuxUser {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "linux_user"
    }

    fn description(&self) -> String {
        format!("Checking user '{}'...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let outcome = ctx.execute(&CommandSpec::new("getent").args(["passwd", &self.name]));
        Ok(outcome.success && outcome.stdout_starts_with(&format!("{}:", self.name)))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.wip(&format!(
            "Creating Linux user '{}', with shell '{}'...",
            self.owner(),
            self.shell
        ));
        ctx.run(&CommandSpec::new("groupadd").args(["-f", &self.group]))?;
        ctx.run(&CommandSpec::new("useradd").args([
            "-m", "-s", &self.shell, "-g", &self.group, &self.name,
        ]))?;

        if self.sudoer {
            let step = ctx.step("Adding the user to the 'sudo' group...");
            ctx.run(&CommandSpec::new("usermod").args(["-aG", "sudo", &self.name]))?;
            step.done("Added.");
        }
        if self.root_ssh_keys {
            self.copy_root_ssh_keys(ctx)?;
        }
        Ok(())
    }

    fn no_change_message(&self) -> String {
        "User already exists.".to_string()
    }

    fn applied_message(&self) -> String {
        "User created.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::context;
    use converge::mock::{MemoryFs, ScriptedRunner};
    use converge::{ApplyResult, CommandOutcome};

    #[test]
    fn test_existing_user() {
        let runner = ScriptedRunner::new().respond(
            "getent passwd django",
            CommandOutcome::success("django:x:1001:33::/home/django:/bin/bash\n"),
        );
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        let result = ctx.converge(&LinuxUser::new("django", "www-data")).unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(runner.count("useradd"), 0);
    }

    #[test]
    fn test_prefix_of_another_user_does_not_count() {
        let runner = ScriptedRunner::new().respond(
            "getent passwd django",
            CommandOutcome::success("djangoadmin:x:1002:1002::/home/djangoadmin:/bin/sh\n"),
        );
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        assert!(!LinuxUser::new("django", "www-data").is_satisfied(&ctx).unwrap());
    }

    #[test]
    fn test_admin_user_is_created_with_keys() {
        let runner = ScriptedRunner::new()
            .respond("getent passwd sshuser", CommandOutcome::failure(2, ""))
            .respond(
                "getent passwd sshuser",
                CommandOutcome::success("sshuser:x:1000:1000::/home/sshuser:/bin/bash\n"),
            );
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        let result = ctx.converge(&LinuxUser::admin("sshuser", "sshgroup")).unwrap();

        assert_eq!(result, ApplyResult::Changed);
        let calls = runner.calls();
        let mutations: Vec<&str> = calls
            .iter()
            .map(String::as_str)
            .filter(|c| !c.starts_with("getent"))
            .collect();
        assert_eq!(
            mutations,
            vec![
                "groupadd -f sshgroup",
                "useradd -m -s /bin/bash -g sshgroup sshuser",
                "usermod -aG sudo sshuser",
                "install -d -m 700 -o sshuser -g sshgroup /home/sshuser/.ssh",
                "install -m 600 -o sshuser -g sshgroup /root/.ssh/authorized_keys /home/sshuser/.ssh/authorized_keys",
            ]
        );
        assert!(buffer.contents().contains("│ Creating Linux user 'sshuser:sshgroup', with shell '/bin/bash'..."));
    }
}
