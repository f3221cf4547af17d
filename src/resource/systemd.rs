//! Systemd service resource

use std::cell::Cell;

use converge::{ApplyContext, CommandSpec, Resource, Result};

const RUNNING: &str = "active (running)";

fn systemctl(args: &[&str]) -> CommandSpec {
    CommandSpec::new("systemctl").args(args.iter().copied())
}

/// `systemctl show <unit> --property=<property>`, prints `Property=value`
pub fn show_property(unit: &str, property: &str) -> CommandSpec {
    systemctl(&["show", unit, &format!("--property={property}")])
}

/// A service that is enabled and running
///
/// A service whose configuration just changed is not satisfied until it has
/// been restarted once, even if it is running.
#[derive(Debug, Clone)]
pub struct SystemdService {
    pub name: String,
    restart: Cell<bool>,
}

impl SystemdService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            restart: Cell::new(false),
        }
    }

    /// Force a restart on the next convergence
    pub fn restart_if(self, changed: bool) -> Self {
        self.restart.set(changed);
        self
    }

    fn is_running(&self, ctx: &ApplyContext<'_>) -> bool {
        let step = ctx.step(format!(
            "Checking if Systemd service '{}' is well and truly active...",
            self.name
        ));
        let outcome = ctx.execute(&systemctl(&["status", &self.name]));
        let running = outcome.success && outcome.stdout_contains(RUNNING);
        step.done(&format!(
            "Checking done ({}).",
            if running { "active" } else { "not active" }
        ));
        running
    }

    fn nested(&self, ctx: &ApplyContext<'_>, label: &str, args: &[&str], done: &str) -> Result<()> {
        let step = ctx.step(label);
        ctx.run(&systemctl(args))?;
        step.done(done);
        Ok(())
    }
}

impl Resource for SystemdService {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "systemd_service"
    }

    fn description(&self) -> String {
        format!("Checking Systemd service '{}'...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        if self.restart.get() {
            ctx.wip("Configuration changed, the service must be restarted.");
            return Ok(false);
        }
        Ok(self.is_running(ctx))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        self.nested(ctx, "Reloading Systemd...", &["daemon-reload"], "Systemd reloaded.")?;
        self.nested(ctx, "Restarting Systemd service...", &["restart", &self.name], "Service restarted.")?;
        self.nested(ctx, "Enabling Systemd service...", &["enable", &self.name], "Service enabled.")?;
        self.restart.set(false);
        Ok(())
    }

    fn no_change_message(&self) -> String {
        "Service already active.".to_string()
    }

    fn applied_message(&self) -> String {
        format!("Systemd service '{}' enabled and started.", self.name)
    }

    fn verify_failure_message(&self) -> String {
        format!("Service '{}' is not active.", self.name)
    }
}
