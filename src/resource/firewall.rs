//! Firewall resources (ufw)

use std::fmt;

use converge::{ApplyContext, CommandSpec, Resource, Result};

const ACTIVE_STATUS: &str = "Status: active";

/// Status of a rule as listed by `ufw status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStatus {
    Allow,
    Deny,
    Unknown,
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Deny => write!(f, "DENY"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl RuleStatus {
    /// Parse the first line of `ufw status` output listing `rule`
    ///
    /// The rule name must be followed by whitespace, so "OpenSSH (v6)" lines
    /// never shadow the IPv4 "OpenSSH" line.
    pub fn parse(status: &str, rule: &str) -> Self {
        for line in status.lines() {
            let Some(rest) = line.strip_prefix(rule) else {
                continue;
            };
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let action = rest.trim_start();
            if action.starts_with("ALLOW") {
                return Self::Allow;
            }
            if action.starts_with("DENY") {
                return Self::Deny;
            }
        }
        Self::Unknown
    }
}

fn ufw_status(ctx: &ApplyContext<'_>) -> Option<String> {
    let outcome = ctx.execute(&CommandSpec::new("ufw").arg("status"));
    if outcome.success { outcome.stdout } else { None }
}

/// Traced check of the firewall state
pub fn is_active(ctx: &ApplyContext<'_>) -> bool {
    let step = ctx.step("Checking firewall status...");
    let active = ufw_status(ctx).is_some_and(|s| s.starts_with(ACTIVE_STATUS));
    step.done(&format!("Checked ({}).", if active { "active" } else { "inactive" }));
    active
}

/// Traced check of one rule
pub fn rule_status(ctx: &ApplyContext<'_>, rule: &str) -> RuleStatus {
    let step = ctx.step(format!("Checking firewall rule '{rule}' status..."));
    let status = ufw_status(ctx).map_or(RuleStatus::Unknown, |s| RuleStatus::parse(&s, rule));
    step.done(&format!("Firewall rule checked ({status})."));
    status
}

/// Allow a rule without checking it afterwards
///
/// Rules cannot be listed while ufw is inactive, so this is how SSH access
/// is secured before the firewall is enabled.
pub fn allow_unchecked(ctx: &ApplyContext<'_>, rule: &str) -> Result<()> {
    let step = ctx.step(format!("Allowing firewall rule '{rule}'..."));
    ctx.run(&CommandSpec::new("ufw").args(["allow", rule]))?;
    step.done("Firewall rule allowed.");
    Ok(())
}

/// The firewall is active
#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallEnabled;

impl Resource for FirewallEnabled {
    fn id(&self) -> String {
        "ufw".to_string()
    }

    fn resource_type(&self) -> &'static str {
        "firewall"
    }

    fn description(&self) -> String {
        "Checking firewall is enabled...".to_string()
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        Ok(is_active(ctx))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.run(&CommandSpec::new("ufw").args(["--force", "enable"]))?;
        Ok(())
    }

    fn no_change_message(&self) -> String {
        "Firewall already enabled.".to_string()
    }

    fn applied_message(&self) -> String {
        "Firewall enabled.".to_string()
    }

    fn verify_failure_message(&self) -> String {
        "Couldn't enable the firewall".to_string()
    }
}

/// A ufw rule in the ALLOW state
#[derive(Debug, Clone)]
pub struct FirewallRule {
    pub rule: String,
}

impl FirewallRule {
    pub fn allow(rule: impl Into<String>) -> Self {
        Self { rule: rule.into() }
    }
}

impl Resource for FirewallRule {
    fn id(&self) -> String {
        self.rule.clone()
    }

    fn resource_type(&self) -> &'static str {
        "firewall_rule"
    }

    fn description(&self) -> String {
        format!("Checking firewall rule '{}' is allowed...", self.rule)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        Ok(rule_status(ctx, &self.rule) == RuleStatus::Allow)
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.run(&CommandSpec::new("ufw").args(["allow", &self.rule]))?;
        Ok(())
    }

    fn no_change_message(&self) -> String {
        "Firewall rule already allowed.".to_string()
    }

    fn applied_message(&self) -> String {
        "Firewall rule allowed.".to_string()
    }

    fn verify_failure_message(&self) -> String {
        format!("Couldn't allow the firewall rule '{}'!", self.rule)
    }
}
