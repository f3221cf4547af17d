//! Nginx site resources
//!
//! A site is enabled when `sites-enabled/<name>` is a symlink to
//! `sites-available/<name>`. Every change is followed by an `nginx -t` gate.

use std::path::PathBuf;

use converge::{ApplyContext, CommandSpec, FatalKind, Resource, Result};

/// Traced `nginx -t`
pub fn config_is_valid(ctx: &ApplyContext<'_>) -> bool {
    let step = ctx.step("Checking Nginx config...");
    let ok = ctx.succeeds(&CommandSpec::new("nginx").arg("-t"));
    step.done(&format!("Nginx config checked ({}).", if ok { "ok" } else { "broken" }));
    ok
}

/// `nginx -t` must pass
pub fn require_valid_config(ctx: &ApplyContext<'_>) -> Result<()> {
    if config_is_valid(ctx) {
        return Ok(());
    }
    Err(ctx.fatal(
        FatalKind::Verification,
        "Nginx config is broken! Type `nginx -t` to investigate.",
    ))
}

#[derive(Debug, Clone)]
pub struct NginxSiteEnabled {
    pub name: String,
    pub available: PathBuf,
    pub enabled: PathBuf,
}

impl NginxSiteEnabled {
    pub fn new(name: impl Into<String>, available: impl Into<PathBuf>, enabled: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            available: available.into(),
            enabled: enabled.into(),
        }
    }
}

impl Resource for NginxSiteEnabled {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "nginx_site"
    }

    fn description(&self) -> String {
        format!("Checking nginx enabled symlink '{}'...", self.enabled.display())
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let files = ctx.files();
        let linked = files.is_symlink(&self.enabled)
            && files.read_link(&self.enabled).is_ok_and(|target| target == self.available);
        Ok(linked && files.is_file(&self.available))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        let files = ctx.files();
        let step = ctx.step(format!("Enabling Nginx site '{}'...", self.name));

        let stale = files.is_symlink(&self.enabled) || files.is_file(&self.enabled);
        if stale && let Err(e) = files.remove_file(&self.enabled) {
            return Err(ctx.fatal(
                FatalKind::Filesystem,
                format!("Cannot remove {}: {e}", self.enabled.display()),
            ));
        }
        files.symlink(&self.available, &self.enabled).map_err(|e| {
            ctx.fatal(
                FatalKind::Filesystem,
                format!("Cannot link {}: {e}", self.enabled.display()),
            )
        })?;
        step.done("Nginx site enabled.");

        require_valid_config(ctx)
    }

    fn no_change_message(&self) -> String {
        "Nginx site already enabled.".to_string()
    }

    fn applied_message(&self) -> String {
        "Nginx site enabled.".to_string()
    }
}

/// No symlink for this site in `sites-enabled`
#[derive(Debug, Clone)]
pub struct NginxSiteDisabled {
    pub name: String,
    pub enabled: PathBuf,
}

impl NginxSiteDisabled {
    pub fn new(name: impl Into<String>, enabled: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            enabled: enabled.into(),
        }
    }
}

impl Resource for NginxSiteDisabled {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "nginx_site"
    }

    fn description(&self) -> String {
        format!("Checking Nginx site '{}' is disabled...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        Ok(!ctx.files().is_symlink(&self.enabled))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.files().remove_file(&self.enabled).map_err(|e| {
            ctx.fatal(
                FatalKind::Filesystem,
                format!("Cannot remove {}: {e}", self.enabled.display()),
            )
        })
    }

    fn no_change_message(&self) -> String {
        "Nginx site not enabled.".to_string()
    }

    fn applied_message(&self) -> String {
        "Nginx site disabled.".to_string()
    }
}
