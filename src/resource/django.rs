//! Django app resource - a project exists in the app directory
//!
//! When there is none yet, a blank project is created so the web server has
//! something to serve until the real app is deployed.

use std::path::PathBuf;

use converge::{ApplyContext, CommandSpec, FatalKind, Resource, Result};

use super::PipPackage;

const DJANGO_ADMIN: &str = "/usr/local/bin/django-admin";

#[derive(Debug, Clone)]
pub struct DjangoApp {
    pub dir: PathBuf,
    pub project: String,
    pub python_bin: String,
    pub owner: String,
    pub group: String,
}

impl DjangoApp {
    fn wsgi_module(&self) -> PathBuf {
        self.dir.join(&self.project).join("wsgi.py")
    }

    fn settings(&self) -> PathBuf {
        self.dir.join(&self.project).join("settings.py")
    }

    fn start_project(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.files().create_dir_all(&self.dir).map_err(|e| {
            ctx.fatal(
                FatalKind::Filesystem,
                format!("Cannot create {}: {e}", self.dir.display()),
            )
        })?;
        let dir = self.dir.display().to_string();
        ctx.run(&CommandSpec::new(&self.python_bin).args([DJANGO_ADMIN, "startproject", &self.project, &dir]))?;
        ctx.run(&CommandSpec::new("chown").args(["-R", &format!("{}:{}", self.owner, self.group), &dir]))?;
        Ok(())
    }

    fn allow_server_ip(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        let step = ctx.step("Adding the server IP address to Django's ALLOWED_HOSTS...");
        let outcome = ctx.run(&CommandSpec::new("hostname").arg("-I"))?;
        let Some(ip) = outcome.stdout.as_deref().and_then(first_address) else {
            return Err(ctx.fatal(
                FatalKind::OutputMismatch,
                "Command 'hostname -I' did not print an IP address",
            ));
        };

        let path = self.settings();
        let updated = ctx
            .read_file(&path)
            .and_then(|settings| set_allowed_hosts(&settings, ip));
        let Some(updated) = updated else {
            return Err(ctx.fatal(
                FatalKind::Verification,
                format!("No ALLOWED_HOSTS setting in {}", path.display()),
            ));
        };
        ctx.write_file(&path, &updated)?;
        step.done("Django ALLOWED_HOSTS updated.");
        Ok(())
    }
}

/// First address printed by `hostname -I`, if it looks like an IP address
fn first_address(output: &str) -> Option<&str> {
    output
        .split_whitespace()
        .next()
        .filter(|addr| addr.chars().all(|c| c.is_ascii_hexdigit() || c == '.' || c == ':'))
}

/// Settings with the `ALLOWED_HOSTS = ...` line replaced, `None` when there is
/// no such line
pub fn set_allowed_hosts(settings: &str, host: &str) -> Option<String> {
    let mut found = false;
    let updated = settings
        .split_inclusive('\n')
        .map(|line| {
            if line.starts_with("ALLOWED_HOSTS = ") {
                found = true;
                let eol = if line.ends_with('\n') { "\n" } else { "" };
                format!("ALLOWED_HOSTS = ['{host}']{eol}")
            } else {
                line.to_string()
            }
        })
        .collect();
    found.then_some(updated)
}

impl Resource for DjangoApp {
    fn id(&self) -> String {
        self.project.clone()
    }

    fn resource_type(&self) -> &'static str {
        "django_app"
    }

    fn description(&self) -> String {
        format!(
            "Checking if we have a Django app in the '{}' folder (project '{}')...",
            self.dir.display(),
            self.project
        )
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let files = ctx.files();
        Ok(files.is_dir(&self.dir) && files.is_file(&self.wsgi_module()))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        ctx.wip("Django app not found! Let's create a blank one for the moment.");
        ctx.converge(&PipPackage::new("django"))?;
        self.start_project(ctx)?;
        self.allow_server_ip(ctx)
    }

    fn no_change_message(&self) -> String {
        "Django app found.".to_string()
    }

    fn applied_message(&self) -> String {
        "Blank Django app created.".to_string()
    }
}
