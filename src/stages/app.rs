//! The Django app and how it is served

use converge::{ApplyContext, ApplyResult, FatalKind, Result};

use crate::config::{AppServer, ServerConfig};
use crate::resource::nginx::require_valid_config;
use crate::resource::{
    Database, DjangoApp, FileContent, NginxSiteDisabled, NginxSiteEnabled, PipPackage, Role, SystemdService,
};
use crate::templates::Artifact;

pub fn database(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let db = &config.database;
    ctx.converge(&Database::new(&db.name))?;
    ctx.converge(&Role {
        user: db.user.clone(),
        password: db.password.clone(),
        database: db.name.clone(),
        min_password_length: db.min_password_length,
    })?;
    Ok(())
}

pub fn packages(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let mut names = vec!["psycopg2-binary", "pipenv"];
    if config.app.server == AppServer::Gunicorn {
        names.push("gunicorn");
    }
    for name in names {
        ctx.converge(&PipPackage::new(name))?;
    }
    Ok(())
}

pub fn django(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let app = DjangoApp {
        dir: config.app_dir(),
        project: config.app.project.clone(),
        python_bin: config.targets.python_bin(),
        owner: config.users.app_user.clone(),
        group: config.users.app_group.clone(),
    };
    if ctx.converge(&app)?.is_change() {
        ctx.note(r"/!\ Beware! This app is in DEBUG mode at the moment.");
    }
    Ok(())
}

/// Converge a rendered artifact, missing templates are a config mistake
fn converge_artifact(ctx: &ApplyContext<'_>, config: &ServerConfig, artifact: Artifact) -> Result<ApplyResult> {
    let Some((path, content)) = artifact.render(config) else {
        return Err(ctx.fatal(
            FatalKind::Precondition,
            format!("No {artifact:?} for app server '{}'", config.app.server),
        ));
    };
    ctx.converge(&FileContent::new(path, content))
}

pub fn web(ctx: &ApplyContext<'_>, config: &ServerConfig) -> Result<()> {
    let mut app_changed = false;
    match config.app.server {
        AppServer::Passenger => ctx.ensuring("Passenger", || {
            app_changed = converge_artifact(ctx, config, Artifact::AppEntry)?.is_change();
            Ok(())
        })?,
        AppServer::Gunicorn => ctx.ensuring("Gunicorn", || {
            let unit_changed = converge_artifact(ctx, config, Artifact::ServiceUnit)?.is_change();
            ctx.converge(&SystemdService::new(&config.app.service_name).restart_if(unit_changed))?;
            Ok(())
        })?,
    }

    ctx.ensuring("Nginx", || {
        let nginx = &config.nginx;
        let site_changed = converge_artifact(ctx, config, Artifact::NginxSite)?.is_change();
        if site_changed {
            require_valid_config(ctx)?;
        }
        let default = ctx.converge(&NginxSiteDisabled::new("default", nginx.enabled_dir.join("default")))?;
        let enabled = ctx.converge(&NginxSiteEnabled::new(
            &nginx.site_name,
            nginx.available_site(),
            nginx.enabled_site(),
        ))?;

        // Passenger runs inside nginx, so a new entry point needs a restart too
        let restart = app_changed || site_changed || default.is_change() || enabled.is_change();
        ctx.converge(&SystemdService::new("nginx").restart_if(restart))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::context;
    use crate::stages::fixtures::{RUNNING, converged_fs, converged_runner};
    use converge::mock::{MemoryFs, ScriptedRunner};
    use converge::{CommandOutcome, FileStore};

    fn gunicorn() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.app.server = AppServer::Gunicorn;
        config
    }

    #[test]
    fn test_gunicorn_only_for_gunicorn() {
        let runner = ScriptedRunner::new().respond(
            "pip list",
            CommandOutcome::success("pipenv==2018.10.13\npsycopg2-binary==2.7.5\n"),
        );
        let fs = MemoryFs::new();
        let (ctx, _) = context(&runner, &fs);

        packages(&ctx, &ServerConfig::default()).unwrap();

        assert_eq!(runner.count("pip install gunicorn"), 0);
        assert_eq!(runner.count("pip list"), 2);
    }

    #[test]
    fn test_database_role_gets_configured_password() {
        let runner = ScriptedRunner::new()
            .respond("sudo -u postgres psql -v ON_ERROR_STOP=1 -tA -c 'select 1 from pg_database", CommandOutcome::success("1\n"))
            .respond("sudo -u postgres psql -v ON_ERROR_STOP=1 -tA -c 'select 1 from pg_roles", CommandOutcome::success(""))
            .respond("sudo -u postgres psql -v ON_ERROR_STOP=1 -tA -c 'select 1 from pg_roles", CommandOutcome::success("1\n"));
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);
        let mut config = ServerConfig::default();
        config.database.password = "correct horse battery".to_string();

        database(&ctx, &config).unwrap();

        assert_eq!(runner.count("sudo -u postgres psql -v ON_ERROR_STOP=1 -tA <<< <redacted>"), 1);
        assert!(!buffer.contents().contains("Generated password"));
        assert_eq!(ctx.summary().changed, 1);
    }

    #[test]
    fn test_app_creation_needs_the_server_address() {
        let runner = converged_runner();
        let config = ServerConfig::default();
        // `hostname -I` prints nothing here
        let fs = MemoryFs::new();
        let (ctx, buffer) = context(&runner, &fs);

        assert!(django(&ctx, &config).is_err());
        assert!(!buffer.contents().contains("DEBUG mode"));
        assert_eq!(runner.count("python3.7 /usr/local/bin/django-admin startproject project"), 1);
    }

    #[test]
    fn test_site_change_restarts_nginx() {
        let config = ServerConfig::default();
        let runner = converged_runner();
        let fs = converged_fs(&config);
        fs.write(&config.nginx.available_site(), "server {}\n").unwrap();
        let (ctx, buffer) = context(&runner, &fs);

        web(&ctx, &config).unwrap();

        assert_eq!(runner.count("nginx -t"), 1);
        assert_eq!(runner.count("systemctl restart nginx"), 1);
        assert!(buffer.contents().contains("Configuration changed, the service must be restarted."));
        assert_eq!(ctx.summary().changed, 2);
    }

    #[test]
    fn test_default_site_is_disabled() {
        let config = ServerConfig::default();
        let runner = converged_runner();
        let fs = converged_fs(&config).with_symlink(
            "/etc/nginx/sites-enabled/default",
            "/etc/nginx/sites-available/default",
        );
        let (ctx, _) = context(&runner, &fs);

        web(&ctx, &config).unwrap();

        assert!(!fs.is_symlink(std::path::Path::new("/etc/nginx/sites-enabled/default")));
        assert_eq!(runner.count("systemctl restart nginx"), 1);
    }

    #[test]
    fn test_new_unit_restarts_gunicorn() {
        let config = gunicorn();
        let runner = ScriptedRunner::new().respond("systemctl status", CommandOutcome::success(RUNNING));
        let fs = converged_fs(&config);
        fs.remove_file(&crate::templates::service_unit_path(&config)).unwrap();
        let (ctx, buffer) = context(&runner, &fs);

        web(&ctx, &config).unwrap();

        assert_eq!(runner.count("systemctl restart gunicorn"), 1);
        assert_eq!(runner.count("systemctl restart nginx"), 0);
        let trace = buffer.contents();
        assert!(trace.starts_with(" ┌ Ensuring Gunicorn setup...\n"));
        assert!(trace.contains(" └ Gunicorn setup ok.\n\n ┌ Ensuring Nginx setup...\n"));
    }
}
