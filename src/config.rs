//! Server configuration
//!
//! Built once at startup: defaults, then the TOML file (if any), then the
//! command line / environment overrides. The result is validated before any
//! stage runs and passed by reference into the plan.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Main Config Schema
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub database: DatabaseConfig,
    pub users: UsersConfig,
    pub nginx: NginxConfig,
    pub app: AppConfig,
    pub targets: TargetsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    /// Empty means "generate one when the role is created"
    pub password: String,
    pub min_password_length: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "django_db".to_string(),
            user: "django_user".to_string(),
            password: String::new(),
            min_password_length: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsersConfig {
    /// Admin user that logs in over SSH (sudoer, root's authorized keys)
    pub ssh_user: String,
    pub ssh_group: String,
    /// User that owns and runs the app
    pub app_user: String,
    pub app_group: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            ssh_user: "sshuser".to_string(),
            ssh_group: "sshgroup".to_string(),
            app_user: "django".to_string(),
            app_group: "www-data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NginxConfig {
    /// Empty means no `server_name` directive
    pub server_name: String,
    pub available_dir: PathBuf,
    pub enabled_dir: PathBuf,
    pub site_name: String,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            available_dir: PathBuf::from("/etc/nginx/sites-available"),
            enabled_dir: PathBuf::from("/etc/nginx/sites-enabled"),
            site_name: "django-app".to_string(),
        }
    }
}

impl NginxConfig {
    pub fn available_site(&self) -> PathBuf {
        self.available_dir.join(&self.site_name)
    }

    pub fn enabled_site(&self) -> PathBuf {
        self.enabled_dir.join(&self.site_name)
    }
}

/// How the app is served behind nginx
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppServer {
    /// Phusion Passenger nginx module
    #[default]
    Passenger,
    /// Gunicorn systemd service, nginx as reverse proxy
    Gunicorn,
}

impl fmt::Display for AppServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passenger => write!(f, "passenger"),
            Self::Gunicorn => write!(f, "gunicorn"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Django project (Python package) name
    pub project: String,
    /// Defaults to `/home/<app_user>/django-app/current`
    pub dir: Option<PathBuf>,
    pub server: AppServer,
    /// Unit name of the gunicorn service
    pub service_name: String,
    pub socket: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project: "project".to_string(),
            dir: None,
            server: AppServer::default(),
            service_name: "gunicorn".to_string(),
            socket: PathBuf::from("/run/gunicorn.sock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetsConfig {
    /// Must appear in /etc/lsb-release
    pub distribution: String,
    pub python: String,
    pub nodejs: String,
    pub postgres: String,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            distribution: "Ubuntu 18.04".to_string(),
            python: "3.7".to_string(),
            nodejs: "10.11.0".to_string(),
            postgres: "10".to_string(),
        }
    }
}

impl TargetsConfig {
    /// Versioned interpreter, e.g. `python3.7`
    pub fn python_bin(&self) -> String {
        format!("python{}", self.python)
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub server_name: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_group: Option<String>,
    pub app_user: Option<String>,
    pub app_group: Option<String>,
    pub app_server: Option<AppServer>,
}

impl ServerConfig {
    /// Load from a TOML file, or the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            log::debug!("No config file, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        let set = |field: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                field.clone_from(value);
            }
        };
        set(&mut self.database.name, &overrides.db_name);
        set(&mut self.database.user, &overrides.db_user);
        set(&mut self.database.password, &overrides.db_password);
        set(&mut self.nginx.server_name, &overrides.server_name);
        set(&mut self.users.ssh_user, &overrides.ssh_user);
        set(&mut self.users.ssh_group, &overrides.ssh_group);
        set(&mut self.users.app_user, &overrides.app_user);
        set(&mut self.users.app_group, &overrides.app_group);
        if let Some(server) = overrides.app_server {
            self.app.server = server;
        }
    }

    /// Directory holding the Django project
    pub fn app_dir(&self) -> PathBuf {
        self.app
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/home/{}/django-app/current", self.users.app_user)))
    }

    /// Same config with the password hidden, for display
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.database.password.is_empty() {
            masked.database.password = "********".to_string();
        }
        masked
    }

    /// Check every value that ends up in a command line, SQL or a template
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_sql_identifier("database.name", &self.database.name)?;
        check_sql_identifier("database.user", &self.database.user)?;
        if self.database.password.contains('\0') {
            return Err(ConfigError::invalid("database.password", "<hidden>", "contains a NUL byte"));
        }

        check_user_name("users.ssh_user", &self.users.ssh_user)?;
        check_user_name("users.ssh_group", &self.users.ssh_group)?;
        check_user_name("users.app_user", &self.users.app_user)?;
        check_user_name("users.app_group", &self.users.app_group)?;

        check_server_name(&self.nginx.server_name)?;
        check_file_name("nginx.site_name", &self.nginx.site_name)?;
        if self.nginx.site_name == "default" {
            return Err(ConfigError::invalid(
                "nginx.site_name",
                &self.nginx.site_name,
                "the 'default' site is always disabled",
            ));
        }
        check_absolute("nginx.available_dir", &self.nginx.available_dir)?;
        check_absolute("nginx.enabled_dir", &self.nginx.enabled_dir)?;

        check_sql_identifier("app.project", &self.app.project)?;
        check_absolute("app.dir", &self.app_dir())?;
        check_file_name("app.service_name", &self.app.service_name)?;
        check_absolute("app.socket", &self.app.socket)?;

        if self.targets.distribution.trim().is_empty() {
            return Err(ConfigError::invalid("targets.distribution", "", "must not be empty"));
        }
        check_version("targets.python", &self.targets.python)?;
        check_version("targets.nodejs", &self.targets.nodejs)?;
        check_version("targets.postgres", &self.targets.postgres)?;

        Ok(())
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {field} '{value}': {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

/// `^[A-Za-z_][A-Za-z0-9_]*$`, safe unquoted in SQL and as a Python package name
pub fn is_sql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_sql_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if is_sql_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, value, "expected letters, digits and '_', not starting with a digit"))
    }
}

/// Portable Linux user/group name: `^[a-z_][a-z0-9_-]{0,31}$`
fn check_user_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid = value.len() <= 32
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, value, "expected a lowercase user or group name"))
    }
}

/// Space-separated host names, possibly with wildcards; empty is allowed
fn check_server_name(value: &str) -> Result<(), ConfigError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ".-*_ ".contains(c));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid("nginx.server_name", value, "expected host names separated by spaces"))
    }
}

fn check_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-@".contains(c));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, value, "expected a plain file name"))
    }
}

fn check_version(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, value, "expected a dotted version number"))
    }
}

fn check_absolute(field: &'static str, path: &Path) -> Result<(), ConfigError> {
    let display = path.display().to_string();
    let valid = path.is_absolute()
        && display
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-@".contains(c));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, &display, "expected an absolute path without special characters"))
    }
}
