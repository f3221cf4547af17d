//! Generated artifacts
//!
//! Fixed templates filled from validated configuration values. Each file is
//! compared byte for byte with what is on disk before being rewritten, so the
//! output must be deterministic.

use std::path::PathBuf;

use crate::config::{AppServer, ServerConfig};

/// A file the plan writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// nginx site definition
    NginxSite,
    /// Passenger WSGI entry point
    AppEntry,
    /// gunicorn systemd unit
    ServiceUnit,
}

impl Artifact {
    /// Where the artifact lives and what it contains, `None` when the
    /// configured app server does not use it
    pub fn render(self, config: &ServerConfig) -> Option<(PathBuf, String)> {
        match (self, config.app.server) {
            (Self::NginxSite, _) => Some((config.nginx.available_site(), nginx_site(config))),
            (Self::AppEntry, AppServer::Passenger) => {
                Some((config.app_dir().join("passenger_wsgi.py"), passenger_wsgi(config)))
            }
            (Self::ServiceUnit, AppServer::Gunicorn) => Some((service_unit_path(config), gunicorn_unit(config))),
            _ => None,
        }
    }
}

pub fn service_unit_path(config: &ServerConfig) -> PathBuf {
    PathBuf::from(format!("/etc/systemd/system/{}.service", config.app.service_name))
}

/// nginx site for the configured app server
pub fn nginx_site(config: &ServerConfig) -> String {
    match config.app.server {
        AppServer::Passenger => nginx_passenger_site(config),
        AppServer::Gunicorn => nginx_proxy_site(config),
    }
}

fn server_name_line(config: &ServerConfig) -> String {
    let name = config.nginx.server_name.trim();
    if name.is_empty() {
        String::new()
    } else {
        format!("    server_name {name};\n")
    }
}

fn nginx_passenger_site(config: &ServerConfig) -> String {
    format!(
        "# {available}

server {{
{server_name}    listen 80;

    location = /favicon.ico {{ access_log off; log_not_found off; }}

    location / {{
        passenger_enabled on;
        passenger_app_type wsgi;

        passenger_python /usr/bin/{python};
        root {app_dir}/static;
    }}
}}
",
        available = config.nginx.available_site().display(),
        server_name = server_name_line(config),
        python = config.targets.python_bin(),
        app_dir = config.app_dir().display(),
    )
}

fn nginx_proxy_site(config: &ServerConfig) -> String {
    format!(
        "# {available}

server {{
{server_name}    listen 80;

    location = /favicon.ico {{ access_log off; log_not_found off; }}

    location /static/ {{
        root {app_dir};
    }}

    location / {{
        include proxy_params;
        proxy_pass http://unix:{socket};
    }}
}}
",
        available = config.nginx.available_site().display(),
        server_name = server_name_line(config),
        app_dir = config.app_dir().display(),
        socket = config.app.socket.display(),
    )
}

/// Entry point Passenger loads from the app directory
pub fn passenger_wsgi(config: &ServerConfig) -> String {
    format!(
        "import {project}.wsgi

application = {project}.wsgi.application
",
        project = config.app.project
    )
}

pub fn gunicorn_unit(config: &ServerConfig) -> String {
    format!(
        "[Unit]
Description=gunicorn daemon for {project}
After=network.target

[Service]
User={user}
Group={group}
WorkingDirectory={app_dir}
ExecStart=/usr/local/bin/gunicorn --access-logfile - --workers 3 --bind unix:{socket} {project}.wsgi:application

[Install]
WantedBy=multi-user.target
",
        project = config.app.project,
        user = config.users.app_user,
        group = config.users.app_group,
        app_dir = config.app_dir().display(),
        socket = config.app.socket.display(),
    )
}
