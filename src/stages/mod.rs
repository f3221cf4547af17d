//! The provisioning plan
//!
//! Stage bodies converge one area of the server each. The executor wraps
//! every stage in an "Ensuring {title} setup..." step, so bodies only list
//! their resources and checks, in order.

mod app;
mod preflight;
mod runtimes;
mod services;
mod system;

use converge::{ApplyContext, CommandSpec, ExecutionPlan, Result, Stage};

use crate::config::{AppServer, ServerConfig};
use crate::resource::line_pattern;

/// Every stage for `config`, in execution order
pub fn plan(config: &ServerConfig) -> ExecutionPlan<ServerConfig> {
    let plan = ExecutionPlan::new()
        .with_guard(preflight::require_root)
        .with_preflight(Stage::new("preflight", "Linux distribution", preflight::check))
        .stage("firewall", "Firewall", system::firewall)
        .stage("users", "Linux users", system::users)
        .stage("base", "Base software", system::base)
        .stage("python", "Python", runtimes::python)
        .stage("nodejs", "Node.js", runtimes::nodejs)
        .stage("postgres", "Postgres", services::postgres)
        .stage("nginx", "Nginx", services::nginx);

    let plan = match config.app.server {
        AppServer::Passenger => plan.stage("passenger", "Phusion Passenger", services::passenger),
        AppServer::Gunicorn => plan,
    };

    let plan = plan
        .stage("database", "Postgres config for the Django app", app::database)
        .stage("app-packages", "Python packages for our app", app::packages)
        .stage("django", "Django app", app::django);

    match config.app.server {
        AppServer::Passenger => plan.stage("web", "Nginx & Passenger", app::web),
        AppServer::Gunicorn => plan.stage("web", "Nginx & Gunicorn", app::web),
    }
}

/// `<program> --version` must print a line matching `pattern`
fn require_version(ctx: &ApplyContext<'_>, program: &str, pattern: &str) -> Result<()> {
    let pattern = line_pattern(ctx, pattern)?;
    ctx.require_output(&CommandSpec::new(program).arg("--version"), &pattern)
}
