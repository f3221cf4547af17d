use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::config::{AppServer, Overrides};
use crate::templates::Artifact;

#[derive(Parser)]
#[command(name = "provision")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotent provisioning of an Ubuntu server for a Django app", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// TOML configuration file
    #[arg(short, long, env = "PROVISION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Defaults to `apply`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the server: preflight, then every stage in order
    Apply(ApplyArgs),

    /// List the stages of the plan
    Steps,

    /// Print a generated file
    Render {
        #[arg(value_enum)]
        artifact: ArtifactArg,
    },

    /// Show the effective configuration (password masked)
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args, Default)]
pub struct ApplyArgs {
    /// Only run these stages (comma-separated keys, see `steps`)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these stages (comma-separated keys)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
}

// ============================================================================
// Configuration overrides
// ============================================================================

#[derive(Args)]
pub struct OverrideArgs {
    /// Database of the app
    #[arg(long, env = "POSTGRES_DB", global = true)]
    pub db_name: Option<String>,

    /// Database user of the app
    #[arg(long, env = "POSTGRES_USER", global = true)]
    pub db_user: Option<String>,

    /// Database password (generated when empty)
    #[arg(long, env = "POSTGRES_PASSWORD", hide_env_values = true, global = true)]
    pub db_password: Option<String>,

    /// nginx `server_name`
    #[arg(long, env = "NGINX_SERVER_NAME", global = true)]
    pub server_name: Option<String>,

    /// Admin user logging in over SSH
    #[arg(long, env = "LINUX_USER_SSH_USERNAME", global = true)]
    pub ssh_user: Option<String>,

    #[arg(long, env = "LINUX_USER_SSH_GROUPNAME", global = true)]
    pub ssh_group: Option<String>,

    /// User owning and running the app
    #[arg(long, env = "LINUX_USER_DJANGO_USERNAME", global = true)]
    pub app_user: Option<String>,

    #[arg(long, env = "LINUX_USER_DJANGO_GROUPNAME", global = true)]
    pub app_group: Option<String>,

    /// How nginx serves the app
    #[arg(long, value_enum, global = true)]
    pub app_server: Option<AppServerArg>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            db_name: args.db_name,
            db_user: args.db_user,
            db_password: args.db_password,
            server_name: args.server_name,
            ssh_user: args.ssh_user,
            ssh_group: args.ssh_group,
            app_user: args.app_user,
            app_group: args.app_group,
            app_server: args.app_server.map(AppServer::from),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AppServerArg {
    Passenger,
    Gunicorn,
}

impl From<AppServerArg> for AppServer {
    fn from(arg: AppServerArg) -> Self {
        match arg {
            AppServerArg::Passenger => Self::Passenger,
            AppServerArg::Gunicorn => Self::Gunicorn,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ArtifactArg {
    /// nginx site definition
    NginxSite,
    /// Passenger WSGI entry point
    AppEntry,
    /// gunicorn systemd unit
    ServiceUnit,
}

impl From<ArtifactArg> for Artifact {
    fn from(arg: ArtifactArg) -> Self {
        match arg {
            ArtifactArg::NginxSite => Self::NginxSite,
            ArtifactArg::AppEntry => Self::AppEntry,
            ArtifactArg::ServiceUnit => Self::ServiceUnit,
        }
    }
}
