mod cli;
mod commands;
mod config;
mod resource;
mod stages;
mod templates;
mod ui;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::ServerConfig;
use converge::{FATAL_EXIT_CODE, Fatal};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Colored trace glyphs (still only when stdout is a terminal)
    pub color: bool,
    pub config: ServerConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // A fatal has already been traced
            if e.downcast_ref::<Fatal>().is_none() {
                ui::fatal(&format!("{e:#}"));
            }
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or_else(|| Command::Apply(cli::ApplyArgs::default()));
    if let Command::Completions { shell } = command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "provision", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        color: !cli.no_color,
        config: load_config(cli.config.as_deref(), cli.overrides.into())?,
    };

    match command {
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Steps => commands::steps::run(&ctx),
        Command::Render { artifact } => commands::render::run(&ctx, artifact.into()),
        Command::Config => commands::config::run(&ctx),
        Command::Completions { .. } => Ok(()),
    }
}

/// Defaults, then the file, then command line and environment; validated
fn load_config(path: Option<&std::path::Path>, overrides: config::Overrides) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(path)?;
    config.apply_overrides(&overrides);
    config.validate()?;
    log::debug!("Configuration loaded (app server: {})", config.app.server);
    Ok(config)
}
