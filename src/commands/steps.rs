use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::stages;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let plan = stages::plan(&ctx.config);
    ui::header(&format!("Stages (app server: {})", ctx.config.app.server));

    if let Some(preflight) = &plan.preflight {
        ui::dim(&format!("{:<14} {} (always runs)", preflight.key, preflight.title));
    }
    for stage in &plan.stages {
        println!("  {} {}", format!("{:<14}", stage.key).bold(), stage.title);
    }
    Ok(())
}
