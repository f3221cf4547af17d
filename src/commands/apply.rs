use anyhow::{Result, bail};
use converge::{ApplyContext, LocalFs, SystemRunner, Tracer, execute};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::stages;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let plan = stages::plan(&ctx.config);

    let mut unknown = plan.unknown_keys(&args.only);
    unknown.extend(plan.unknown_keys(&args.skip));
    if !unknown.is_empty() {
        bail!(
            "Unknown stage(s): {} ; type `provision steps` to list them.",
            unknown.join(", ")
        );
    }

    let plan = plan.filter_by_keys(&args.only, &args.skip);
    if plan.is_empty() {
        ui::warn("No stage selected, only the preflight checks will run.");
    }
    if ctx.verbose > 0 {
        ui::kv("App server", &ctx.config.app.server.to_string());
        ui::kv("Stages", &plan.keys().join(", "));
        println!();
    }
    log::info!("Applying {} stage(s)", plan.len());

    let tracer = Tracer::stdout();
    let tracer = if ctx.color { tracer } else { tracer.with_color(false) };
    let apply = ApplyContext::new(tracer, &SystemRunner, &LocalFs);
    let summary = execute(&plan, &apply, &ctx.config)?;

    if !ctx.quiet {
        ui::success(&format!(
            "{} stage(s) converged: {} changed, {} already ok.",
            summary.stages, summary.changed, summary.unchanged
        ));
    }
    Ok(())
}
