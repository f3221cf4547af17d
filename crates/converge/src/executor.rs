//! Execution engine - runs a plan stage by stage
//!
//! Strictly sequential. The first fatal stops the run; its line has already
//! been printed, so the caller only has to turn it into an exit status.

use crate::context::ApplyContext;
use crate::error::Result;
use crate::planner::{ExecutionPlan, Stage};
use crate::types::ExecuteSummary;

/// Execute a plan: the guard and preflight first, then every stage in order
pub fn execute<C>(plan: &ExecutionPlan<C>, ctx: &ApplyContext<'_>, config: &C) -> Result<ExecuteSummary> {
    if let Some(guard) = plan.guard {
        guard(ctx, config)?;
    }
    if let Some(preflight) = &plan.preflight {
        run_stage(preflight, ctx, config)?;
    }

    for stage in &plan.stages {
        run_stage(stage, ctx, config)?;
        ctx.record_stage();
    }

    Ok(ctx.summary())
}

fn run_stage<C>(stage: &Stage<C>, ctx: &ApplyContext<'_>, config: &C) -> Result<()> {
    log::info!("Stage '{}'", stage.key);
    ctx.ensuring(stage.title, || (stage.run)(ctx, config))
}
