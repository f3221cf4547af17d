use anyhow::{Result, bail};

use crate::Context;
use crate::templates::Artifact;

pub fn run(ctx: &Context, artifact: Artifact) -> Result<()> {
    let Some((path, content)) = artifact.render(&ctx.config) else {
        bail!(
            "No {artifact:?} with app server '{}' ; try `--app-server`.",
            ctx.config.app.server
        );
    };
    // stdout is the file itself, so it can be redirected
    log::info!("Rendering {}", path.display());
    print!("{content}");
    Ok(())
}
