use anyhow::Result;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    if !ctx.quiet {
        ui::dim(&format!("App directory: {}", ctx.config.app_dir().display()));
        println!();
    }
    print!("{}", ctx.config.masked().to_toml()?);
    Ok(())
}
