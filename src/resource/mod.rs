//! Concrete resources for an Ubuntu web server
//!
//! Every check-and-fix task of the plan is a [`converge::Resource`]:
//! - Detection through the command runner or the file store, never mutating
//! - Mutation through argv commands, so configuration values are never
//!   interpreted by a shell

use converge::{ApplyContext, FatalKind, LinePattern, Result};

pub mod apt;
pub mod django;
pub mod file;
pub mod firewall;
pub mod nginx;
pub mod pip;
pub mod postgres;
pub mod systemd;
pub mod tool;
pub mod user;

pub use apt::{DebianPackage, Ppa};
pub use django::DjangoApp;
pub use file::FileContent;
pub use firewall::FirewallRule;
pub use nginx::{NginxSiteDisabled, NginxSiteEnabled};
pub use pip::PipPackage;
pub use postgres::{Database, Role};
pub use systemd::SystemdService;
pub use user::LinuxUser;

/// Compile a line pattern, an invalid one aborts the run
pub fn line_pattern(ctx: &ApplyContext<'_>, pattern: &str) -> Result<LinePattern> {
    LinePattern::new(pattern).map_err(|e| {
        ctx.fatal(
            FatalKind::Precondition,
            format!("Invalid output pattern '{pattern}': {e}"),
        )
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use converge::mock::{MemoryFs, ScriptedRunner, SharedBuffer};
    use converge::{ApplyContext, Tracer};

    /// Context over scripted collaborators, plus the trace buffer
    pub fn context<'a>(runner: &'a ScriptedRunner, fs: &'a MemoryFs) -> (ApplyContext<'a>, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (ApplyContext::new(Tracer::new(buffer.clone()), runner, fs), buffer)
    }
}
