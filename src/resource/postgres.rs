//! Postgres resources - application database and role
//!
//! Statements run as the `postgres` system user through `psql`. Names are
//! validated as plain identifiers before being spliced into SQL. The
//! password only ever appears as an escaped string literal in a script fed
//! on stdin, so it shows up neither in `ps` nor in logged command lines.

use converge::{ApplyContext, CommandSpec, FatalKind, Resource, Result};

use crate::config::is_sql_identifier;

const PSQL: [&str; 6] = ["-u", "postgres", "psql", "-v", "ON_ERROR_STOP=1", "-tA"];

fn psql(sql: &str) -> CommandSpec {
    CommandSpec::new("sudo").args(PSQL).args(["-c", sql])
}

/// A script carrying a secret, read from stdin
fn psql_secret(sql: String) -> CommandSpec {
    CommandSpec::new("sudo").args(PSQL).secret_stdin(sql)
}

/// `'value'` with embedded quotes doubled
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn identifier<'v>(ctx: &ApplyContext<'_>, value: &'v str) -> Result<&'v str> {
    if is_sql_identifier(value) {
        Ok(value)
    } else {
        Err(ctx.fatal(FatalKind::Policy, format!("'{value}' is not a valid SQL identifier")))
    }
}

/// Whether a catalog query returns a row
fn row_exists(ctx: &ApplyContext<'_>, sql: &str) -> bool {
    let outcome = ctx.execute(&psql(sql));
    outcome.success && outcome.stdout.as_deref().is_some_and(|s| s.lines().any(|l| l.trim() == "1"))
}

/// Run statements that must succeed
///
/// `summary` replaces the SQL in the fatal line, so a password never shows
/// up in diagnostics.
fn run_sql(ctx: &ApplyContext<'_>, spec: CommandSpec, summary: &str) -> Result<()> {
    let outcome = ctx.execute(&spec.allow_failure());
    if outcome.success {
        return Ok(());
    }
    let message = format!("SQL '{summary}' failed ({})", outcome.failure_reason());
    Err(ctx.fatal(
        FatalKind::Command {
            command: format!("psql -c <{summary}>"),
            outcome: Box::new(outcome),
        },
        message,
    ))
}

/// A database owned by the `postgres` user
#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Resource for Database {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn resource_type(&self) -> &'static str {
        "postgres_database"
    }

    fn description(&self) -> String {
        format!("Checking database '{}' status...", self.name)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let sql = format!("select 1 from pg_database where datname = {};", quote_literal(&self.name));
        Ok(row_exists(ctx, &sql))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        let name = identifier(ctx, &self.name)?;
        ctx.wip(&format!("Creating database '{name}'..."));
        run_sql(ctx, psql(&format!("create database {name};")), &format!("create database {name}"))
    }

    fn no_change_message(&self) -> String {
        "Database exists.".to_string()
    }

    fn applied_message(&self) -> String {
        "Database created.".to_string()
    }

    fn verify_failure_message(&self) -> String {
        "Could not create database".to_string()
    }
}

/// A login role with all privileges on one database
#[derive(Debug, Clone)]
pub struct Role {
    pub user: String,
    /// Empty means a random one is generated at creation time
    pub password: String,
    pub database: String,
    pub min_password_length: usize,
}

/// 32 hex characters from a v4 UUID (OS random source)
pub fn generate_password() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl Role {
    /// Password to create the role with, generated when none is configured
    fn resolve_password(&self, ctx: &ApplyContext<'_>) -> Result<String> {
        let generated = self.password.is_empty();
        let password = if generated {
            generate_password()
        } else {
            self.password.clone()
        };

        if password.chars().count() < self.min_password_length {
            return Err(ctx.fatal(
                FatalKind::Policy,
                format!(
                    "Postgres user password is too short (minimum length: {})",
                    self.min_password_length
                ),
            ));
        }
        if generated {
            ctx.wip(&format!("Generated password '{password}', it is not stored anywhere: note it now!"));
        }
        Ok(password)
    }

    fn create_sql(user: &str, password: &str, database: &str) -> String {
        format!(
            "begin;
create user {user} with password {password};
alter role {user} set client_encoding to 'utf8';
alter role {user} set default_transaction_isolation to 'read committed';
alter role {user} set timezone to 'UTC';
grant all privileges on database {database} to {user};
commit;
",
            password = quote_literal(password),
        )
    }
}

impl Resource for Role {
    fn id(&self) -> String {
        self.user.clone()
    }

    fn resource_type(&self) -> &'static str {
        "postgres_role"
    }

    fn description(&self) -> String {
        format!("Checking database user '{}' status...", self.user)
    }

    fn is_satisfied(&self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let sql = format!("select 1 from pg_roles where rolname = {};", quote_literal(&self.user));
        Ok(row_exists(ctx, &sql))
    }

    fn apply(&self, ctx: &ApplyContext<'_>) -> Result<()> {
        let user = identifier(ctx, &self.user)?;
        let database = identifier(ctx, &self.database)?;
        let password = self.resolve_password(ctx)?;

        ctx.wip(&format!(
            "Creating user '{user}' with all privileges on database '{database}'..."
        ));
        run_sql(
            ctx,
            psql_secret(Self::create_sql(user, &password, database)),
            &format!("create user {user}"),
        )
    }

    fn no_change_message(&self) -> String {
        "Database user exists.".to_string()
    }

    fn applied_message(&self) -> String {
        "User ok.".to_string()
    }

    fn verify_failure_message(&self) -> String {
        "Could not create user".to_string()
    }
}
