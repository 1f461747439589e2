//! Command surface (spec.md §6, expanded in SPEC_FULL.md §7), matching
//! `libs/test-cli`'s `#[derive(structopt::StructOpt)]` idiom.

#[derive(Debug, structopt::StructOpt)]
#[structopt(name = "migration-cli", about = "Customer-scoped MariaDB/MySQL migration toolkit")]
pub enum Command {
    /// Copy tenant-scoped data from source to destination.
    Migrate(MigrateArgs),
    /// Destructive cleanup on the destination server.
    Cleanup(CleanupCommand),
}

#[derive(Debug, structopt::StructOpt)]
pub struct MigrateArgs {
    /// Print the current checkpoint for the given customer ids and exit.
    #[structopt(long)]
    pub status: bool,

    /// Re-migrate tables already marked `completed`.
    #[structopt(long)]
    pub force: bool,

    /// Comma-separated `DB.TABLE`/`DB.*`/`*.TABLE`/`TABLE` patterns to force-migrate.
    #[structopt(long = "force-tables", use_delimiter = true)]
    pub force_tables: Vec<String>,

    /// Comma-separated customer ids to migrate. Required unless `--status` is set.
    #[structopt(long = "customer-ids", use_delimiter = true)]
    pub customer_ids: Vec<i64>,

    /// Restrict the run to these source databases (default: all non-system databases).
    #[structopt(long, use_delimiter = true)]
    pub databases: Vec<String>,
}

#[derive(Debug, structopt::StructOpt)]
pub enum CleanupCommand {
    /// Drop whole destination databases.
    #[structopt(name = "drop-databases")]
    DropDatabases(DropDatabasesArgs),
    /// Delete rows from destination tables, optionally filtered by customer id.
    #[structopt(name = "delete-rows")]
    DeleteRows(DeleteRowsArgs),
}

#[derive(Debug, structopt::StructOpt)]
pub struct DropDatabasesArgs {
    /// Target every non-system database on the destination.
    #[structopt(long)]
    pub all: bool,

    #[structopt(long, use_delimiter = true)]
    pub databases: Vec<String>,

    /// Show the plan without executing it.
    #[structopt(long = "dry-run")]
    pub dry_run: bool,

    /// Run `mysqldump` per database before dropping it.
    #[structopt(long)]
    pub backup: bool,

    /// Skip the stepped confirmation. Dangerous.
    #[structopt(long = "no-confirm")]
    pub no_confirm: bool,
}

#[derive(Debug, structopt::StructOpt)]
pub struct DeleteRowsArgs {
    #[structopt(long, use_delimiter = true)]
    pub tables: Vec<String>,

    #[structopt(long, use_delimiter = true)]
    pub databases: Vec<String>,

    #[structopt(long = "customer-ids", use_delimiter = true)]
    pub customer_ids: Vec<i64>,

    #[structopt(long = "dry-run")]
    pub dry_run: bool,

    #[structopt(long)]
    pub backup: bool,

    #[structopt(long = "no-confirm")]
    pub no_confirm: bool,
}
