//! Entry point: parse the command line, load `Config` from the
//! environment, and dispatch to `migration-core`'s orchestrator or
//! `sql-migration-connector`'s destructive ops. Mirrors `libs/test-cli`'s
//! `main.rs` shape (structopt + tracing-subscriber + anyhow at the top).

mod cli;
mod config_env;
mod reporter_term;

use cli::{CleanupCommand, Command, DeleteRowsArgs, DropDatabasesArgs, MigrateArgs};
use colored::*;
use reporter_term::TermReporter;
use sql_migration_connector::destructive::{self, DELETE_CONFIRMATION_LITERAL, DROP_CONFIRMATION_LITERAL};
use sql_migration_connector::introspection::Introspector;
use std::collections::HashMap;
use std::path::PathBuf;
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> anyhow::Result<i32> {
    let command = Command::from_args();
    let config = config_env::load()?;
    let reporter = TermReporter;

    match command {
        Command::Migrate(args) => run_migrate(args, config, &reporter).await,
        Command::Cleanup(CleanupCommand::DropDatabases(args)) => run_drop_databases(args, config, &reporter).await,
        Command::Cleanup(CleanupCommand::DeleteRows(args)) => run_delete_rows(args, config, &reporter).await,
    }
}

async fn run_migrate(args: MigrateArgs, config: migration_connector::config::Config, reporter: &TermReporter) -> anyhow::Result<i32> {
    let customer_ids = if args.customer_ids.is_empty() {
        prompt_customer_ids()?
    } else {
        args.customer_ids.clone()
    };

    if args.status {
        return print_status(&customer_ids, &config).await;
    }

    let force_tables: Vec<_> = migration_connector::patterns::parse_force_pattern_list(&args.force_tables.join(","));
    let mut merged_config = config;
    merged_config.force_migrate_tables.extend(force_tables);

    let orchestrator = migration_core::Orchestrator::new(&merged_config, reporter);
    let databases_filter = if args.databases.is_empty() { None } else { Some(args.databases.as_slice()) };

    let run_future = orchestrator.run(&customer_ids, databases_filter, args.force);

    tokio::select! {
        result = run_future => {
            let summary = result?;
            if summary.tables_failed > 0 {
                Ok(1)
            } else {
                Ok(0)
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{}", "interrupted, checkpoint already flushed after the last completed table".yellow());
            Ok(1)
        }
    }
}

/// Interactive fallback when `--customer-ids` is omitted (spec.md §6).
fn prompt_customer_ids() -> anyhow::Result<Vec<i64>> {
    eprint!("customer ids (comma-separated): ");
    use std::io::Write;
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    config_env::parse_id_list(line.trim()).map_err(anyhow::Error::from)
}

async fn print_status(customer_ids: &[i64], config: &migration_connector::config::Config) -> anyhow::Result<i32> {
    let state_store = migration_core::StateStore::new(config.state_dir.clone());
    let state = state_store.load(customer_ids);

    if state.databases.is_empty() {
        println!("no checkpoint recorded for customer ids {customer_ids:?}");
        return Ok(0);
    }

    for (database, db_state) in &state.databases {
        println!("{}", database.bold());
        for (table, entry) in &db_state.tables {
            println!("  {table} {:?} rows={}", entry.status, entry.rows);
        }
        for (routine, entry) in &db_state.routines {
            println!("  {routine} ({:?}) {:?}", entry.kind, entry.status);
        }
    }

    Ok(0)
}

async fn run_drop_databases(args: DropDatabasesArgs, config: migration_connector::config::Config, reporter: &TermReporter) -> anyhow::Result<i32> {
    let destination = sql_migration_connector::connect(&config.destination, None, "destination").await?;
    let introspector = Introspector::new(&destination);

    let mut databases = introspector.list_databases().await?;

    if !args.all {
        if args.databases.is_empty() {
            anyhow::bail!("pass --all or --databases");
        }
        databases.retain(|d| args.databases.iter().any(|f| f.eq_ignore_ascii_case(d)));
    }

    if databases.is_empty() {
        println!("no matching databases");
        return Ok(0);
    }

    println!("{}", "databases to drop:".bold());
    for db in &databases {
        println!("  {db}");
    }

    if args.dry_run {
        return Ok(0);
    }

    if !args.no_confirm {
        if !reporter.prompt_yes_no("Do you understand this will permanently delete data?") {
            return Ok(0);
        }
        if !reporter.prompt_yes_no(&format!("Proceed with dropping {} databases?", databases.len())) {
            return Ok(0);
        }
        let prompt = format!("Type '{DROP_CONFIRMATION_LITERAL}' to confirm:");
        if !reporter.prompt_literal(&prompt, DROP_CONFIRMATION_LITERAL) {
            return Ok(0);
        }
    }

    if args.backup {
        let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
        destructive::backup_databases(
            reporter,
            &config.destination.host,
            config.destination.port,
            &config.destination.user,
            &config.destination.password,
            &databases,
            &PathBuf::from("."),
            &timestamp,
        )
        .await;
    }

    let results = destructive::execute_database_drop(&destination, &databases).await;
    let mut failures = 0;
    for (database, outcome) in results {
        match outcome {
            Ok(()) => println!("{} {database}", "dropped".green()),
            Err(err) => {
                failures += 1;
                println!("{} {database}: {err}", "failed".red());
            }
        }
    }

    Ok(if failures > 0 { 1 } else { 0 })
}

async fn run_delete_rows(args: DeleteRowsArgs, config: migration_connector::config::Config, reporter: &TermReporter) -> anyhow::Result<i32> {
    let destination = sql_migration_connector::connect(&config.destination, None, "destination").await?;
    let introspector = Introspector::new(&destination);

    let mut databases = introspector.list_databases().await?;
    if !args.databases.is_empty() {
        databases.retain(|d| args.databases.iter().any(|f| f.eq_ignore_ascii_case(d)));
    }

    let mut tables_by_database = HashMap::new();
    for database in &databases {
        let mut tables = introspector.list_tables(database).await?;
        if !args.tables.is_empty() {
            tables.retain(|t| args.tables.iter().any(|f| f.eq_ignore_ascii_case(t)));
        }
        tables_by_database.insert(database.clone(), tables);
    }

    let plan = destructive::analyze_deletion_scope(&destination, &databases, &tables_by_database, &args.customer_ids).await?;

    if plan.tables.is_empty() {
        println!("nothing to delete");
        return Ok(0);
    }

    println!("{}", "rows to delete:".bold());
    for scope in &plan.tables {
        println!("  {}.{} {} rows ({})", scope.database, scope.table, scope.row_count, scope.filter_description);
    }
    println!("total: {} rows across {} tables", plan.total_rows(), plan.tables.len());

    if args.dry_run {
        return Ok(0);
    }

    if !args.no_confirm {
        if let Err(_abort) = destructive::confirm_deletion(reporter, &plan, DELETE_CONFIRMATION_LITERAL) {
            return Ok(0);
        }
    }

    if args.backup {
        let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
        destructive::backup_databases(
            reporter,
            &config.destination.host,
            config.destination.port,
            &config.destination.user,
            &config.destination.password,
            &plan.databases(),
            &PathBuf::from("."),
            &timestamp,
        )
        .await;
    }

    let log = destructive::execute_deletion(&destination, &config.destination.host, &plan).await;
    let log_path = PathBuf::from(format!("deletion_log_{}.json", chrono::Utc::now().format("%Y%m%d%H%M%S")));
    std::fs::write(&log_path, serde_json::to_string_pretty(&log)?)?;
    println!("deletion log written to {}", log_path.display());

    Ok(0)
}
