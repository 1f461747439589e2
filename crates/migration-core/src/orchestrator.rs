//! C9 — Orchestrator. Per-database sequence: connect, introspect, build
//! the combined FK map, classify, toggle destination FK checks, run
//! phases P0→P1→P1B→P1C→P2, restore FK checks unconditionally (spec.md
//! §4.9). Each table dispatches through policy gates in order: skip
//! list → state check → force check → category-specific logic.

use crate::state::StateStore;
use migration_connector::config::Config;
use migration_connector::error::MigrationError;
use migration_connector::model::{
    DatabaseState, ForeignKey, MigrationState, Phase, Status, TableClass, TableDescriptor, TableStatusEntry,
};
use migration_connector::reporter::Reporter;
use sql_migration_connector::classifier::{self, Classifier, Verdict};
use sql_migration_connector::fk_inference;
use sql_migration_connector::introspection::Introspector;
use sql_migration_connector::resolver::Resolver;
use sql_migration_connector::row_streamer::{self, PlanRef};
use sql_migration_connector::{routines, schema};
use sqlx::MySqlPool;
use std::collections::{HashMap, HashSet};
use std::future::Future;

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub databases_migrated: usize,
    pub tables_completed: usize,
    pub tables_failed: usize,
    pub tables_skipped: usize,
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    reporter: &'a dyn Reporter,
    state_store: StateStore,
}

/// Run `body` with destination FK enforcement disabled, restoring it
/// afterward regardless of whether `body` succeeded — there is no
/// stable async `Drop`, so the restore is written as an explicit
/// post-step rather than a guard object (spec.md §4.9).
async fn with_fk_checks_disabled<F, Fut, T>(destination: &MySqlPool, body: F) -> Result<T, MigrationError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, MigrationError>>,
{
    sqlx::query("SET FOREIGN_KEY_CHECKS = 0")
        .execute(destination)
        .await
        .map_err(|e| MigrationError::Other(e.to_string()))?;

    let result = body().await;

    if let Err(err) = sqlx::query("SET FOREIGN_KEY_CHECKS = 1").execute(destination).await {
        tracing::warn!(error = %err, "failed to restore FOREIGN_KEY_CHECKS");
    }

    result
}

/// Merge explicit FKs (from `KEY_COLUMN_USAGE`) with inferred ones,
/// explicit taking precedence per column (spec.md §4.2). Pure function,
/// no I/O — the orchestrator's only piece testable without a database.
pub fn build_fk_map(
    tables: &[String],
    columns_by_table: &HashMap<String, Vec<String>>,
    mut map: HashMap<String, Vec<ForeignKey>>,
) -> HashMap<String, Vec<ForeignKey>> {
    for table in tables {
        let Some(columns) = columns_by_table.get(table) else {
            continue;
        };

        let explicit_columns: HashSet<String> = map
            .get(table)
            .map(|edges| edges.iter().map(|fk| fk.column.to_ascii_lowercase()).collect())
            .unwrap_or_default();

        for column in columns {
            if explicit_columns.contains(&column.to_ascii_lowercase()) {
                continue;
            }
            if let Some(fk) = fk_inference::infer(column, tables) {
                map.entry(table.clone()).or_default().push(fk);
            }
        }
    }

    map
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, reporter: &'a dyn Reporter) -> Self {
        Self {
            config,
            reporter,
            state_store: StateStore::new(config.state_dir.clone()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(
        &self,
        customer_ids: &[i64],
        databases_filter: Option<&[String]>,
        force_all: bool,
    ) -> Result<RunSummary, MigrationError> {
        let source = sql_migration_connector::connect(&self.config.source, None, "source").await?;
        let destination = sql_migration_connector::connect(&self.config.destination, None, "destination").await?;

        let introspector = Introspector::new(&source);
        let mut databases = introspector
            .list_databases()
            .await
            .map_err(|e| MigrationError::Other(e.to_string()))?;

        if let Some(filter) = databases_filter {
            databases.retain(|d| filter.iter().any(|f| f.eq_ignore_ascii_case(d)));
        }

        let mut state = self.state_store.load(customer_ids);
        let mut summary = RunSummary::default();

        for database in &databases {
            self.migrate_database(&source, &destination, database, customer_ids, force_all, &mut state, &mut summary)
                .await?;

            self.state_store
                .save(customer_ids, &mut state)
                .map_err(|e| MigrationError::Other(e.to_string()))?;
        }

        summary.databases_migrated = databases.len();
        self.reporter.summary(
            summary.databases_migrated,
            summary.tables_completed,
            summary.tables_failed,
            summary.tables_skipped,
        );

        Ok(summary)
    }

    async fn migrate_database(
        &self,
        source: &MySqlPool,
        destination: &MySqlPool,
        database: &str,
        customer_ids: &[i64],
        force_all: bool,
        state: &mut MigrationState,
        summary: &mut RunSummary,
    ) -> Result<(), MigrationError> {
        let introspector = Introspector::new(source);

        let table_names = introspector
            .list_tables(database)
            .await
            .map_err(|e| MigrationError::Other(e.to_string()))?;

        let mut columns_by_table = HashMap::new();
        for table in &table_names {
            let columns = introspector
                .columns_of(database, table)
                .await
                .map_err(|e| MigrationError::Other(e.to_string()))?;
            columns_by_table.insert(table.clone(), columns);
        }

        let explicit_fks = introspector
            .explicit_fks(database)
            .await
            .map_err(|e| MigrationError::Other(e.to_string()))?;
        let fk_map = build_fk_map(&table_names, &columns_by_table, explicit_fks);

        let tables: Vec<TableDescriptor> = table_names
            .iter()
            .map(|name| TableDescriptor {
                database: database.to_string(),
                name: name.clone(),
                columns: columns_by_table.get(name).cloned().unwrap_or_default(),
                foreign_keys: fk_map.get(name).cloned().unwrap_or_default(),
            })
            .collect();

        let tenant_tables = classifier::tenant_table_names(&tables);
        let user_tables = classifier::user_table_names(&tables);
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, self.config.max_chain_depth);
        let table_classifier = Classifier::new(&resolver, &self.config.skip_tables, &self.config.force_migrate_tables);

        let routines = introspector
            .list_routines(database)
            .await
            .map_err(|e| MigrationError::Other(e.to_string()))?;

        with_fk_checks_disabled(destination, || async {
            self.reporter.phase_started(database, Phase::Routines);
            for routine in &routines {
                self.migrate_one_routine(source, destination, database, routine, force_all, state)
                    .await;
            }

            let mut by_phase: HashMap<Phase, Vec<(TableDescriptor, TableClass, bool)>> = HashMap::new();

            for table in &tables {
                match table_classifier.classify(table) {
                    Verdict::Skip => {
                        self.reporter.table_skipped(database, &table.name, "env_skip_tables");
                        record_table_status(
                            state,
                            database,
                            &table.name,
                            Status::Skipped,
                            0,
                            Some("env_skip_tables".to_string()),
                        );
                        summary.tables_skipped += 1;
                    }
                    Verdict::Migrate { class, forced } => {
                        self.reporter.table_classified(database, &table.name, &class);
                        let phase = phase_for(&class);
                        by_phase.entry(phase).or_default().push((table.clone(), class, forced));
                    }
                }
            }

            for phase in [Phase::DirectTenant, Phase::DirectUser, Phase::Indirect, Phase::Reference] {
                self.reporter.phase_started(database, phase);
                let Some(entries) = by_phase.get(&phase) else { continue };

                for (table, class, forced) in entries {
                    self.migrate_one_table(
                        source,
                        destination,
                        database,
                        table,
                        class,
                        *forced,
                        customer_ids,
                        force_all,
                        state,
                        summary,
                    )
                    .await;
                }
            }

            Ok(())
        })
        .await
    }

    async fn migrate_one_routine(
        &self,
        source: &MySqlPool,
        destination: &MySqlPool,
        database: &str,
        routine: &migration_connector::model::RoutineDescriptor,
        force_all: bool,
        state: &mut MigrationState,
    ) {
        if !force_all {
            if let Some(entry) = state.routine_status(database, &routine.name) {
                if entry.status == Status::Completed {
                    return;
                }
            }
        }

        match routines::migrate_routine(source, destination, database, routine).await {
            Ok(()) => record_routine_status(state, database, &routine.name, routine.kind.into(), Status::Completed),
            Err(err) => {
                self.reporter.table_failed(database, &routine.name, &err.reason);
                record_routine_status(state, database, &routine.name, routine.kind.into(), Status::Failed);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn migrate_one_table(
        &self,
        source: &MySqlPool,
        destination: &MySqlPool,
        database: &str,
        table: &TableDescriptor,
        class: &TableClass,
        forced: bool,
        customer_ids: &[i64],
        force_all: bool,
        state: &mut MigrationState,
        summary: &mut RunSummary,
    ) {
        if !forced && !force_all {
            if let Some(entry) = state.table_status(database, &table.name) {
                match entry.status {
                    Status::Completed => return,
                    Status::Skipped if entry.reason.as_deref() != Some("user_declined") => return,
                    _ => {}
                }
            }
        }

        let owned_plan = classifier::build_filter_plan(class.clone(), customer_ids, &self.config.seed_user_ids);

        // Forced tables migrate wholesale regardless of classification
        // and without the oversize-reference-table prompt (spec.md §4.4).
        let reference_class = TableClass::Reference;
        let plan_class: &TableClass = if forced { &reference_class } else { &owned_plan.class };
        let plan_ids: &[i64] = if forced { &[] } else { &owned_plan.ids };
        let plan = PlanRef {
            class: plan_class,
            ids: plan_ids,
            join_edge: owned_plan.join_edge.as_ref(),
        };

        if matches!(class, TableClass::Reference) && !forced {
            match row_streamer::count_rows(source, database, &table.name, &plan).await {
                Ok(found) if found > self.config.auto_confirm_threshold => {
                    let proceed = if self.config.skip_large_tables {
                        false
                    } else {
                        self.reporter.prompt_yes_no(&format!(
                            "{}.{} has {found} rows with no tenant filter. Migrate anyway?",
                            database, table.name
                        ))
                    };

                    if !proceed {
                        self.reporter.table_skipped(database, &table.name, "user_declined");
                        record_table_status(state, database, &table.name, Status::Skipped, 0, Some("user_declined".to_string()));
                        summary.tables_skipped += 1;
                        return;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    self.reporter.table_failed(database, &table.name, &err.reason);
                    record_table_status(state, database, &table.name, Status::Failed, 0, Some(err.reason.clone()));
                    summary.tables_failed += 1;
                    return;
                }
            }
        }

        let mut outcome = row_streamer::migrate_table(
            source,
            destination,
            database,
            &table.name,
            &table.columns,
            &plan,
            self.config.batch_size,
        )
        .await;

        // A missing destination table gets auto-created (structure only,
        // no FKs — spec.md §4.5 edge case) and the copy is retried once.
        if let Err(err) = &outcome {
            if missing_destination_table(&err.reason) {
                match schema::migrate_table_structure(source, destination, database, &table.name).await {
                    Ok(_fk_clauses) => {
                        outcome = row_streamer::migrate_table(
                            source,
                            destination,
                            database,
                            &table.name,
                            &table.columns,
                            &plan,
                            self.config.batch_size,
                        )
                        .await;
                    }
                    Err(schema_err) => {
                        self.reporter.table_failed(database, &table.name, &schema_err.reason);
                        record_table_status(state, database, &table.name, Status::Failed, 0, Some(schema_err.reason));
                        summary.tables_failed += 1;
                        return;
                    }
                }
            }
        }

        match outcome {
            Ok(outcome) => {
                for err in &outcome.surfaced_errors {
                    self.reporter.warning(&err.to_string());
                }
                self.reporter
                    .table_completed(database, &table.name, outcome.found, outcome.inserted, outcome.failed);
                record_table_status(state, database, &table.name, Status::Completed, outcome.inserted, None);
                summary.tables_completed += 1;
            }
            Err(err) => {
                self.reporter.table_failed(database, &table.name, &err.reason);
                record_table_status(state, database, &table.name, Status::Failed, 0, Some(err.reason.clone()));
                summary.tables_failed += 1;
            }
        }
    }
}

fn missing_destination_table(reason: &str) -> bool {
    reason.contains("doesn't exist") || reason.contains("Unknown table")
}

fn phase_for(class: &TableClass) -> Phase {
    match class {
        TableClass::DirectTenant(_) => Phase::DirectTenant,
        TableClass::DirectUser(_) => Phase::DirectUser,
        TableClass::Indirect(_) => Phase::Indirect,
        TableClass::Reference => Phase::Reference,
    }
}

fn record_table_status(state: &mut MigrationState, database: &str, table: &str, status: Status, rows: u64, reason: Option<String>) {
    let entry = state.databases.entry(database.to_string()).or_insert_with(DatabaseState::default);
    entry.tables.insert(
        table.to_string(),
        TableStatusEntry {
            status,
            rows,
            timestamp: chrono::Utc::now(),
            reason,
        },
    );
}

fn record_routine_status(
    state: &mut MigrationState,
    database: &str,
    routine: &str,
    kind: migration_connector::model::RoutineType,
    status: Status,
) {
    let entry = state.databases.entry(database.to_string()).or_insert_with(DatabaseState::default);
    entry.routines.insert(
        routine.to_string(),
        migration_connector::model::RoutineStatusEntry {
            kind,
            status,
            timestamp: chrono::Utc::now(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::model::FkOrigin;

    #[test]
    fn build_fk_map_prefers_explicit_over_inferred_on_same_column() {
        let tables = vec!["ROLE_ACCESS_MAP".to_string(), "ROLE".to_string()];
        let mut columns = HashMap::new();
        columns.insert("ROLE_ACCESS_MAP".to_string(), vec!["id".to_string(), "role_id".to_string()]);
        columns.insert("ROLE".to_string(), vec!["id".to_string(), "customer_id".to_string()]);

        let mut explicit = HashMap::new();
        explicit.insert(
            "ROLE_ACCESS_MAP".to_string(),
            vec![ForeignKey {
                column: "role_id".to_string(),
                referenced_table: "ROLE".to_string(),
                referenced_column: Some("id".to_string()),
                origin: FkOrigin::Explicit,
            }],
        );

        let map = build_fk_map(&tables, &columns, explicit);
        let edges = &map["ROLE_ACCESS_MAP"];
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].origin, FkOrigin::Explicit);
    }

    #[test]
    fn build_fk_map_adds_inferred_edges_when_no_explicit_fk_exists() {
        let tables = vec!["ROLE_ACCESS_MAP".to_string(), "ROLE".to_string()];
        let mut columns = HashMap::new();
        columns.insert("ROLE_ACCESS_MAP".to_string(), vec!["id".to_string(), "role_id".to_string()]);
        columns.insert("ROLE".to_string(), vec!["id".to_string()]);

        let map = build_fk_map(&tables, &columns, HashMap::new());
        let edges = &map["ROLE_ACCESS_MAP"];
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].origin, FkOrigin::Implicit);
        assert_eq!(edges[0].referenced_table, "ROLE");
    }

    #[test]
    fn phase_for_maps_each_class_to_its_tag() {
        assert_eq!(phase_for(&TableClass::DirectTenant("customer_id".into())).tag(), "P1");
        assert_eq!(phase_for(&TableClass::DirectUser("user_id".into())).tag(), "P1B");
        assert_eq!(phase_for(&TableClass::Reference).tag(), "P2");
    }
}
