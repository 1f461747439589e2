//! C10 — Destructive Ops. Two modes, database drop and row delete, both
//! following analyze → plan → confirm → (optional backup) → execute →
//! deletion log (spec.md §4.10), grounded in
//! `examples/original_source/delete_migrated_data.py`'s
//! `analyze_deletion_scope` / `get_deletion_confirmation` /
//! `backup_before_deletion` / `execute_deletion`.

use migration_connector::error::DestructiveAbort;
use migration_connector::reporter::Reporter;
use sqlx::{MySqlPool, Row};
use std::path::{Path, PathBuf};

pub const DROP_CONFIRMATION_LITERAL: &str = "DROP DATABASES";
pub const DELETE_CONFIRMATION_LITERAL: &str = "DELETE DATA";

#[derive(Debug, Clone)]
pub struct TableScope {
    pub database: String,
    pub table: String,
    pub row_count: u64,
    pub filter_description: String,
    pub customer_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeletionPlan {
    pub tables: Vec<TableScope>,
}

impl DeletionPlan {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.row_count).sum()
    }

    pub fn databases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.database.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
enum DeletionLogEntry {
    Success {
        database: String,
        table: String,
        rows_deleted: u64,
        filter: String,
    },
    Failure {
        database: String,
        table: String,
        error: String,
    },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeletionLog {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub target: String,
    deletions: Vec<DeletionLogEntry>,
}

/// Analyze row-delete scope: for each candidate database/table pair on
/// `target`, a `customer_id` column (if present) narrows the count and
/// is recorded in `filter_description`; otherwise the full row count is
/// reported (spec.md §4.10 step 1).
pub async fn analyze_deletion_scope(
    target: &MySqlPool,
    databases: &[String],
    tables_by_database: &std::collections::HashMap<String, Vec<String>>,
    customer_ids: &[i64],
) -> Result<DeletionPlan, sqlx::Error> {
    let mut plan = DeletionPlan::default();

    for database in databases {
        let Some(tables) = tables_by_database.get(database) else {
            continue;
        };

        for table in tables {
            let has_customer_id: bool = sqlx::query(
                "SELECT 1 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND LOWER(COLUMN_NAME) = 'customer_id'",
            )
            .bind(database)
            .bind(table)
            .fetch_optional(target)
            .await?
            .is_some();

            let (row_count, filter_description, used_ids) = if has_customer_id && !customer_ids.is_empty() {
                let placeholders = vec!["?"; customer_ids.len()].join(",");
                let sql = format!("SELECT COUNT(*) FROM `{database}`.`{table}` WHERE customer_id IN ({placeholders})");
                let mut q = sqlx::query(&sql);
                for id in customer_ids {
                    q = q.bind(id);
                }
                let row = q.fetch_one(target).await?;
                let count: i64 = row.try_get(0usize)?;
                let ids_joined = customer_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
                (count.max(0) as u64, format!("customer_id IN ({ids_joined})"), Some(customer_ids.to_vec()))
            } else {
                let sql = format!("SELECT COUNT(*) FROM `{database}`.`{table}`");
                let row = sqlx::query(&sql).fetch_one(target).await?;
                let count: i64 = row.try_get(0usize)?;
                (count.max(0) as u64, "ALL ROWS (no customer_id filter)".to_string(), None)
            };

            if row_count > 0 {
                plan.tables.push(TableScope {
                    database: database.clone(),
                    table: table.clone(),
                    row_count,
                    filter_description,
                    customer_ids: used_ids,
                });
            }
        }
    }

    Ok(plan)
}

/// Stepped confirmation (spec.md §4.10 step 3): an initial yes/no, the
/// plan display is the caller's responsibility via `Reporter`, then a
/// second yes/no, then the literal-text final gate. `--no-confirm`
/// bypasses all three and is handled by the caller, never here.
pub fn confirm_deletion(reporter: &dyn Reporter, plan: &DeletionPlan, literal: &str) -> Result<(), DestructiveAbort> {
    if !reporter.prompt_yes_no("Do you understand this will permanently delete data?") {
        return Err(DestructiveAbort);
    }

    if !reporter.prompt_yes_no(&format!(
        "Proceed with deleting {} rows across {} tables?",
        plan.total_rows(),
        plan.tables.len()
    )) {
        return Err(DestructiveAbort);
    }

    let prompt = format!("Type '{literal}' to confirm:");
    if !reporter.prompt_literal(&prompt, literal) {
        return Err(DestructiveAbort);
    }

    Ok(())
}

/// Dumps hang are a known failure mode of the original tool against a
/// large warehouse database; bound each one so a stuck `mysqldump` can't
/// wedge the whole cleanup run.
const BACKUP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(600);

/// `mysqldump --databases <name>` per database into a timestamped
/// directory. A failed or timed-out dump is a warning, never a hard
/// error (spec.md §4.10 step 4).
pub async fn backup_databases(
    reporter: &dyn Reporter,
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    databases: &[String],
    backup_root: &Path,
    timestamp: &str,
) -> PathBuf {
    let backup_dir = backup_root.join(format!("backup_before_deletion_{timestamp}"));
    if let Err(err) = std::fs::create_dir_all(&backup_dir) {
        reporter.warning(&format!("could not create backup directory {}: {err}", backup_dir.display()));
        return backup_dir;
    }

    for database in databases {
        let dump_path = backup_dir.join(format!("{database}.sql"));
        let child = tokio::process::Command::new("mysqldump")
            .arg("-h")
            .arg(host)
            .arg("-P")
            .arg(port.to_string())
            .arg("-u")
            .arg(user)
            .arg(format!("-p{password}"))
            .arg("--databases")
            .arg(database)
            .output();

        match tokio::time::timeout(BACKUP_TIMEOUT, child).await {
            Ok(Ok(output)) if output.status.success() => {
                if let Err(err) = std::fs::write(&dump_path, &output.stdout) {
                    reporter.warning(&format!("could not write backup for {database}: {err}"));
                }
            }
            Ok(Ok(output)) => {
                reporter.warning(&format!(
                    "mysqldump failed for {database}: {}",
                    String::from_utf8_lossy(&output.stderr)
                ));
            }
            Ok(Err(err)) => {
                reporter.warning(&format!("could not run mysqldump for {database}: {err}"));
            }
            Err(_) => {
                reporter.warning(&format!("mysqldump for {database} timed out after {}s", BACKUP_TIMEOUT.as_secs()));
            }
        }
    }

    backup_dir
}

/// Execute a row-delete plan. Destination FK checks are disabled for the
/// duration and restored unconditionally, matching the orchestrator's
/// guard discipline (spec.md §4.10 step 5).
pub async fn execute_deletion(target: &MySqlPool, target_host: &str, plan: &DeletionPlan) -> DeletionLog {
    let mut entries = Vec::with_capacity(plan.tables.len());

    let _ = sqlx::query("SET FOREIGN_KEY_CHECKS = 0").execute(target).await;

    for scope in &plan.tables {
        let result: Result<u64, sqlx::Error> = async {
            let (sql, ids) = match &scope.customer_ids {
                Some(ids) if !ids.is_empty() => {
                    let placeholders = vec!["?"; ids.len()].join(",");
                    (
                        format!("DELETE FROM `{}`.`{}` WHERE customer_id IN ({placeholders})", scope.database, scope.table),
                        ids.clone(),
                    )
                }
                _ => (format!("DELETE FROM `{}`.`{}`", scope.database, scope.table), Vec::new()),
            };

            let mut q = sqlx::query(&sql);
            for id in &ids {
                q = q.bind(id);
            }
            let result = q.execute(target).await?;
            Ok(result.rows_affected())
        }
        .await;

        entries.push(match result {
            Ok(rows_deleted) => DeletionLogEntry::Success {
                database: scope.database.clone(),
                table: scope.table.clone(),
                rows_deleted,
                filter: scope.filter_description.clone(),
            },
            Err(err) => DeletionLogEntry::Failure {
                database: scope.database.clone(),
                table: scope.table.clone(),
                error: err.to_string(),
            },
        });
    }

    let _ = sqlx::query("SET FOREIGN_KEY_CHECKS = 1").execute(target).await;

    DeletionLog {
        timestamp: chrono::Utc::now(),
        target: target_host.to_string(),
        deletions: entries,
    }
}

/// `DROP DATABASE` for each target name. Never touches FK checks — the
/// whole database disappears with them.
pub async fn execute_database_drop(target: &MySqlPool, databases: &[String]) -> Vec<(String, Result<(), String>)> {
    let mut results = Vec::with_capacity(databases.len());

    for database in databases {
        let outcome = sqlx::query(&format!("DROP DATABASE `{database}`"))
            .execute(target)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string());
        results.push((database.clone(), outcome));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::reporter::NullReporter;

    #[test]
    fn confirm_deletion_aborts_on_first_decline() {
        let result = confirm_deletion(&NullReporter, &DeletionPlan::default(), DELETE_CONFIRMATION_LITERAL);
        assert!(result.is_err());
    }

    struct AlwaysYes;
    impl Reporter for AlwaysYes {
        fn phase_started(&self, _: &str, _: migration_connector::model::Phase) {}
        fn table_classified(&self, _: &str, _: &str, _: &migration_connector::model::TableClass) {}
        fn table_completed(&self, _: &str, _: &str, _: u64, _: u64, _: u64) {}
        fn table_skipped(&self, _: &str, _: &str, _: &str) {}
        fn table_failed(&self, _: &str, _: &str, _: &str) {}
        fn warning(&self, _: &str) {}
        fn prompt_yes_no(&self, _: &str) -> bool {
            true
        }
        fn prompt_literal(&self, _: &str, expected: &str) -> bool {
            expected == DELETE_CONFIRMATION_LITERAL
        }
        fn summary(&self, _: usize, _: usize, _: usize, _: usize) {}
    }

    #[test]
    fn confirm_deletion_succeeds_when_all_gates_pass() {
        let plan = DeletionPlan {
            tables: vec![TableScope {
                database: "STARFOX".to_string(),
                table: "ROLE".to_string(),
                row_count: 2,
                filter_description: "customer_id IN (1,7)".to_string(),
                customer_ids: Some(vec![1, 7]),
            }],
        };
        assert!(confirm_deletion(&AlwaysYes, &plan, DELETE_CONFIRMATION_LITERAL).is_ok());
    }

    #[test]
    fn plan_total_rows_sums_all_tables() {
        let plan = DeletionPlan {
            tables: vec![
                TableScope {
                    database: "STARFOX".to_string(),
                    table: "ROLE".to_string(),
                    row_count: 2,
                    filter_description: String::new(),
                    customer_ids: None,
                },
                TableScope {
                    database: "STARFOX".to_string(),
                    table: "ROLE_ACCESS_MAP".to_string(),
                    row_count: 5,
                    filter_description: String::new(),
                    customer_ids: None,
                },
            ],
        };
        assert_eq!(plan.total_rows(), 7);
        assert_eq!(plan.databases(), vec!["STARFOX".to_string()]);
    }
}
