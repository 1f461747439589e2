//! C6 — Routine Migrator. `SHOW CREATE {PROCEDURE|FUNCTION}` on source,
//! `USE db; DROP ... IF EXISTS; <create statement>` on destination,
//! verbatim (spec.md §4.6). A routine already `completed` in state is
//! skipped unless force is active; failures are recorded and never
//! block table migration.

use migration_connector::error::TableError;
use migration_connector::model::{RoutineDescriptor, RoutineKind};
use sqlx::{MySqlPool, Row};

pub struct RoutineOutcome {
    pub name: String,
    pub kind: RoutineKind,
    pub result: Result<(), TableError>,
}

/// `SHOW CREATE PROCEDURE`/`SHOW CREATE FUNCTION` returns a row shaped
/// `(name, sql_mode, create_statement, ...)`; the create statement is the
/// third column for both routine kinds.
async fn show_create(pool: &MySqlPool, database: &str, routine: &RoutineDescriptor) -> Result<String, sqlx::Error> {
    let keyword = match routine.kind {
        RoutineKind::Procedure => "PROCEDURE",
        RoutineKind::Function => "FUNCTION",
    };
    let qualified = format!("`{database}`.`{}`", routine.name);
    let sql = format!("SHOW CREATE {keyword} {qualified}");
    let row = sqlx::query(&sql).fetch_one(pool).await?;
    row.try_get::<String, _>(2)
}

fn drop_statement(database: &str, routine: &RoutineDescriptor) -> String {
    let keyword = match routine.kind {
        RoutineKind::Procedure => "PROCEDURE",
        RoutineKind::Function => "FUNCTION",
    };
    format!("DROP {keyword} IF EXISTS `{database}`.`{}`", routine.name)
}

/// Migrate one routine. Returns `Err` with the reason the routine should
/// be recorded `failed`; never panics on a malformed create statement —
/// that surfaces as a `TableError` like any other failure.
pub async fn migrate_routine(
    source: &MySqlPool,
    destination: &MySqlPool,
    database: &str,
    routine: &RoutineDescriptor,
) -> Result<(), TableError> {
    let to_error = |reason: String| TableError {
        database: database.to_string(),
        table: routine.name.clone(),
        reason,
    };

    let create_statement = show_create(source, database, routine).await.map_err(|e| to_error(e.to_string()))?;

    sqlx::query(&format!("USE `{database}`"))
        .execute(destination)
        .await
        .map_err(|e| to_error(e.to_string()))?;

    sqlx::query(&drop_statement(database, routine))
        .execute(destination)
        .await
        .map_err(|e| to_error(e.to_string()))?;

    sqlx::query(&create_statement)
        .execute(destination)
        .await
        .map_err(|e| to_error(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_statement_targets_procedure_keyword() {
        let routine = RoutineDescriptor {
            name: "recalc_balance".to_string(),
            kind: RoutineKind::Procedure,
        };
        assert_eq!(
            drop_statement("STARFOX", &routine),
            "DROP PROCEDURE IF EXISTS `STARFOX`.`recalc_balance`"
        );
    }

    #[test]
    fn drop_statement_targets_function_keyword() {
        let routine = RoutineDescriptor {
            name: "normalize_name".to_string(),
            kind: RoutineKind::Function,
        };
        assert_eq!(
            drop_statement("STARFOX", &routine),
            "DROP FUNCTION IF EXISTS `STARFOX`.`normalize_name`"
        );
    }
}
