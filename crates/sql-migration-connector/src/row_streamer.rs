//! C5 — Row Streamer. Counts, paginates and copies rows for one table
//! under a [`PlanRef`], per spec.md §4.5. No inter-table ordering is
//! required: destination FK enforcement is disabled for the run's
//! duration (§C9), so duplicate re-reads of overlapping pages are
//! harmless under `INSERT IGNORE`.

use crate::value::{decode_row, NamedRow, Value};
use migration_connector::error::{InsertConflict, TableError};
use migration_connector::model::TableClass;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool, Row};

const MAX_SURFACED_ERRORS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct PlanRef<'a> {
    pub class: &'a TableClass,
    pub ids: &'a [i64],
    pub join_edge: Option<&'a (String, String)>,
}

#[derive(Debug, Default)]
pub struct MigrateOutcome {
    pub found: u64,
    pub inserted: u64,
    pub failed: u64,
    /// The first [`MAX_SURFACED_ERRORS`] per-row insert failures, verbatim.
    pub surfaced_errors: Vec<InsertConflict>,
}

/// `SELECT COUNT(*) ...` honoring the table's classification (spec.md
/// §4.5 "Counting").
fn count_sql(database: &str, table: &str, plan: &PlanRef) -> (String, Vec<i64>) {
    match plan.class {
        TableClass::DirectTenant(col) | TableClass::DirectUser(col) => {
            let placeholders = placeholder_list(plan.ids.len());
            (
                format!("SELECT COUNT(*) FROM `{database}`.`{table}` WHERE `{col}` IN ({placeholders})"),
                plan.ids.to_vec(),
            )
        }
        TableClass::Indirect(chain) => {
            let (child_col, parent_col) = plan.join_edge.expect("indirect plan carries a join edge");
            let parent = chain.parent_table();
            let tenant_col = match chain.id_type {
                migration_connector::model::IdKind::Tenant => "customer_id",
                migration_connector::model::IdKind::User => "user_id",
            };
            let placeholders = placeholder_list(plan.ids.len());
            (
                format!(
                    "SELECT COUNT(*) FROM `{database}`.`{table}` t \
                     INNER JOIN `{database}`.`{parent}` p ON t.`{child_col}` = p.`{parent_col}` \
                     WHERE p.`{tenant_col}` IN ({placeholders})"
                ),
                plan.ids.to_vec(),
            )
        }
        TableClass::Reference => (format!("SELECT COUNT(*) FROM `{database}`.`{table}`"), Vec::new()),
    }
}

/// `SELECT t.* ... LIMIT ? OFFSET ?` for one page (spec.md §4.5 "Fetching").
fn select_sql(database: &str, table: &str, plan: &PlanRef) -> (String, Vec<i64>) {
    match plan.class {
        TableClass::DirectTenant(col) | TableClass::DirectUser(col) => {
            let placeholders = placeholder_list(plan.ids.len());
            (
                format!("SELECT * FROM `{database}`.`{table}` WHERE `{col}` IN ({placeholders}) LIMIT ? OFFSET ?"),
                plan.ids.to_vec(),
            )
        }
        TableClass::Indirect(chain) => {
            let (child_col, parent_col) = plan.join_edge.expect("indirect plan carries a join edge");
            let parent = chain.parent_table();
            let tenant_col = match chain.id_type {
                migration_connector::model::IdKind::Tenant => "customer_id",
                migration_connector::model::IdKind::User => "user_id",
            };
            let placeholders = placeholder_list(plan.ids.len());
            (
                format!(
                    "SELECT t.* FROM `{database}`.`{table}` t \
                     INNER JOIN `{database}`.`{parent}` p ON t.`{child_col}` = p.`{parent_col}` \
                     WHERE p.`{tenant_col}` IN ({placeholders}) LIMIT ? OFFSET ?"
                ),
                plan.ids.to_vec(),
            )
        }
        TableClass::Reference => (format!("SELECT * FROM `{database}`.`{table}` LIMIT ? OFFSET ?"), Vec::new()),
    }
}

fn placeholder_list(n: usize) -> String {
    vec!["?"; n.max(1)].join(",")
}

fn table_error(database: &str, table: &str, reason: String) -> TableError {
    TableError {
        database: database.to_string(),
        table: table.to_string(),
        reason,
    }
}

fn insert_sql(database: &str, table: &str, columns: &[String]) -> String {
    let column_list = columns.iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", ");
    let placeholders = placeholder_list(columns.len());
    format!("INSERT IGNORE INTO `{database}`.`{table}` ({column_list}) VALUES ({placeholders})")
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Integer(v) => query.bind(v),
        Value::UInteger(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Decimal(v) => query.bind(v),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Text(v) => query.bind(v),
        Value::DateTime(v) => query.bind(v),
        Value::Date(v) => query.bind(v),
        Value::Time(v) => query.bind(v),
        Value::Null => query.bind(Option::<i64>::None),
    }
}

/// Standalone `COUNT(*)` under `plan`, exposed so callers can decide
/// whether a table needs the oversize-reference-table prompt (spec.md
/// §4.9) before committing to the fetch/insert loop.
pub async fn count_rows(source: &MySqlPool, database: &str, table: &str, plan: &PlanRef<'_>) -> Result<u64, TableError> {
    let (count_query, count_ids) = count_sql(database, table, plan);
    let mut count_q = sqlx::query(&count_query);
    for id in &count_ids {
        count_q = count_q.bind(id);
    }
    let row = count_q.fetch_one(source).await.map_err(|e| table_error(database, table, e.to_string()))?;
    let found: i64 = row.try_get(0usize).map_err(|e| table_error(database, table, e.to_string()))?;
    Ok(found.max(0) as u64)
}

pub async fn migrate_table(
    source: &MySqlPool,
    destination: &MySqlPool,
    database: &str,
    table: &str,
    columns: &[String],
    plan: &PlanRef<'_>,
    batch_size: u64,
) -> Result<MigrateOutcome, TableError> {
    let found = count_rows(source, database, table, plan).await?;

    let mut outcome = MigrateOutcome {
        found,
        ..Default::default()
    };

    if found == 0 {
        return Ok(outcome);
    }

    let pages = found.div_ceil(batch_size);
    let insert_stmt = insert_sql(database, table, columns);

    for page in 0..pages {
        let offset = page * batch_size;
        let (select_query, select_ids) = select_sql(database, table, plan);
        let mut select_q = sqlx::query(&select_query);
        for id in &select_ids {
            select_q = select_q.bind(id);
        }
        select_q = select_q.bind(batch_size as i64).bind(offset as i64);

        let rows = select_q.fetch_all(source).await.map_err(|e| table_error(database, table, e.to_string()))?;

        for raw_row in &rows {
            let named: NamedRow = decode_row(raw_row);
            let mut insert_q = sqlx::query(&insert_stmt);
            for (_, value) in &named {
                insert_q = bind_value(insert_q, value);
            }

            match insert_q.execute(destination).await {
                Ok(result) => {
                    if result.rows_affected() > 0 {
                        outcome.inserted += 1;
                    }
                }
                Err(err) => {
                    outcome.failed += 1;
                    if outcome.surfaced_errors.len() < MAX_SURFACED_ERRORS {
                        outcome.surfaced_errors.push(InsertConflict {
                            database: database.to_string(),
                            table: table.to_string(),
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::model::{IdKind, RelationshipChain};

    #[test]
    fn direct_tenant_count_sql_uses_in_clause() {
        let class = TableClass::DirectTenant("customer_id".to_string());
        let plan = PlanRef {
            class: &class,
            ids: &[1, 7],
            join_edge: None,
        };
        let (sql, ids) = count_sql("STARFOX", "ROLE", &plan);
        assert_eq!(sql, "SELECT COUNT(*) FROM `STARFOX`.`ROLE` WHERE `customer_id` IN (?,?)");
        assert_eq!(ids, vec![1, 7]);
    }

    #[test]
    fn reference_count_sql_has_no_filter() {
        let class = TableClass::Reference;
        let plan = PlanRef {
            class: &class,
            ids: &[],
            join_edge: None,
        };
        let (sql, ids) = count_sql("STARFOX", "LOOKUP_CODE", &plan);
        assert_eq!(sql, "SELECT COUNT(*) FROM `STARFOX`.`LOOKUP_CODE`");
        assert!(ids.is_empty());
    }

    #[test]
    fn indirect_select_sql_joins_parent_on_tenant_column() {
        let chain = RelationshipChain {
            path: vec!["ROLE_ACCESS_MAP".to_string(), "ROLE".to_string()],
            id_type: IdKind::Tenant,
            join_edge: ("role_id".to_string(), "id".to_string()),
        };
        let class = TableClass::Indirect(chain);
        let join_edge = ("role_id".to_string(), "id".to_string());
        let plan = PlanRef {
            class: &class,
            ids: &[1],
            join_edge: Some(&join_edge),
        };
        let (sql, ids) = select_sql("STARFOX", "ROLE_ACCESS_MAP", &plan);
        assert!(sql.contains("INNER JOIN `STARFOX`.`ROLE` p ON t.`role_id` = p.`id`"));
        assert!(sql.contains("WHERE p.`customer_id` IN (?) LIMIT ? OFFSET ?"));
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn insert_sql_preserves_source_column_order() {
        let sql = insert_sql("STARFOX", "ROLE", &["id".to_string(), "customer_id".to_string(), "name".to_string()]);
        assert_eq!(
            sql,
            "INSERT IGNORE INTO `STARFOX`.`ROLE` (`id`, `customer_id`, `name`) VALUES (?,?,?)"
        );
    }

    #[test]
    fn placeholder_list_never_produces_empty_parens() {
        assert_eq!(placeholder_list(0), "?");
        assert_eq!(placeholder_list(3), "?,?,?");
    }
}
