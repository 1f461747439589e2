//! C7 — Schema Migrator. Two-pass algorithm (spec.md §4.7), the FK-clause
//! regex translated verbatim from
//! `examples/original_source/migrate_databases.py`'s `strip_foreign_keys`
//! into a `once_cell::sync::Lazy<Regex>`. Deferring constraints to a
//! second pass removes any table-ordering requirement and tolerates
//! cycles in the FK graph.

use migration_connector::error::TableError;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{MySqlPool, Row};

static FK_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is),?\s*CONSTRAINT\s+`[^`]+`\s+FOREIGN\s+KEY\s*\([^)]+\)\s+REFERENCES\s+`[^`]+`\s*\([^)]+\)\
          (?:\s+ON\s+DELETE\s+(?:CASCADE|SET\s+NULL|NO\s+ACTION|RESTRICT))?\
          (?:\s+ON\s+UPDATE\s+(?:CASCADE|SET\s+NULL|NO\s+ACTION|RESTRICT))?",
    )
    .expect("FK_CLAUSE pattern is a fixed, validated literal")
});

static DOUBLE_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*,").expect("fixed literal"));
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\)").expect("fixed literal"));

/// Split a `CREATE TABLE` statement into `(stripped_statement, fk_clauses)`,
/// each clause with its leading comma removed.
pub fn strip_foreign_keys(create_statement: &str) -> (String, Vec<String>) {
    let clauses: Vec<String> = FK_CLAUSE
        .find_iter(create_statement)
        .map(|m| m.as_str().trim().trim_start_matches(',').trim().to_string())
        .collect();

    let stripped = FK_CLAUSE.replace_all(create_statement, "");
    let stripped = DOUBLE_COMMA.replace_all(&stripped, ",");
    let stripped = TRAILING_COMMA.replace_all(&stripped, ")");

    (stripped.into_owned(), clauses)
}

async fn show_create_table(pool: &MySqlPool, database: &str, table: &str) -> Result<String, sqlx::Error> {
    let sql = format!("SHOW CREATE TABLE `{database}`.`{table}`");
    let row = sqlx::query(&sql).fetch_one(pool).await?;
    row.try_get::<String, _>(1)
}

/// Pass one: replicate `table`'s structure on `destination`, stripped of
/// its foreign keys. Returns the stashed FK clauses for pass two.
pub async fn migrate_table_structure(
    source: &MySqlPool,
    destination: &MySqlPool,
    database: &str,
    table: &str,
) -> Result<Vec<String>, TableError> {
    let to_error = |reason: String| TableError {
        database: database.to_string(),
        table: table.to_string(),
        reason,
    };

    let create_statement = show_create_table(source, database, table).await.map_err(|e| to_error(e.to_string()))?;
    let (stripped, fk_clauses) = strip_foreign_keys(&create_statement);

    sqlx::query(&format!("DROP TABLE IF EXISTS `{database}`.`{table}`"))
        .execute(destination)
        .await
        .map_err(|e| to_error(e.to_string()))?;

    sqlx::query(&stripped).execute(destination).await.map_err(|e| to_error(e.to_string()))?;

    Ok(fk_clauses)
}

/// Pass two: `ALTER TABLE ... ADD <clause>` for every stashed FK clause.
/// A failed clause is logged and skipped; it does not abort the pass
/// (spec.md §4.7).
pub async fn apply_foreign_keys(destination: &MySqlPool, database: &str, table: &str, fk_clauses: &[String]) {
    for clause in fk_clauses {
        let sql = format!("ALTER TABLE `{database}`.`{table}` ADD {clause}");
        if let Err(err) = sqlx::query(&sql).execute(destination).await {
            tracing::warn!(database, table, clause, error = %err, "failed to apply foreign key constraint");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_foreign_key_clause() {
        let create = "CREATE TABLE `ROLE_ACCESS_MAP` (\n  `id` int NOT NULL,\n  `role_id` int DEFAULT NULL,\n  PRIMARY KEY (`id`),\n  CONSTRAINT `fk_role` FOREIGN KEY (`role_id`) REFERENCES `ROLE` (`id`) ON DELETE CASCADE\n) ENGINE=InnoDB";
        let (stripped, clauses) = strip_foreign_keys(create);
        assert_eq!(clauses.len(), 1);
        assert!(clauses[0].starts_with("CONSTRAINT `fk_role`"));
        assert!(!stripped.contains("CONSTRAINT"));
        assert!(!stripped.contains(",\n)"));
    }

    #[test]
    fn strips_multiple_foreign_keys_and_cleans_commas() {
        let create = "CREATE TABLE `T` (\n  `id` int,\n  `a_id` int,\n  `b_id` int,\n  PRIMARY KEY (`id`),\n  CONSTRAINT `fk_a` FOREIGN KEY (`a_id`) REFERENCES `A` (`id`),\n  CONSTRAINT `fk_b` FOREIGN KEY (`b_id`) REFERENCES `B` (`id`)\n) ENGINE=InnoDB";
        let (stripped, clauses) = strip_foreign_keys(create);
        assert_eq!(clauses.len(), 2);
        assert!(!stripped.contains(",,"));
        assert!(!stripped.contains(", )"));
    }

    #[test]
    fn no_foreign_keys_leaves_statement_untouched() {
        let create = "CREATE TABLE `LOOKUP_CODE` (\n  `id` int NOT NULL,\n  `code` varchar(32),\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";
        let (stripped, clauses) = strip_foreign_keys(create);
        assert!(clauses.is_empty());
        assert_eq!(stripped, create);
    }

    #[test]
    fn fk_clause_matching_is_case_insensitive() {
        let create = "CREATE TABLE `T` (\n  `a_id` int,\n  constraint `fk_a` foreign key (`a_id`) references `A` (`id`)\n)";
        let (_, clauses) = strip_foreign_keys(create);
        assert_eq!(clauses.len(), 1);
    }
}
