//! C1 — Connection / Introspection. Discovery of databases, tables,
//! columns, routines and explicit foreign keys over `information_schema`.
//! Transport failures are fatal for the affected database
//! ([`migration_connector::error::ConnectionError`]); per-table
//! introspection failures are reported via [`migration_connector::error::IntrospectionWarning`]
//! and do not abort the run (spec.md §4.1, §7).

use migration_connector::model::{is_system_database, FkOrigin, ForeignKey, RoutineDescriptor, RoutineKind};
use sqlx::MySqlPool;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct Introspector<'a> {
    pool: &'a MySqlPool,
}

impl<'a> Introspector<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_databases(&self) -> Result<Vec<String>, IntrospectionError> {
        let rows: Vec<(String,)> = sqlx::query_as("SHOW DATABASES")
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name,)| name)
            .filter(|name| !is_system_database(name))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>, IntrospectionError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT TABLE_NAME FROM information_schema.TABLES WHERE TABLE_SCHEMA = ? ORDER BY TABLE_NAME",
        )
        .bind(database)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Field names only, order preserved (spec.md §4.1).
    #[tracing::instrument(skip(self))]
    pub async fn columns_of(&self, database: &str, table: &str) -> Result<Vec<String>, IntrospectionError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT COLUMN_NAME FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(database)
        .bind(table)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn has_column(&self, database: &str, table: &str, name: &str) -> Result<bool, IntrospectionError> {
        let columns = self.columns_of(database, table).await?;
        Ok(columns.iter().any(|c| c.eq_ignore_ascii_case(name)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_routines(&self, database: &str) -> Result<Vec<RoutineDescriptor>, IntrospectionError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT ROUTINE_NAME, ROUTINE_TYPE FROM information_schema.ROUTINES WHERE ROUTINE_SCHEMA = ?",
        )
        .bind(database)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, kind)| RoutineDescriptor {
                name,
                kind: if kind.eq_ignore_ascii_case("FUNCTION") {
                    RoutineKind::Function
                } else {
                    RoutineKind::Procedure
                },
            })
            .collect())
    }

    /// All explicit foreign keys in `database`, derived from
    /// `KEY_COLUMN_USAGE` where `REFERENCED_TABLE_NAME IS NOT NULL`
    /// (spec.md §4.1), grouped by owning table.
    #[tracing::instrument(skip(self))]
    pub async fn explicit_fks(&self, database: &str) -> Result<HashMap<String, Vec<ForeignKey>>, IntrospectionError> {
        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT TABLE_NAME, COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
             FROM information_schema.KEY_COLUMN_USAGE \
             WHERE TABLE_SCHEMA = ? AND REFERENCED_TABLE_NAME IS NOT NULL",
        )
        .bind(database)
        .fetch_all(self.pool)
        .await?;

        let mut map: HashMap<String, Vec<ForeignKey>> = HashMap::new();

        for (table, column, referenced_table, referenced_column) in rows {
            map.entry(table).or_default().push(ForeignKey {
                column,
                referenced_table,
                referenced_column,
                origin: FkOrigin::Explicit,
            });
        }

        Ok(map)
    }
}
