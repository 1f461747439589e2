//! Skip/force pattern grammar (spec.md §6), grounded in
//! `examples/original_source/migrate_customer_data_v3.py`'s
//! `should_skip_table` / `should_force_migrate`.
//!
//! The two originals accept different token subsets, so parsing is split
//! accordingly: skip patterns are `DB.TABLE` (exact), `DB.*` (all tables
//! in DB), or `*.TABLE` (table in any DB) — no bare `TABLE`, matching
//! `should_skip_table`'s branches. Force patterns are `DB.TABLE`,
//! `*.TABLE`, or bare `TABLE` (equivalent to `*.TABLE`) — no `DB.*`,
//! matching `should_force_migrate`'s branches. All matching is
//! case-insensitive.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `DB.TABLE`
    Exact { database: String, table: String },
    /// `DB.*` — every table in `database`. Skip lists only.
    DatabaseWildcard { database: String },
    /// `*.TABLE` or bare `TABLE` — `table` in any database.
    TableWildcard { table: String },
}

impl Pattern {
    fn exact_or_table_wildcard(trimmed: &str) -> Option<Pattern> {
        if let Some(table) = trimmed.strip_prefix("*.") {
            return Some(Pattern::TableWildcard {
                table: table.to_ascii_lowercase(),
            });
        }

        trimmed.split_once('.').map(|(database, table)| Pattern::Exact {
            database: database.to_ascii_lowercase(),
            table: table.to_ascii_lowercase(),
        })
    }

    /// Parse one token of a `SKIP_TABLES` list: `DB.TABLE`, `DB.*`, or
    /// `*.TABLE`. A bare `TABLE` token has no meaning for a skip pattern
    /// (`should_skip_table` has no such branch) and is dropped.
    pub fn parse_skip(raw: &str) -> Option<Pattern> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(database) = trimmed.strip_suffix(".*") {
            return Some(Pattern::DatabaseWildcard {
                database: database.to_ascii_lowercase(),
            });
        }

        Self::exact_or_table_wildcard(trimmed)
    }

    /// Parse one token of a `FORCE_MIGRATE_TABLES` list: `DB.TABLE`,
    /// `*.TABLE`, or bare `TABLE`. A `DB.*` token has no meaning for a
    /// force pattern (`should_force_migrate` has no such branch) and is
    /// dropped.
    pub fn parse_force(raw: &str) -> Option<Pattern> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.ends_with(".*") {
            return None;
        }

        Self::exact_or_table_wildcard(trimmed).or_else(|| {
            Some(Pattern::TableWildcard {
                table: trimmed.to_ascii_lowercase(),
            })
        })
    }

    pub fn matches(&self, database: &str, table: &str) -> bool {
        match self {
            Pattern::Exact {
                database: pattern_db,
                table: pattern_table,
            } => database.eq_ignore_ascii_case(pattern_db) && table.eq_ignore_ascii_case(pattern_table),
            Pattern::DatabaseWildcard { database: pattern_db } => database.eq_ignore_ascii_case(pattern_db),
            Pattern::TableWildcard { table: pattern_table } => table.eq_ignore_ascii_case(pattern_table),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact { database, table } => write!(f, "{database}.{table}"),
            Pattern::DatabaseWildcard { database } => write!(f, "{database}.*"),
            Pattern::TableWildcard { table } => write!(f, "*.{table}"),
        }
    }
}

/// Parse a comma-separated `SKIP_TABLES` list, silently dropping blank
/// tokens and bare table names (matching the Python original's
/// `[t.strip() for t in ... if t.strip()]` plus `should_skip_table`'s
/// lack of a bare-table branch).
pub fn parse_skip_pattern_list(raw: &str) -> Vec<Pattern> {
    raw.split(',').filter_map(Pattern::parse_skip).collect()
}

/// Parse a comma-separated `FORCE_MIGRATE_TABLES` list, silently
/// dropping blank tokens and `DB.*` tokens (matching
/// `should_force_migrate`'s lack of a database-wildcard branch).
pub fn parse_force_pattern_list(raw: &str) -> Vec<Pattern> {
    raw.split(',').filter_map(Pattern::parse_force).collect()
}

pub fn matches_any(patterns: &[Pattern], database: &str, table: &str) -> bool {
    patterns.iter().any(|p| p.matches(database, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_is_case_insensitive() {
        let p = Pattern::parse_skip("STARFOX.AUDIT_LOG").unwrap();
        assert!(p.matches("starfox", "audit_log"));
        assert!(!p.matches("starfox", "other"));
    }

    #[test]
    fn database_wildcard_skips_whole_database() {
        let p = Pattern::parse_skip("STARFOX.*").unwrap();
        assert!(p.matches("STARFOX", "anything"));
        assert!(!p.matches("other", "anything"));
    }

    #[test]
    fn table_wildcard_matches_any_database() {
        let p = Pattern::parse_skip("*.schema_version").unwrap();
        assert!(p.matches("db_one", "schema_version"));
        assert!(p.matches("db_two", "SCHEMA_VERSION"));
    }

    #[test]
    fn bare_table_behaves_like_table_wildcard_for_force_patterns() {
        let p = Pattern::parse_force("schema_version").unwrap();
        assert_eq!(p, Pattern::TableWildcard { table: "schema_version".into() });
        assert!(p.matches("any_db", "schema_version"));
    }

    #[test]
    fn bare_table_is_not_a_skip_pattern() {
        assert_eq!(Pattern::parse_skip("schema_version"), None);
    }

    #[test]
    fn database_wildcard_is_not_a_force_pattern() {
        assert_eq!(Pattern::parse_force("STARFOX.*"), None);
    }

    #[test]
    fn blank_tokens_are_dropped() {
        let patterns = parse_skip_pattern_list("STARFOX.ROLE, ,  ,*.schema_version");
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn force_list_drops_database_wildcard_tokens() {
        let patterns = parse_force_pattern_list("OTHER.*,*.schema_version");
        assert_eq!(patterns.len(), 1);
        assert!(matches_any(&patterns, "anydb", "schema_version"));
        assert!(!matches_any(&patterns, "anydb", "unrelated"));
    }

    #[test]
    fn matches_any_short_circuits_on_first_hit() {
        let patterns = parse_skip_pattern_list("OTHER.*,*.schema_version");
        assert!(matches_any(&patterns, "anydb", "schema_version"));
        assert!(!matches_any(&patterns, "anydb", "unrelated"));
    }
}
