//! C2 — FK Inferencer. Recovers implicit foreign keys from column naming
//! discipline when the source schema omits explicit constraints
//! (spec.md §4.2). Pure function, no I/O, grounded in the same
//! "trailing `_id`" convention the original Python tool's table naming
//! assumes (`examples/original_source/migrate_customer_data_v3.py`
//! docstring: "ROLE_ACCESS_MAP(role_id) ... implicit via column naming
//! patterns (tablename_id, tablenameId)").

use migration_connector::model::{FkOrigin, ForeignKey};

/// Columns that look like foreign keys by suffix but never are.
const RESERVED_COLUMNS: &[&str] = &["id", "created_by", "updated_by", "created_at", "updated_at"];

/// Strip a trailing `_id` or `Id` (case-insensitive) to produce the stem
/// used to search the table universe. Returns `None` if the column has
/// neither suffix or is in the reserved set.
pub fn stem(column: &str) -> Option<String> {
    if RESERVED_COLUMNS.iter().any(|r| r.eq_ignore_ascii_case(column)) {
        return None;
    }

    if let Some(prefix) = strip_suffix_ignore_ascii_case(column, "_id") {
        if !prefix.is_empty() {
            return Some(prefix.to_string());
        }
    }

    if let Some(prefix) = strip_suffix_ignore_ascii_case(column, "Id") {
        if !prefix.is_empty() {
            return Some(prefix.to_string());
        }
    }

    None
}

fn strip_suffix_ignore_ascii_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() < suffix.len() {
        return None;
    }
    let (head, tail) = s.split_at(s.len() - suffix.len());
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Try to resolve `stem` against `tables` (case-insensitive), trying
/// `{stem, stem+"s", stem minus trailing "s"}` in that order, returning
/// the first table name that matches.
fn resolve_stem<'a>(stem: &str, tables: &'a [String]) -> Option<&'a str> {
    let plural = format!("{stem}s");
    let singular = stem.strip_suffix('s').unwrap_or(stem);

    for candidate in [stem, plural.as_str(), singular] {
        if let Some(found) = tables.iter().find(|t| t.eq_ignore_ascii_case(candidate)) {
            return Some(found.as_str());
        }
    }

    None
}

/// Infer an implicit foreign key for `column` against the table
/// universe of one database. `referenced_column` is left `None`;
/// callers default it to `id` at use time (spec.md §3).
pub fn infer(column: &str, tables: &[String]) -> Option<ForeignKey> {
    let stem = stem(column)?;
    let referenced_table = resolve_stem(&stem, tables)?;

    Some(ForeignKey {
        column: column.to_string(),
        referenced_table: referenced_table.to_string(),
        referenced_column: None,
        origin: FkOrigin::Implicit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reserved_columns_never_infer() {
        for col in ["id", "created_by", "UPDATED_BY", "created_at", "updated_at"] {
            assert!(infer(col, &tables(&["role"])).is_none(), "{col} should be reserved");
        }
    }

    #[test]
    fn snake_case_suffix_resolves_plural_table() {
        let fk = infer("role_id", &tables(&["ROLE", "roles"])).unwrap();
        // "role" is tried before "roles"; ROLE matches case-insensitively first.
        assert_eq!(fk.referenced_table, "ROLE");
        assert_eq!(fk.referenced_column, None);
    }

    #[test]
    fn camel_case_suffix_is_recognized() {
        let fk = infer("roleId", &tables(&["roles"])).unwrap();
        assert_eq!(fk.referenced_table, "roles");
    }

    #[test]
    fn singular_stem_falls_back_from_plural_table() {
        let fk = infer("customer_id", &tables(&["customers"])).unwrap();
        assert_eq!(fk.referenced_table, "customers");
    }

    #[test]
    fn no_matching_table_yields_none() {
        assert!(infer("widget_id", &tables(&["role"])).is_none());
    }

    #[test]
    fn bare_id_suffix_with_empty_stem_is_not_inferred() {
        assert!(infer("_id", &tables(&["role"])).is_none());
    }
}
