//! C4 — Table Classifier. Four-branch decision (spec.md §4.4) layered
//! with the `SKIP_TABLES`/`FORCE_MIGRATE_TABLES` policy overlay
//! (SPEC_FULL.md §5.4): classification is independent of the skip/force
//! lists, which are applied to the resulting `FilterPlan` afterward.

use crate::resolver::Resolver;
use migration_connector::model::{FilterPlan, IdKind, TableClass, TableDescriptor};
use migration_connector::patterns::{matches_any, Pattern};
use std::collections::{HashMap, HashSet};

pub const TENANT_COLUMN: &str = "customer_id";
pub const USER_COLUMN: &str = "user_id";

/// Outcome of classifying one table, before ids are attached. Skip/force
/// decisions are folded straight into a `FilterPlan`-shaped verdict so
/// callers never have to re-derive them.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Migrate under `class`, with `forced` set if a `FORCE_MIGRATE_TABLES`
    /// pattern matched (classification still recorded, but row selection
    /// becomes unconditional — spec.md §4.4).
    Migrate { class: TableClass, forced: bool },
    /// Short-circuited by `SKIP_TABLES`; recorded `skipped` with reason
    /// `env_skip_tables` (spec.md §4.4) and never reaches C5.
    Skip,
}

pub struct Classifier<'a> {
    resolver: &'a Resolver<'a>,
    skip_patterns: &'a [Pattern],
    force_patterns: &'a [Pattern],
}

impl<'a> Classifier<'a> {
    /// `resolver` already holds the tenant/user table sets it needs for
    /// the indirect branch (§C3); the classifier itself only consults
    /// column names directly on `table`.
    pub fn new(resolver: &'a Resolver<'a>, skip_patterns: &'a [Pattern], force_patterns: &'a [Pattern]) -> Self {
        Self {
            resolver,
            skip_patterns,
            force_patterns,
        }
    }

    pub fn classify(&self, table: &TableDescriptor) -> Verdict {
        if matches_any(self.skip_patterns, &table.database, &table.name) {
            return Verdict::Skip;
        }

        let forced = matches_any(self.force_patterns, &table.database, &table.name);

        let class = self.classify_class(table);
        Verdict::Migrate { class, forced }
    }

    fn classify_class(&self, table: &TableDescriptor) -> TableClass {
        if let Some(col) = find_column(table, TENANT_COLUMN) {
            return TableClass::DirectTenant(col);
        }

        if let Some(col) = find_column(table, USER_COLUMN) {
            return TableClass::DirectUser(col);
        }

        if let Some(chain) = self.resolver.resolve(&table.name) {
            return TableClass::Indirect(chain);
        }

        TableClass::Reference
    }
}

fn find_column(table: &TableDescriptor, name: &str) -> Option<String> {
    table.columns.iter().find(|c| c.eq_ignore_ascii_case(name)).cloned()
}

/// Build the concrete `FilterPlan` for a classified table once the caller
/// has the running set of requested customer ids and seed user ids in
/// hand (spec.md §4.5 "Counting").
pub fn build_filter_plan(class: TableClass, customer_ids: &[i64], seed_user_ids: &[i64]) -> FilterPlan {
    let join_edge = match &class {
        TableClass::Indirect(chain) => Some(chain.join_edge.clone()),
        _ => None,
    };

    let ids = match &class {
        TableClass::DirectTenant(_) => customer_ids.to_vec(),
        TableClass::DirectUser(_) => seed_user_ids.to_vec(),
        TableClass::Indirect(chain) => match chain.id_type {
            IdKind::Tenant => customer_ids.to_vec(),
            IdKind::User => seed_user_ids.to_vec(),
        },
        TableClass::Reference => Vec::new(),
    };

    FilterPlan { class, ids, join_edge }
}

/// Every table directly bearing `customer_id`, across the database's
/// already-introspected tables (used to build the resolver's tenant set).
pub fn tenant_table_names(tables: &[TableDescriptor]) -> HashSet<String> {
    tables
        .iter()
        .filter(|t| t.has_column(TENANT_COLUMN))
        .map(|t| t.name.clone())
        .collect()
}

/// Every table directly bearing `user_id` but not `customer_id` — invariant
/// 2 gives tenant precedence, so a table with both never joins the user set
/// (spec.md §3 invariant 2).
pub fn user_table_names(tables: &[TableDescriptor]) -> HashSet<String> {
    tables
        .iter()
        .filter(|t| t.has_column(USER_COLUMN) && !t.has_column(TENANT_COLUMN))
        .map(|t| t.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::model::ForeignKey;

    fn table(name: &str, columns: &[&str]) -> TableDescriptor {
        TableDescriptor {
            database: "STARFOX".to_string(),
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn tenant_column_takes_precedence_over_user_column() {
        let t = table("ROLE", &["id", "customer_id", "user_id"]);
        let tenant_tables = HashSet::new();
        let user_tables = HashSet::new();
        let fk_map = HashMap::new();
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let classifier = Classifier::new(&resolver, &[], &[]);

        match classifier.classify_class(&t) {
            TableClass::DirectTenant(col) => assert_eq!(col, "customer_id"),
            other => panic!("expected DirectTenant, got {other:?}"),
        }
    }

    #[test]
    fn user_only_table_classifies_direct_user() {
        let t = table("PROFILE", &["id", "user_id"]);
        let tenant_tables = HashSet::new();
        let user_tables = HashSet::new();
        let fk_map = HashMap::new();
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let classifier = Classifier::new(&resolver, &[], &[]);

        match classifier.classify_class(&t) {
            TableClass::DirectUser(col) => assert_eq!(col, "user_id"),
            other => panic!("expected DirectUser, got {other:?}"),
        }
    }

    #[test]
    fn no_column_and_no_chain_classifies_reference() {
        let t = table("LOOKUP_CODE", &["id", "code"]);
        let tenant_tables = HashSet::new();
        let user_tables = HashSet::new();
        let fk_map = HashMap::new();
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let classifier = Classifier::new(&resolver, &[], &[]);

        assert!(matches!(classifier.classify_class(&t), TableClass::Reference));
    }

    #[test]
    fn skip_pattern_short_circuits_classification() {
        let t = table("AUDIT_LOG", &["id", "customer_id"]);
        let tenant_tables = HashSet::new();
        let user_tables = HashSet::new();
        let fk_map = HashMap::new();
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let skip = vec![Pattern::parse_skip("STARFOX.AUDIT_LOG").unwrap()];
        let classifier = Classifier::new(&resolver, &skip, &[]);

        assert!(matches!(classifier.classify(&t), Verdict::Skip));
    }

    #[test]
    fn force_pattern_marks_migrate_as_forced_without_changing_class() {
        let t = table("SCHEMA_VERSION", &["version"]);
        let tenant_tables = HashSet::new();
        let user_tables = HashSet::new();
        let fk_map = HashMap::new();
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let force = vec![Pattern::parse_force("*.schema_version").unwrap()];
        let classifier = Classifier::new(&resolver, &[], &force);

        match classifier.classify(&t) {
            Verdict::Migrate { class, forced } => {
                assert!(forced);
                assert!(matches!(class, TableClass::Reference));
            }
            Verdict::Skip => panic!("expected Migrate"),
        }
    }

    #[test]
    fn indirect_table_resolves_through_resolver() {
        let t = table("ROLE_ACCESS_MAP", &["id", "role_id"]);
        let mut fk_map = HashMap::new();
        fk_map.insert(
            "ROLE_ACCESS_MAP".to_string(),
            vec![ForeignKey {
                column: "role_id".to_string(),
                referenced_table: "ROLE".to_string(),
                referenced_column: None,
                origin: migration_connector::model::FkOrigin::Implicit,
            }],
        );
        let tenant_tables: HashSet<String> = ["ROLE".to_string()].into();
        let user_tables = HashSet::new();
        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let classifier = Classifier::new(&resolver, &[], &[]);

        match classifier.classify_class(&t) {
            TableClass::Indirect(chain) => assert_eq!(chain.path, vec!["ROLE_ACCESS_MAP", "ROLE"]),
            other => panic!("expected Indirect, got {other:?}"),
        }
    }
}
