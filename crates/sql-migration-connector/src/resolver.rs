//! C3 — Relationship Resolver. Depth-first search over a database's
//! combined (explicit ∪ implicit) FK graph, looking for the shortest
//! path by discovery to a table bearing the tenant or user column
//! (spec.md §4.3). Depth is capped (spec.md §9 redesign note); exceeding
//! it is treated as "no chain" and logged.

use migration_connector::model::{ForeignKey, IdKind, RelationshipChain};
use std::collections::{HashMap, HashSet};

pub struct Resolver<'a> {
    /// table name -> outgoing foreign keys, as built by the caller from
    /// `explicit_fks` ∪ inferred edges (explicit wins on a same-column
    /// conflict, per spec.md §4.2).
    fk_map: &'a HashMap<String, Vec<ForeignKey>>,
    tenant_tables: &'a HashSet<String>,
    user_tables: &'a HashSet<String>,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        fk_map: &'a HashMap<String, Vec<ForeignKey>>,
        tenant_tables: &'a HashSet<String>,
        user_tables: &'a HashSet<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            fk_map,
            tenant_tables,
            user_tables,
            max_depth,
        }
    }

    /// Resolve a chain starting at `table`. Returns `None` if no direct
    /// table is reachable within `max_depth` hops, or the table has no
    /// outgoing edges at all.
    ///
    /// The first hop out of `table` is tried as `t0`'s own edge for every
    /// branch explored below it: whichever tenant/user table is found at
    /// the end of the walk, the join back to the table being migrated
    /// always goes through `t0`'s own FK column, not through whichever
    /// edge happened to terminate the walk (spec.md §3).
    pub fn resolve(&self, table: &str) -> Option<RelationshipChain> {
        let mut visited = HashSet::new();
        visited.insert(table.to_ascii_lowercase());

        let edges = self.find_edges(table)?;

        for edge in edges {
            let referenced = &edge.referenced_table;
            let key = referenced.to_ascii_lowercase();
            if visited.contains(&key) {
                continue;
            }

            let root_edge = (edge.column.clone(), edge.referenced_column_or_default().to_string());

            if let Some(id_type) = self.classify(referenced) {
                return Some(RelationshipChain {
                    path: vec![table.to_string(), referenced.clone()],
                    id_type,
                    join_edge: root_edge,
                });
            }

            let mut hop_visited = visited.clone();
            hop_visited.insert(key);
            let mut path = vec![table.to_string(), referenced.clone()];
            if let Some(chain) = self.dfs(referenced, &mut hop_visited, &mut path, &root_edge) {
                return Some(chain);
            }
        }

        None
    }

    fn classify(&self, table: &str) -> Option<IdKind> {
        if contains_ci(self.tenant_tables, table) {
            Some(IdKind::Tenant)
        } else if contains_ci(self.user_tables, table) {
            Some(IdKind::User)
        } else {
            None
        }
    }

    /// Continues the walk past the first hop. `root_edge` is `t0`'s own
    /// edge, carried unchanged through every recursive call so it ends up
    /// in the returned chain regardless of how many further hops it took
    /// to reach a tenant/user table.
    fn dfs(
        &self,
        table: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
        root_edge: &(String, String),
    ) -> Option<RelationshipChain> {
        if path.len() > self.max_depth + 1 {
            return None;
        }

        let edges = self.find_edges(table)?;

        for edge in edges {
            let referenced = &edge.referenced_table;
            let key = referenced.to_ascii_lowercase();
            if visited.contains(&key) {
                continue;
            }

            if let Some(id_type) = self.classify(referenced) {
                let mut full_path = path.clone();
                full_path.push(referenced.clone());

                return Some(RelationshipChain {
                    path: full_path,
                    id_type,
                    join_edge: root_edge.clone(),
                });
            }

            visited.insert(key.clone());
            path.push(referenced.clone());
            if let Some(chain) = self.dfs(referenced, visited, path, root_edge) {
                return Some(chain);
            }
            path.pop();
            visited.remove(&key);
        }

        None
    }

    fn find_edges(&self, table: &str) -> Option<&'a Vec<ForeignKey>> {
        self.fk_map
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, edges)| edges)
    }
}

fn contains_ci(set: &HashSet<String>, needle: &str) -> bool {
    set.iter().any(|s| s.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_connector::model::FkOrigin;

    fn fk(column: &str, referenced_table: &str) -> ForeignKey {
        ForeignKey {
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: None,
            origin: FkOrigin::Implicit,
        }
    }

    #[test]
    fn direct_edge_to_tenant_table_resolves() {
        let mut fk_map = HashMap::new();
        fk_map.insert("ROLE_ACCESS_MAP".to_string(), vec![fk("role_id", "ROLE")]);
        let tenant_tables: HashSet<String> = ["ROLE".to_string()].into();
        let user_tables = HashSet::new();

        let resolver = Resolver::new(&fk_map, &tenant_tables, &user_tables, 8);
        let chain = resolver.resolve("ROLE_ACCESS_MAP").unwrap();

        assert_eq!(chain.path, vec!["ROLE_ACCESS_MAP", "ROLE"]);
        assert_eq!(chain.id_type, IdKind::Tenant);
        assert_eq!(chain.join_edge, ("role_id".to_string(), "id".to_string()));
    }

    #[test]
    fn multi_hop_chain_resolves_through_intermediate_table() {
        let mut fk_map = HashMap::new();
        fk_map.insert("GRANT_LOG".to_string(), vec![fk("access_map_id", "ROLE_ACCESS_MAP")]);
        fk_map.insert("ROLE_ACCESS_MAP".to_string(), vec![fk("role_id", "ROLE")]);
        let tenant_tables: HashSet<String> = ["ROLE".to_string()].into();

        let resolver = Resolver::new(&fk_map, &tenant_tables, &HashSet::new(), 8);
        let chain = resolver.resolve("GRANT_LOG").unwrap();

        assert_eq!(chain.path, vec!["GRANT_LOG", "ROLE_ACCESS_MAP", "ROLE"]);
        assert_eq!(
            chain.join_edge,
            ("access_map_id".to_string(), "id".to_string()),
            "join_edge must be GRANT_LOG's own edge to its immediate parent, not ROLE_ACCESS_MAP's edge to ROLE"
        );
    }

    #[test]
    fn no_path_returns_none() {
        let fk_map = HashMap::new();
        let resolver = Resolver::new(&fk_map, &HashSet::new(), &HashSet::new(), 8);
        assert!(resolver.resolve("ACCESS_RIGHT").is_none());
    }

    #[test]
    fn cycle_does_not_infinite_loop() {
        let mut fk_map = HashMap::new();
        fk_map.insert("A".to_string(), vec![fk("b_id", "B")]);
        fk_map.insert("B".to_string(), vec![fk("a_id", "A")]);

        let resolver = Resolver::new(&fk_map, &HashSet::new(), &HashSet::new(), 8);
        assert!(resolver.resolve("A").is_none());
    }

    #[test]
    fn depth_cap_treats_long_chain_as_unresolved() {
        let mut fk_map = HashMap::new();
        fk_map.insert("T0".to_string(), vec![fk("t1_id", "T1")]);
        fk_map.insert("T1".to_string(), vec![fk("t2_id", "T2")]);
        fk_map.insert("T2".to_string(), vec![fk("tenant_id", "TENANT")]);
        let tenant_tables: HashSet<String> = ["TENANT".to_string()].into();

        let resolver = Resolver::new(&fk_map, &tenant_tables, &HashSet::new(), 1);
        assert!(resolver.resolve("T0").is_none());
    }
}
