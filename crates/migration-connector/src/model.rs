use std::collections::BTreeMap;

/// A MariaDB/MySQL server this run talks to. Two live in a [`crate::Config`]:
/// `source` (read-only) and `destination` (read-write).
#[derive(Debug, Clone)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub charset: String,
}

impl ServerEndpoint {
    pub fn connection_url(&self, database: Option<&str>) -> String {
        let db = database.unwrap_or_default();
        format!(
            "mysql://{user}:{password}@{host}:{port}/{db}?charset={charset}",
            user = self.user,
            password = self.password,
            host = self.host,
            port = self.port,
            db = db,
            charset = self.charset,
        )
    }
}

/// The set of schema names MariaDB/MySQL ships with. Never migrated, never
/// listed as a candidate database.
pub const SYSTEM_DATABASES: &[&str] = &["information_schema", "performance_schema", "mysql", "sys"];

pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.iter().any(|sys| sys.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Procedure,
    Function,
}

#[derive(Debug, Clone)]
pub struct RoutineDescriptor {
    pub name: String,
    pub kind: RoutineKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FkOrigin {
    Explicit,
    Implicit,
}

/// A foreign key edge discovered either in `KEY_COLUMN_USAGE` (explicit) or
/// by naming-pattern inference (implicit, §C2). `referenced_column` is
/// `None` for implicit edges until resolved, at which point callers default
/// it to the literal `id` (spec.md §3, `ForeignKey` invariant).
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: Option<String>,
    pub origin: FkOrigin,
}

impl ForeignKey {
    /// The column joined against on the referenced side, defaulting to `id`
    /// for implicit edges per spec.md §3/§9 (an implementer should warn when
    /// the target lacks a literal `id` column; see `RelationshipChain`
    /// resolution in `sql-migration-connector`).
    pub fn referenced_column_or_default(&self) -> &str {
        self.referenced_column.as_deref().unwrap_or("id")
    }
}

/// A table as discovered on one server. Column order is preserved (it
/// drives the `INSERT` column list in C5); name comparisons elsewhere in
/// the toolkit go through `eq_ignore_ascii_case`, never raw `==`.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub database: String,
    pub name: String,
    pub columns: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDescriptor {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseDescriptor {
    pub name: String,
    pub tables: Vec<TableDescriptor>,
    pub routines: Vec<RoutineDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Tenant,
    User,
}

/// An ordered path `[t0, t1, ..., tn]` from the table under classification
/// (`t0`) to a table directly bearing the tenant/user column (`tn`), found
/// by the DFS in C3. `join_edge` is the immediate `(column, referenced_column)`
/// pair used to JOIN `t0` to `t1`.
#[derive(Debug, Clone)]
pub struct RelationshipChain {
    pub path: Vec<String>,
    pub id_type: IdKind,
    pub join_edge: (String, String),
}

impl RelationshipChain {
    pub fn parent_table(&self) -> &str {
        self.path.get(1).map(String::as_str).unwrap_or(self.path[0].as_str())
    }
}

#[derive(Debug, Clone)]
pub enum TableClass {
    DirectTenant(String),
    DirectUser(String),
    Indirect(RelationshipChain),
    Reference,
}

impl TableClass {
    pub fn label(&self) -> &'static str {
        match self {
            TableClass::DirectTenant(_) => "DirectTenant",
            TableClass::DirectUser(_) => "DirectUser",
            TableClass::Indirect(_) => "Indirect",
            TableClass::Reference => "Reference",
        }
    }
}

/// The per-table plan that deterministically produces a WHERE clause
/// (direct), a JOIN+WHERE (indirect), or no filter (reference). §C4/§C5.
#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub class: TableClass,
    pub ids: Vec<i64>,
    pub join_edge: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Routines,
    DirectTenant,
    DirectUser,
    Indirect,
    Reference,
}

impl Phase {
    pub fn tag(&self) -> &'static str {
        match self {
            Phase::Routines => "P0",
            Phase::DirectTenant => "P1",
            Phase::DirectUser => "P1B",
            Phase::Indirect => "P1C",
            Phase::Reference => "P2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Completed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TableStatusEntry {
    pub status: Status,
    #[serde(default)]
    pub rows: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutineType {
    Procedure,
    Function,
}

impl From<RoutineKind> for RoutineType {
    fn from(kind: RoutineKind) -> Self {
        match kind {
            RoutineKind::Procedure => RoutineType::Procedure,
            RoutineKind::Function => RoutineType::Function,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RoutineStatusEntry {
    #[serde(rename = "type")]
    pub kind: RoutineType,
    pub status: Status,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DatabaseState {
    #[serde(default)]
    pub tables: BTreeMap<String, TableStatusEntry>,
    #[serde(default)]
    pub routines: BTreeMap<String, RoutineStatusEntry>,
}

/// Durable, per-run checkpoint keyed by the sorted customer-id set (§C8).
/// Loaded once at run start, flushed after every table/routine transition.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MigrationState {
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseState>,
}

impl MigrationState {
    pub fn table_status(&self, database: &str, table: &str) -> Option<&TableStatusEntry> {
        self.databases.get(database)?.tables.get(table)
    }

    pub fn routine_status(&self, database: &str, routine: &str) -> Option<&RoutineStatusEntry> {
        self.databases.get(database)?.routines.get(routine)
    }
}

/// Deterministic key for a [`MigrationState`] file: the customer ids,
/// sorted and deduplicated, joined by `-`. Two runs over the same set of
/// ids, in any order, share one checkpoint file.
pub fn state_key(customer_ids: &[i64]) -> String {
    let mut ids = customer_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.iter().map(i64::to_string).collect::<Vec<_>>().join("-")
    }
}
