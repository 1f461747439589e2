use crate::model::ServerEndpoint;
use crate::patterns::Pattern;
use std::path::PathBuf;

/// Immutable, gathered-once-at-startup configuration (spec.md §9 design
/// note: "should be gathered into a single immutable configuration value
/// at startup and threaded through, not read at arbitrary call sites").
#[derive(Debug, Clone)]
pub struct Config {
    pub source: ServerEndpoint,
    pub destination: ServerEndpoint,
    pub auto_confirm_threshold: u64,
    pub seed_user_ids: Vec<i64>,
    pub force_migrate_tables: Vec<Pattern>,
    pub skip_tables: Vec<Pattern>,
    pub state_dir: PathBuf,
    pub skip_large_tables: bool,
    pub batch_size: u64,
    pub max_chain_depth: usize,
}

impl Config {
    pub const DEFAULT_AUTO_CONFIRM_THRESHOLD: u64 = 400;
    pub const DEFAULT_BATCH_SIZE: u64 = 1000;
    pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 8;
    pub const DEFAULT_SEED_USER_IDS: &'static [i64] = &[1, 2];
    pub const DEFAULT_FORCE_MIGRATE_TABLES: &'static str = "*.schema_version,*.flyway_schema_history";
    pub const DEFAULT_STATE_DIR: &'static str = ".migration_state";
}
