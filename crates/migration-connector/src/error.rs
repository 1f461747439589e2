//! Error taxonomy (spec.md §7). `ConfigError` and `ConnectionError` are
//! the only terminal variants; everything else is recorded against a
//! table/routine/step and the run continues (spec.md §7 "Propagation
//! policy").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingValue(&'static str),
    #[error("malformed customer id list: {0}")]
    MalformedIdList(String),
    #[error("malformed pattern list: {0}")]
    MalformedPatternList(String),
}

#[derive(Debug, Error, Clone)]
pub enum ConnectionError {
    #[error("failed to connect to {endpoint} ({role}): {reason}")]
    ConnectFailed {
        role: &'static str,
        endpoint: String,
        reason: String,
    },
    #[error("transport error talking to {role}: {reason}")]
    Transport { role: &'static str, reason: String },
}

/// A per-table introspection failure (e.g. `DESCRIBE` fails for one
/// table). Never fatal: the table is classified `Reference` and the run
/// continues (spec.md §7 item 3).
#[derive(Debug, Error, Clone)]
#[error("could not introspect {database}.{table}: {reason}")]
pub struct IntrospectionWarning {
    pub database: String,
    pub table: String,
    pub reason: String,
}

/// A per-row `INSERT IGNORE` failure. Counted in `failed`; the first
/// three per table are surfaced verbatim, the rest suppressed
/// (spec.md §4.5, §7 item 4).
#[derive(Debug, Error, Clone)]
#[error("insert conflict in {database}.{table}: {reason}")]
pub struct InsertConflict {
    pub database: String,
    pub table: String,
    pub reason: String,
}

/// A CREATE/ALTER/DELETE exception scoped to one table. The table is
/// recorded `failed(reason)`; the phase continues (spec.md §7 item 5).
#[derive(Debug, Error, Clone)]
#[error("operation failed on {database}.{table}: {reason}")]
pub struct TableError {
    pub database: String,
    pub table: String,
    pub reason: String,
}

/// Explicit user cancellation from any destructive confirmation prompt.
/// Propagates as a non-error "stop here" signal; the process still exits
/// 0 (spec.md §7 item 6).
#[derive(Debug, Error, Clone, Copy)]
#[error("operation cancelled by user")]
pub struct DestructiveAbort;

/// SIGINT received mid-run. Cleanup runs, then the process exits 1
/// (spec.md §7 item 7).
#[derive(Debug, Error, Clone, Copy)]
#[error("interrupted")]
pub struct Interrupt;

/// The orchestrator-level error type. Only `Config` and `Connection`
/// variants are terminal for the whole run; the others are used to
/// thread structured context up from a component while the orchestrator
/// itself keeps going (spec.md §7 "Propagation policy").
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Aborted(#[from] DestructiveAbort),
    #[error(transparent)]
    Interrupted(#[from] Interrupt),
    #[error("{0}")]
    Other(String),
}
