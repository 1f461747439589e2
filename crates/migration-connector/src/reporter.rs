use crate::model::{Phase, TableClass};

/// The human-facing side of a run: progress, prompts, and the final
/// summary. Treated as an external collaborator per spec.md §1 ("thin
/// adapters supplying a `Config`, a `Plan`, and a `Reporter`") — the
/// orchestrator and connector only ever see this trait, never a terminal
/// directly.
pub trait Reporter: Send + Sync {
    fn phase_started(&self, database: &str, phase: Phase);

    fn table_classified(&self, database: &str, table: &str, class: &TableClass);

    fn table_completed(&self, database: &str, table: &str, found: u64, inserted: u64, failed: u64);

    fn table_skipped(&self, database: &str, table: &str, reason: &str);

    fn table_failed(&self, database: &str, table: &str, reason: &str);

    fn warning(&self, message: &str);

    /// A yes/no prompt. Returns the user's answer; implementations that
    /// can't prompt (non-interactive CI, tests) should return `false`.
    fn prompt_yes_no(&self, question: &str) -> bool;

    /// A prompt that only succeeds if the user types `expected` exactly
    /// (used for the destructive-ops final confirmation, spec.md §4.10).
    fn prompt_literal(&self, prompt: &str, expected: &str) -> bool;

    fn summary(&self, databases_migrated: usize, tables_completed: usize, tables_failed: usize, tables_skipped: usize);
}

/// A `Reporter` that narrates nothing and declines every prompt. Used by
/// orchestrator unit tests that must not block on stdin and don't care
/// about progress output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn phase_started(&self, _database: &str, _phase: Phase) {}

    fn table_classified(&self, _database: &str, _table: &str, _class: &TableClass) {}

    fn table_completed(&self, _database: &str, _table: &str, _found: u64, _inserted: u64, _failed: u64) {}

    fn table_skipped(&self, _database: &str, _table: &str, _reason: &str) {}

    fn table_failed(&self, _database: &str, _table: &str, _reason: &str) {}

    fn warning(&self, _message: &str) {}

    fn prompt_yes_no(&self, _question: &str) -> bool {
        false
    }

    fn prompt_literal(&self, _prompt: &str, _expected: &str) -> bool {
        false
    }

    fn summary(&self, _databases_migrated: usize, _tables_completed: usize, _tables_failed: usize, _tables_skipped: usize) {}
}
