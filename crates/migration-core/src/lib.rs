//! Orchestration and durable state for the customer-scoped migration
//! run: phase sequencing (C9) and the on-disk checkpoint (C8). Built on
//! `sql-migration-connector`'s components; holds no SQL of its own
//! beyond the `FOREIGN_KEY_CHECKS` toggle.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{Orchestrator, RunSummary};
pub use state::StateStore;
