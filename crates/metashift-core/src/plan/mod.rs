//! Migration plan: the durable per-database records and their store.
//!
//! A [`MigrationRecord`] is the unit of planning: one row per source
//! database carrying the assigned upgrade strategy, the target container,
//! the run status, and the recorded object-level failures. Records are
//! created by the classifier, hand-tuned through the bounded editor surface,
//! driven by the executor, and survive across runs in the [`PlanStore`].
//!
//! Per-table work items ([`TableTask`]) are derived from a record plus its
//! inventory snapshot at the start of each run; they are not persisted. The
//! durable per-table signal is the already-upgraded marker on the source
//! object itself.

pub mod record;
pub mod store;
pub mod task;

pub use record::{
    MigrationOp, MigrationRecord, UpgradeMessage, UpgradeStatus, UpgradeStrategy,
    DEFAULT_TARGET_CATALOG,
};
pub use store::PlanStore;
pub use task::{TableStrategy, TableTask, TaskState};
