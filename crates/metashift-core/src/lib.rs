//! metashift core - migration state machine, plan store, and classifier.
//!
//! This crate drives a multi-run, resumable migration of tables and views
//! from a legacy metastore into a next-generation catalog. It owns the
//! durable migration plan, the strategy classifier, and the idempotent
//! execution engine; the actual DDL/copy work is delegated to a
//! [`CatalogOps`] capability supplied by the embedder.

pub mod assess;
mod clock;
pub mod error;
pub mod inventory;
pub mod migrate;
pub mod ops;
pub mod plan;
pub mod report;

pub use assess::{Classification, Classifier, DatabaseAssessment};
pub use error::Error;
pub use inventory::{
    DatabaseSnapshot, ExternalLocations, ObjectIdent, ObjectKind, ObjectMeta, StorageKind,
    TargetIdent,
};
pub use migrate::{
    DatabaseRunReport, MigrationRunner, RunConfig, RunReport, SimulationOutcome,
};
pub use ops::{CatalogOps, MemoryCatalog, OpsError};
pub use plan::{
    MigrationOp, MigrationRecord, PlanStore, TableStrategy, TableTask, TaskState, UpgradeMessage,
    UpgradeStatus, UpgradeStrategy,
};
pub use report::{DatabaseProgress, PlanReport};
