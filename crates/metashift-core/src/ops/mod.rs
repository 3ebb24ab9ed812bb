//! Catalog capability: the DDL/copy surface the executor invokes.
//!
//! The core never implements DDL or data copy itself; it drives a
//! [`CatalogOps`] implementation supplied by the embedder. [`MemoryCatalog`]
//! is the in-memory implementation used by tests and simulation runs.

pub mod memory;

pub use memory::MemoryCatalog;

use thiserror::Error;

use crate::inventory::{ObjectIdent, TargetIdent};

/// Errors reported by a catalog capability.
///
/// The executor treats every variant uniformly: the failing object is
/// recorded on the plan record and its siblings continue.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The source object the operation targeted does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The target container the operation needed does not exist.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The operation ran and failed or was rejected.
    #[error("operation failed: {0}")]
    Failed(String),

    /// The operation exceeded the implementation's time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// The DDL/copy capability of the underlying engine.
///
/// Contract notes for implementations:
/// - `ensure_catalog`/`ensure_database` are idempotent: creating an
///   already-existing container is a no-op, not an error.
/// - The upgrade marker is a durable property on the source object's own
///   metadata, carrying the fully-qualified target identity. It must be
///   readable by external tools independently of this system's storage.
/// - Timeouts are the implementation's concern; a timed-out operation is
///   reported like any other failure.
pub trait CatalogOps: Send + Sync {
    /// Ensure the target catalog exists.
    fn ensure_catalog(&self, catalog: &str) -> Result<(), OpsError>;

    /// Ensure the target database exists within its catalog.
    fn ensure_database(&self, catalog: &str, database: &str) -> Result<(), OpsError>;

    /// Read the already-upgraded marker of a source object.
    fn upgrade_marker(&self, object: &ObjectIdent) -> Result<Option<TargetIdent>, OpsError>;

    /// Write the already-upgraded marker on a source object.
    fn set_upgrade_marker(
        &self,
        object: &ObjectIdent,
        target: &TargetIdent,
    ) -> Result<(), OpsError>;

    /// Make existing storage visible under the target identity without
    /// copying data.
    fn link_table(&self, source: &ObjectIdent, target: &TargetIdent) -> Result<(), OpsError>;

    /// Copy table data into target-managed storage.
    fn clone_table(&self, source: &ObjectIdent, target: &TargetIdent) -> Result<(), OpsError>;

    /// Create a view under the target container from a rewritten definition.
    fn create_view(&self, target: &TargetIdent, definition: &str) -> Result<(), OpsError>;
}
