//! Derived per-table work items.

use std::fmt;

use crate::inventory::{ObjectIdent, StorageKind};

/// Per-table upgrade strategy.
///
/// Unlike the database-level [`UpgradeStrategy`](crate::plan::UpgradeStrategy),
/// a single table is never `Mixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    /// Human decision required; never executed automatically.
    Manual,
    /// Link existing storage under the target identity.
    InPlace,
    /// Copy data into target-managed storage.
    Ctas,
}

impl fmt::Display for TableStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStrategy::Manual => write!(f, "manual"),
            TableStrategy::InPlace => write!(f, "in-place"),
            TableStrategy::Ctas => write!(f, "ctas"),
        }
    }
}

/// Execution state of a task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not attempted: manual tasks, or views whose dependencies are not
    /// ready yet.
    Pending,
    /// Terminal success: migrated, or already carrying the upgrade marker.
    Done,
    /// Attempted in this run and failed.
    Failed,
}

impl TaskState {
    /// Whether this state is terminal success.
    pub fn is_terminal_success(self) -> bool {
        self == TaskState::Done
    }
}

/// One table's work item within a database run.
///
/// Derived at run start from the record and its inventory snapshot, never
/// persisted. The identifier's database component is the back-reference to
/// the owning record; the durable per-table signal is the upgrade marker on
/// the source object itself.
#[derive(Debug, Clone)]
pub struct TableTask {
    /// Source table identifier.
    pub table: ObjectIdent,
    /// Storage backing reported by the scanner.
    pub storage: StorageKind,
    /// Strategy assigned by the classifier.
    pub strategy: TableStrategy,
    /// Current state within the run.
    pub state: TaskState,
}

impl TableTask {
    /// Create a pending task.
    pub fn new(table: ObjectIdent, storage: StorageKind, strategy: TableStrategy) -> Self {
        Self {
            table,
            storage,
            strategy,
            state: TaskState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_success() {
        assert!(TaskState::Done.is_terminal_success());
        assert!(!TaskState::Pending.is_terminal_success());
        assert!(!TaskState::Failed.is_terminal_success());
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = TableTask::new(
            ObjectIdent::new("sales", "orders"),
            StorageKind::Managed,
            TableStrategy::Ctas,
        );
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.strategy.to_string(), "ctas");
    }
}
