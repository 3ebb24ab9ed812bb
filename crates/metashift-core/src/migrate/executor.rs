//! Table-phase execution.
//!
//! The executor derives one [`TableTask`] per table from the record and its
//! inventory snapshot, runs every non-terminal task exactly once per run,
//! and folds the outcomes back into the record. The already-upgraded
//! marker is re-read from the catalog immediately before each task acts:
//! it may have been set by a prior partial run or by an external tool, and
//! a marker-bearing table is terminal success without consuming any work.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::assess::Classifier;
use crate::inventory::{DatabaseSnapshot, ExternalLocations};
use crate::ops::CatalogOps;
use crate::plan::{
    MigrationOp, MigrationRecord, TableStrategy, TableTask, TaskState, UpgradeMessage,
    UpgradeStatus, UpgradeStrategy,
};

/// Outcome of running one table task.
enum TaskOutcome {
    /// Terminal success: migrated now, or marker already present.
    Done,
    /// Not attempted: manual strategy, surfaced for human action.
    Pending,
    /// Attempted and failed; the message joins the record's sequence.
    Failed(UpgradeMessage),
}

/// Derive the run's table tasks from a record and its inventory snapshot.
///
/// A `Mixed` record resolves each table's strategy through the classifier
/// (using the declared external locations persisted at assessment time);
/// any other record strategy applies uniformly, so an editor override of
/// the database strategy governs every table in it. Tables the scanner saw
/// as already upgraded are included: the fresh marker check settles them.
pub(crate) fn derive_tasks(
    record: &MigrationRecord,
    snapshot: &DatabaseSnapshot,
    locations: &ExternalLocations,
) -> Vec<TableTask> {
    let classifier = Classifier::new(locations);
    snapshot
        .tables()
        .map(|object| {
            let strategy = match record.strategy {
                UpgradeStrategy::Mixed => classifier.storage_strategy(object),
                UpgradeStrategy::Manual => TableStrategy::Manual,
                UpgradeStrategy::InPlace => TableStrategy::InPlace,
                UpgradeStrategy::Ctas => TableStrategy::Ctas,
            };
            TableTask::new(object.ident(), object.storage, strategy)
        })
        .collect()
}

/// Run every non-terminal table task and fold the outcomes into the record.
///
/// Tasks fan out across at most `workers` scoped threads; outcomes are
/// merged back in task order, so the record's message sequence is
/// deterministic regardless of interleaving. A single task failure never
/// aborts its siblings.
pub(crate) fn table_phase(
    ops: &dyn CatalogOps,
    record: &mut MigrationRecord,
    tasks: &mut [TableTask],
    workers: usize,
) {
    let outcomes = {
        let shared: &MigrationRecord = record;
        let view: &[TableTask] = tasks;
        run_tasks(ops, shared, view, workers)
    };

    for (task, outcome) in tasks.iter_mut().zip(outcomes) {
        match outcome {
            TaskOutcome::Done => task.state = TaskState::Done,
            TaskOutcome::Pending => task.state = TaskState::Pending,
            TaskOutcome::Failed(message) => {
                task.state = TaskState::Failed;
                record.record_failure(message);
            }
        }
    }
}

fn run_tasks(
    ops: &dyn CatalogOps,
    record: &MigrationRecord,
    tasks: &[TableTask],
    workers: usize,
) -> Vec<TaskOutcome> {
    let workers = workers.clamp(1, tasks.len().max(1));
    if workers <= 1 {
        return tasks
            .iter()
            .map(|task| execute_table(ops, record, task))
            .collect();
    }

    let slots: Mutex<Vec<Option<TaskOutcome>>> =
        Mutex::new((0..tasks.len()).map(|_| None).collect());
    let next = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let idx = next.fetch_add(1, Ordering::SeqCst);
                if idx >= tasks.len() {
                    break;
                }
                let outcome = execute_table(ops, record, &tasks[idx]);
                slots.lock()[idx] = Some(outcome);
            });
        }
    });

    slots
        .into_inner()
        .into_iter()
        .map(|slot| slot.unwrap_or(TaskOutcome::Pending))
        .collect()
}

fn execute_table(ops: &dyn CatalogOps, record: &MigrationRecord, task: &TableTask) -> TaskOutcome {
    let operation = match task.strategy {
        TableStrategy::Manual | TableStrategy::InPlace => MigrationOp::Link,
        TableStrategy::Ctas => MigrationOp::Clone,
    };

    // Fresh marker check: a prior partial run or an external tool may have
    // migrated this table since the plan was assessed. The marker wins
    // over any assigned strategy, including Manual.
    match ops.upgrade_marker(&task.table) {
        Ok(Some(target)) => {
            debug!(table = %task.table, target = %target, "Marker present, skipping");
            return TaskOutcome::Done;
        }
        Ok(None) => {}
        Err(e) if task.strategy == TableStrategy::Manual => {
            // Nothing was going to run for this table anyway; stay
            // unattempted rather than reporting an operation failure.
            warn!(table = %task.table, error = %e, "Marker read failed on manual task");
            return TaskOutcome::Pending;
        }
        Err(e) => {
            warn!(table = %task.table, error = %e, "Marker read failed");
            return TaskOutcome::Failed(UpgradeMessage::new(
                task.table.to_string(),
                operation,
                e.to_string(),
            ));
        }
    }

    if task.strategy == TableStrategy::Manual {
        debug!(table = %task.table, "Manual strategy, not executed");
        return TaskOutcome::Pending;
    }

    let target = record.target_for(&task.table.name);
    let result = match task.strategy {
        TableStrategy::InPlace => ops.link_table(&task.table, &target),
        TableStrategy::Ctas => ops.clone_table(&task.table, &target),
        TableStrategy::Manual => unreachable!("manual tasks never dispatch"),
    };

    // The marker write is part of the commit: a task only counts as done
    // once the durable signal is in place, so a retry re-runs both steps.
    match result.and_then(|()| ops.set_upgrade_marker(&task.table, &target)) {
        Ok(()) => {
            info!(table = %task.table, target = %target, strategy = %task.strategy, "Table migrated");
            TaskOutcome::Done
        }
        Err(e) => {
            warn!(table = %task.table, strategy = %task.strategy, error = %e, "Table migration failed");
            TaskOutcome::Failed(UpgradeMessage::new(
                task.table.to_string(),
                operation,
                e.to_string(),
            ))
        }
    }
}

/// Fold terminal states of all of a record's objects into a run status.
///
/// Complete when everything is terminal success (vacuously for an empty
/// database); Partial when successes coexist with failures or pending
/// work; Failed when something was attempted and nothing succeeded;
/// NotStarted when nothing was ever attempted (all tasks manual or
/// dependency-pending).
pub fn compute_status(states: &[TaskState]) -> UpgradeStatus {
    let done = states.iter().filter(|s| **s == TaskState::Done).count();
    let failed = states.iter().filter(|s| **s == TaskState::Failed).count();
    let pending = states.len() - done - failed;

    if failed == 0 && pending == 0 {
        UpgradeStatus::Complete
    } else if done > 0 {
        UpgradeStatus::Partial
    } else if failed > 0 {
        UpgradeStatus::Failed
    } else {
        UpgradeStatus::NotStarted
    }
}
