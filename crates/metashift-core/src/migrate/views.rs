//! View-phase execution.
//!
//! Views reference other objects (their two-level references) and may only
//! be re-created under the target container once every referenced object
//! has finished migrating. Readiness is a predicate per view, not a
//! hard-coded phase: a referenced object is ready iff its already-upgraded
//! marker is set, which works across databases, across runs, and for
//! markers written by external tools. The marker value is the migrated
//! target identity, which is exactly what the definition rewrite
//! substitutes for the source reference.

use tracing::{debug, info, warn};

use crate::inventory::{ObjectIdent, ObjectMeta, TargetIdent};
use crate::ops::CatalogOps;
use crate::plan::{MigrationOp, MigrationRecord, TaskState, UpgradeMessage};

/// One view's work item within a database run.
#[derive(Debug, Clone)]
pub(crate) struct ViewTask {
    /// Source view identifier.
    pub view: ObjectIdent,
    /// Stored definition text from the scanner.
    pub definition: String,
    /// Objects the definition references.
    pub references: Vec<ObjectIdent>,
    /// Current state within the run.
    pub state: TaskState,
}

/// Why a pending view could not be migrated in this pass.
enum Hold {
    /// At least one referenced object has no marker yet. Not a failure.
    DependencyNotReady,
    /// The view was attempted (or its readiness probe errored) and failed.
    Failed(UpgradeMessage),
}

/// Derive the run's view tasks from an inventory snapshot.
pub(crate) fn derive_view_tasks<'a>(
    views: impl Iterator<Item = &'a ObjectMeta>,
) -> Vec<ViewTask> {
    views
        .map(|object| ViewTask {
            view: object.ident(),
            definition: object.definition.clone().unwrap_or_default(),
            references: object.references.clone(),
            state: TaskState::Pending,
        })
        .collect()
}

/// Run the view phase for one record, after its table phase barrier.
///
/// Eligible views are migrated and the eligible set is re-evaluated until
/// it stops growing, so a view defined over another view resolves within
/// one run as soon as its chain of dependencies does. Views held back only
/// by unready dependencies stay pending with nothing recorded; they are
/// retried on the next run.
pub(crate) fn view_phase(
    ops: &dyn CatalogOps,
    record: &mut MigrationRecord,
    tasks: &mut [ViewTask],
) {
    loop {
        let mut progressed = false;
        for idx in 0..tasks.len() {
            if tasks[idx].state != TaskState::Pending {
                continue;
            }
            match execute_view(ops, record, &tasks[idx]) {
                Ok(()) => {
                    tasks[idx].state = TaskState::Done;
                    progressed = true;
                }
                Err(Hold::DependencyNotReady) => {
                    debug!(view = %tasks[idx].view, "View dependencies not ready, staying pending");
                }
                Err(Hold::Failed(message)) => {
                    tasks[idx].state = TaskState::Failed;
                    record.record_failure(message);
                }
            }
        }
        if !progressed {
            break;
        }
    }
}

fn execute_view(
    ops: &dyn CatalogOps,
    record: &MigrationRecord,
    task: &ViewTask,
) -> Result<(), Hold> {
    let fail = |cause: String| {
        Hold::Failed(UpgradeMessage::new(
            task.view.to_string(),
            MigrationOp::ViewCreate,
            cause,
        ))
    };

    // Fresh marker check on the view itself.
    match ops.upgrade_marker(&task.view) {
        Ok(Some(_)) => return Ok(()),
        Ok(None) => {}
        Err(e) => return Err(fail(e.to_string())),
    }

    // Readiness predicate: every referenced object must carry a marker.
    let mut substitutions: Vec<(ObjectIdent, TargetIdent)> =
        Vec::with_capacity(task.references.len());
    for reference in &task.references {
        match ops.upgrade_marker(reference) {
            Ok(Some(target)) => substitutions.push((reference.clone(), target)),
            Ok(None) => return Err(Hold::DependencyNotReady),
            Err(e) => return Err(fail(e.to_string())),
        }
    }

    let definition = rewrite_definition(&task.definition, &substitutions);
    let target = record.target_for(&task.view.name);

    match ops
        .create_view(&target, &definition)
        .and_then(|()| ops.set_upgrade_marker(&task.view, &target))
    {
        Ok(()) => {
            info!(view = %task.view, target = %target, "View migrated");
            Ok(())
        }
        Err(e) => {
            warn!(view = %task.view, error = %e, "View migration failed");
            Err(fail(e.to_string()))
        }
    }
}

/// Rewrite a view definition so each source reference names its migrated
/// target identity.
///
/// Plain identifier substitution over the scanner-provided references; no
/// SQL parsing. The definition is walked in a single left-to-right pass:
/// at each position the longest matching source identifier wins and the
/// scan advances past the emitted target, so substituted text is never
/// re-matched (`sales.orders` must not match inside an already-emitted
/// `main.sales.orders_audit`).
pub(crate) fn rewrite_definition(
    definition: &str,
    substitutions: &[(ObjectIdent, TargetIdent)],
) -> String {
    let mut ordered: Vec<(String, String)> = substitutions
        .iter()
        .map(|(source, target)| (source.to_string(), target.to_string()))
        .collect();
    ordered.sort_by_key(|(source, _)| std::cmp::Reverse(source.len()));

    let mut rewritten = String::with_capacity(definition.len());
    let mut rest = definition;
    while let Some(next) = rest.chars().next() {
        match ordered
            .iter()
            .find(|(source, _)| rest.starts_with(source.as_str()))
        {
            Some((source, target)) => {
                rewritten.push_str(target);
                rest = &rest[source.len()..];
            }
            None => {
                rewritten.push(next);
                rest = &rest[next.len_utf8()..];
            }
        }
    }
    rewritten
}
