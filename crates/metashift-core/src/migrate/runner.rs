//! Run orchestration across databases.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::executor::{compute_status, derive_tasks, table_phase};
use super::provision::ensure_targets;
use super::views::{derive_view_tasks, view_phase};
use crate::error::Error;
use crate::ops::CatalogOps;
use crate::plan::{
    MigrationOp, MigrationRecord, PlanStore, TaskState, UpgradeMessage, UpgradeStatus,
};

/// Worker configuration for a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// How many databases to process in parallel.
    pub database_workers: usize,
    /// How many tables to migrate in parallel within one database.
    pub table_workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            database_workers: 4,
            table_workers: 4,
        }
    }
}

/// Per-database outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseRunReport {
    /// Source database name.
    pub database: String,
    /// Status after the run.
    pub status: UpgradeStatus,
    /// Tables that reached terminal success (including marker skips).
    pub tables_done: usize,
    /// Tables that failed in this run.
    pub tables_failed: usize,
    /// Tables not attempted (manual strategy).
    pub tables_pending: usize,
    /// Views that reached terminal success.
    pub views_done: usize,
    /// Views that failed in this run.
    pub views_failed: usize,
    /// Views still waiting on unready dependencies.
    pub views_pending: usize,
    /// Whether target provisioning failed, aborting the database's run.
    pub provision_failed: bool,
}

impl DatabaseRunReport {
    fn skipped(record: &MigrationRecord) -> Self {
        Self {
            database: record.database.clone(),
            status: record.status,
            tables_done: 0,
            tables_failed: 0,
            tables_pending: 0,
            views_done: 0,
            views_failed: 0,
            views_pending: 0,
            provision_failed: false,
        }
    }
}

/// Merged outcome of one run across all processed databases.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Per-database outcomes, ordered by database name.
    pub databases: Vec<DatabaseRunReport>,
}

impl RunReport {
    /// Databases that ended the run with the given status.
    pub fn count_with_status(&self, status: UpgradeStatus) -> usize {
        self.databases.iter().filter(|d| d.status == status).count()
    }

    /// Whether every processed database completed.
    pub fn all_complete(&self) -> bool {
        self.databases
            .iter()
            .all(|d| d.status == UpgradeStatus::Complete)
    }
}

/// Drives one run of the migration state machine over a plan store.
///
/// Databases are independent units of work and are partitioned across
/// worker threads; each record is exclusively owned by one worker for the
/// duration of the run, so `status` and `messages` never see concurrent
/// writers. Within one database the pipeline is strict: provision, table
/// phase (with optional fan-out), barrier, view phase, status, save.
pub struct MigrationRunner<'a> {
    store: &'a PlanStore,
    ops: &'a dyn CatalogOps,
    config: RunConfig,
}

impl<'a> MigrationRunner<'a> {
    /// Create a runner over a plan store and a catalog capability.
    pub fn new(store: &'a PlanStore, ops: &'a dyn CatalogOps, config: RunConfig) -> Self {
        Self { store, ops, config }
    }

    /// Run the state machine over every non-complete record.
    ///
    /// Complete records are no-ops and are reported unchanged. Only plan
    /// store infrastructure errors escalate; everything object-level is
    /// contained in the records.
    #[instrument(skip(self))]
    pub fn run(&self) -> Result<RunReport, Error> {
        let records = self.store.list_records()?;
        let names: Vec<String> = records.into_iter().map(|r| r.database).collect();
        info!(databases = names.len(), "Starting migration run");

        let workers = self.config.database_workers.clamp(1, names.len().max(1));
        let reports = if workers <= 1 {
            let mut reports = Vec::with_capacity(names.len());
            for name in &names {
                reports.push(self.run_database(name)?);
            }
            reports
        } else {
            self.run_parallel(&names, workers)?
        };

        let mut databases = reports;
        databases.sort_by(|a, b| a.database.cmp(&b.database));
        Ok(RunReport { databases })
    }

    fn run_parallel(
        &self,
        names: &[String],
        workers: usize,
    ) -> Result<Vec<DatabaseRunReport>, Error> {
        let slots: Mutex<Vec<Option<Result<DatabaseRunReport, Error>>>> =
            Mutex::new((0..names.len()).map(|_| None).collect());
        let next = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    if idx >= names.len() {
                        break;
                    }
                    let outcome = self.run_database(&names[idx]);
                    slots.lock()[idx] = Some(outcome);
                });
            }
        });

        let mut reports = Vec::with_capacity(names.len());
        for (idx, slot) in slots.into_inner().into_iter().enumerate() {
            match slot {
                Some(outcome) => reports.push(outcome?),
                None => {
                    return Err(Error::Worker(format!(
                        "no outcome recorded for database {}",
                        names[idx]
                    )))
                }
            }
        }
        Ok(reports)
    }

    /// Run the state machine for a single database.
    #[instrument(skip(self))]
    pub fn run_database(&self, database: &str) -> Result<DatabaseRunReport, Error> {
        let mut record = self.store.require_record(database)?;
        if record.is_complete() {
            info!(database = %database, "Record already complete, nothing to do");
            return Ok(DatabaseRunReport::skipped(&record));
        }

        let snapshot = self.store.require_snapshot(database)?;
        let locations = self.store.load_locations()?;

        // Provisioning failure is fatal for this database's run: no table
        // or view work proceeds, other databases are unaffected.
        if let Err(e) = ensure_targets(self.ops, &record) {
            let container = format!("{}.{}", record.target_catalog, record.target_database);
            record.record_failure(UpgradeMessage::new(
                container,
                MigrationOp::Provision,
                e.to_string(),
            ));
            record.set_status(UpgradeStatus::Failed);
            self.store.save_record(&record)?;
            let mut report = DatabaseRunReport::skipped(&record);
            report.provision_failed = true;
            return Ok(report);
        }

        let mut tasks = derive_tasks(&record, &snapshot, &locations);
        table_phase(self.ops, &mut record, &mut tasks, self.config.table_workers);

        // Phase barrier: every table task is terminal (or pending-manual)
        // before any view work starts.
        let mut view_tasks = derive_view_tasks(snapshot.views());
        if record.has_views {
            view_phase(self.ops, &mut record, &mut view_tasks);
        }

        let states: Vec<TaskState> = tasks
            .iter()
            .map(|t| t.state)
            .chain(view_tasks.iter().map(|t| t.state))
            .collect();
        record.set_status(compute_status(&states));
        self.store.save_record(&record)?;

        let report = DatabaseRunReport {
            database: record.database.clone(),
            status: record.status,
            tables_done: count(&tasks, TaskState::Done, |t| t.state),
            tables_failed: count(&tasks, TaskState::Failed, |t| t.state),
            tables_pending: count(&tasks, TaskState::Pending, |t| t.state),
            views_done: count(&view_tasks, TaskState::Done, |t| t.state),
            views_failed: count(&view_tasks, TaskState::Failed, |t| t.state),
            views_pending: count(&view_tasks, TaskState::Pending, |t| t.state),
            provision_failed: false,
        };
        info!(
            database = %report.database,
            status = %report.status,
            tables_done = report.tables_done,
            tables_failed = report.tables_failed,
            views_done = report.views_done,
            "Database run finished"
        );
        if report.tables_failed > 0 || report.views_failed > 0 {
            warn!(
                database = %report.database,
                messages = record.messages.len(),
                "Run recorded object failures"
            );
        }
        Ok(report)
    }
}

fn count<T>(items: &[T], state: TaskState, by: impl Fn(&T) -> TaskState) -> usize {
    items.iter().filter(|item| by(item) == state).count()
}
