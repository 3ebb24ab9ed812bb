//! What-if simulation runs.
//!
//! A simulation executes the full state machine (provision, table phase,
//! barrier, view phase) against an in-memory catalog seeded from the
//! inventory snapshots, using a throwaway copy of the plan. Real plan
//! state and real metadata are never touched, so a hand-tuned plan can be
//! validated before the engine is pointed at live metadata.

use tracing::info;

use super::runner::{MigrationRunner, RunConfig, RunReport};
use crate::error::Error;
use crate::ops::{CatalogOps, MemoryCatalog};
use crate::plan::PlanStore;
use crate::report::PlanReport;

/// Result of a simulation run.
#[derive(Debug)]
pub struct SimulationOutcome {
    /// Merged run outcome across the simulated databases.
    pub run: RunReport,
    /// Plan projection of the throwaway store after the run.
    pub plan: PlanReport,
}

/// Execute a simulated run against a copy of the given plan.
///
/// Objects the scanner saw as already upgraded are seeded with markers, so
/// the simulation honors the same idempotency anchor as a real run. The
/// source store is read, never written.
pub fn simulate_run(store: &PlanStore, config: RunConfig) -> Result<SimulationOutcome, Error> {
    let scratch = PlanStore::open_temporary()?;
    let catalog = MemoryCatalog::new();

    scratch.save_locations(&store.load_locations()?)?;
    let records = store.list_records()?;
    info!(databases = records.len(), "Starting simulation run");

    for record in &records {
        scratch.save_record(record)?;
        let snapshot = store.require_snapshot(&record.database)?;
        for object in &snapshot.objects {
            if object.upgraded {
                let ident = object.ident();
                let target = record.target_for(&object.name);
                catalog
                    .set_upgrade_marker(&ident, &target)
                    .map_err(|e| Error::Worker(e.to_string()))?;
            }
        }
        scratch.save_snapshot(&snapshot)?;
    }

    let runner = MigrationRunner::new(&scratch, &catalog, config);
    let run = runner.run()?;
    let plan = PlanReport::project(&scratch)?;
    Ok(SimulationOutcome { run, plan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assess::Classifier;
    use crate::inventory::{ExternalLocations, ObjectIdent, ObjectMeta, StorageKind};
    use crate::plan::UpgradeStatus;

    fn seeded_store() -> PlanStore {
        let store = PlanStore::open_temporary().unwrap();
        let locations = ExternalLocations::new(["s3://lake/sales"]);
        Classifier::new(&locations)
            .refresh_plan(
                &store,
                vec![
                    ObjectMeta::table("sales", "orders", StorageKind::External)
                        .with_location("s3://lake/sales/orders"),
                    ObjectMeta::table("sales", "legacy", StorageKind::Managed)
                        .with_upgrade_marker(),
                    ObjectMeta::view("sales", "v_orders", "SELECT * FROM sales.orders")
                        .with_reference(ObjectIdent::new("sales", "orders")),
                ],
                None,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_simulation_never_mutates_the_real_plan() {
        let store = seeded_store();

        let outcome = simulate_run(&store, RunConfig::default()).unwrap();

        assert!(outcome.run.all_complete());
        // Real plan still untouched.
        let record = store.require_record("sales").unwrap();
        assert_eq!(record.status, UpgradeStatus::NotStarted);
        assert!(record.messages.is_empty());
    }

    #[test]
    fn test_simulation_seeds_markers_from_snapshot() {
        let store = seeded_store();

        let outcome = simulate_run(&store, RunConfig::default()).unwrap();

        let sales = &outcome.run.databases[0];
        // Two tables done, one of them settled by its seeded marker.
        assert_eq!(sales.tables_done, 2);
        assert_eq!(sales.views_done, 1);
        assert_eq!(outcome.plan.databases.len(), 1);
        assert_eq!(outcome.plan.databases[0].status, "complete");
    }
}
