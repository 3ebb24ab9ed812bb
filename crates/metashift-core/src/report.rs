//! Progress reporting: read-only projections over the plan store.

use serde::Serialize;

use crate::error::Error;
use crate::plan::{PlanStore, UpgradeStatus};

/// Summary row for one database's migration progress.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseProgress {
    /// Source database name.
    pub database: String,
    /// Assigned strategy, rendered.
    pub strategy: String,
    /// Run status, rendered.
    pub status: String,
    /// Target container identity (`catalog.database`).
    pub target: String,
    /// Whether a view pass is needed.
    pub has_views: bool,
    /// Objects in the last inventory snapshot, if one exists.
    pub objects: Option<usize>,
    /// Recorded object-level failures.
    pub message_count: usize,
    /// Most recent failure cause, if any.
    pub last_error: Option<String>,
}

/// Databases grouped by run status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusTotals {
    /// Databases never attempted.
    pub not_started: usize,
    /// Databases whose last run succeeded on nothing.
    pub failed: usize,
    /// Databases with both successes and failures or pending work.
    pub partial: usize,
    /// Databases fully migrated.
    pub complete: usize,
}

/// Plan-wide progress rollup.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Per-database rows, ordered by database name.
    pub databases: Vec<DatabaseProgress>,
    /// Rollup by status.
    pub totals: StatusTotals,
}

impl PlanReport {
    /// Project the plan store into a progress report. Read-only.
    pub fn project(store: &PlanStore) -> Result<Self, Error> {
        let mut databases = Vec::new();
        let mut totals = StatusTotals::default();

        for record in store.list_records()? {
            match record.status {
                UpgradeStatus::NotStarted => totals.not_started += 1,
                UpgradeStatus::Failed => totals.failed += 1,
                UpgradeStatus::Partial => totals.partial += 1,
                UpgradeStatus::Complete => totals.complete += 1,
            }
            let objects = store
                .load_snapshot(&record.database)?
                .map(|s| s.objects.len());
            databases.push(DatabaseProgress {
                target: format!("{}.{}", record.target_catalog, record.target_database),
                strategy: record.strategy.to_string(),
                status: record.status.to_string(),
                has_views: record.has_views,
                objects,
                message_count: record.messages.len(),
                last_error: record
                    .messages
                    .iter()
                    .max_by_key(|m| m.at)
                    .map(|m| format!("{}: {}", m.object, m.cause)),
                database: record.database,
            });
        }

        Ok(Self { databases, totals })
    }

    /// Render the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assess::Classifier;
    use crate::inventory::{ExternalLocations, ObjectMeta, StorageKind};
    use crate::plan::{MigrationOp, UpgradeMessage};

    fn seeded_store() -> PlanStore {
        let store = PlanStore::open_temporary().unwrap();
        let locations = ExternalLocations::new(["s3://lake/sales"]);
        Classifier::new(&locations)
            .refresh_plan(
                &store,
                vec![
                    ObjectMeta::table("sales", "orders", StorageKind::Managed),
                    ObjectMeta::table("archive", "history", StorageKind::External)
                        .with_location("s3://lake/sales/history"),
                ],
                None,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_projection_rows_and_totals() {
        let store = seeded_store();
        let mut record = store.require_record("sales").unwrap();
        record.record_failure(UpgradeMessage::new(
            "sales.orders",
            MigrationOp::Clone,
            "copy interrupted",
        ));
        record.set_status(crate::plan::UpgradeStatus::Failed);
        store.save_record(&record).unwrap();

        let report = PlanReport::project(&store).unwrap();

        assert_eq!(report.databases.len(), 2);
        assert_eq!(report.totals.failed, 1);
        assert_eq!(report.totals.not_started, 1);

        let sales = report
            .databases
            .iter()
            .find(|d| d.database == "sales")
            .unwrap();
        assert_eq!(sales.strategy, "ctas");
        assert_eq!(sales.status, "failed");
        assert_eq!(sales.target, "main.sales");
        assert_eq!(sales.objects, Some(1));
        assert_eq!(sales.message_count, 1);
        assert!(sales.last_error.as_deref().unwrap().contains("sales.orders"));
    }

    #[test]
    fn test_json_rendering() {
        let store = seeded_store();
        let report = PlanReport::project(&store).unwrap();
        let json = report.to_json().unwrap();

        assert!(json.contains("\"database\": \"sales\""));
        assert!(json.contains("\"totals\""));
    }
}
