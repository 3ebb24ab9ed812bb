//! Object classification.
//!
//! The classifier is pure: it maps discovered-object metadata to upgrade
//! strategies and aggregates them per database. It never talks to the
//! catalog and never executes migrations, so it is safe to re-run at any
//! time; [`Classifier::refresh_plan`] only rewrites plan records and
//! inventory snapshots.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Error;
use crate::inventory::{DatabaseSnapshot, ExternalLocations, ObjectMeta, StorageKind};
use crate::plan::{MigrationRecord, PlanStore, TableStrategy, UpgradeStrategy};

/// Outcome of classifying a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The object already carries the upgrade marker and is excluded from
    /// strategy aggregation.
    AlreadyUpgraded,
    /// The strategy the table resolves to.
    Strategy(TableStrategy),
}

/// Database-level aggregation of per-table classifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseAssessment {
    /// Assessed database name.
    pub database: String,
    /// Aggregated strategy for the record.
    pub strategy: UpgradeStrategy,
    /// Whether the database contains views.
    pub has_views: bool,
    /// Total number of tables discovered.
    pub tables: usize,
    /// Tables excluded from aggregation because they already carry the
    /// upgrade marker.
    pub excluded: usize,
    /// Number of views discovered.
    pub views: usize,
}

/// Pure strategy classifier over a set of declared external locations.
pub struct Classifier<'a> {
    locations: &'a ExternalLocations,
}

impl<'a> Classifier<'a> {
    /// Create a classifier using the given declared external locations.
    pub fn new(locations: &'a ExternalLocations) -> Self {
        Self { locations }
    }

    /// Classify one table.
    ///
    /// Policy: a marker-bearing table is already complete; an external
    /// table under a declared location links in place; a managed table
    /// (including default root storage) is copied; everything else is
    /// manual, the conservative default, never silently upgraded.
    pub fn classify_table(&self, object: &ObjectMeta) -> Classification {
        if object.upgraded {
            return Classification::AlreadyUpgraded;
        }
        Classification::Strategy(self.storage_strategy(object))
    }

    /// Strategy implied by storage alone, ignoring any existing marker.
    ///
    /// The executor uses this to resolve per-table strategies inside a
    /// `Mixed` database at run time; the fresh marker check happens there.
    pub fn storage_strategy(&self, object: &ObjectMeta) -> TableStrategy {
        match object.storage {
            StorageKind::External => match &object.location {
                Some(location) if self.locations.covers(location) => TableStrategy::InPlace,
                _ => TableStrategy::Manual,
            },
            StorageKind::Managed => TableStrategy::Ctas,
            StorageKind::Virtual | StorageKind::Unknown => TableStrategy::Manual,
        }
    }

    /// Aggregate a database's objects into an assessment.
    ///
    /// The database strategy is the single strategy shared by all
    /// non-excluded tables, `Mixed` when they disagree, and `Manual` when
    /// nothing migratable remains. View presence is tracked separately and
    /// never forces `Mixed`.
    pub fn assess(&self, database: &str, objects: &[ObjectMeta]) -> DatabaseAssessment {
        let mut tables = 0usize;
        let mut excluded = 0usize;
        let mut views = 0usize;
        let mut aggregate: Option<UpgradeStrategy> = None;

        for object in objects {
            if object.is_view() {
                views += 1;
                continue;
            }
            tables += 1;
            match self.classify_table(object) {
                Classification::AlreadyUpgraded => excluded += 1,
                Classification::Strategy(strategy) => {
                    let strategy = UpgradeStrategy::from(strategy);
                    aggregate = Some(match aggregate {
                        None => strategy,
                        Some(current) if current == strategy => current,
                        Some(_) => UpgradeStrategy::Mixed,
                    });
                }
            }
        }

        DatabaseAssessment {
            database: database.to_string(),
            strategy: aggregate.unwrap_or(UpgradeStrategy::Manual),
            has_views: views > 0,
            tables,
            excluded,
            views,
        }
    }

    /// Refresh the plan store from a fresh scan.
    ///
    /// Groups the discovered objects by database, creates or refreshes one
    /// record per database (existing target overrides and workspace tags
    /// survive; run status and messages reset), replaces each database's
    /// inventory snapshot wholesale, and persists the declared external
    /// locations so later runs can resolve per-table strategies.
    pub fn refresh_plan(
        &self,
        store: &PlanStore,
        objects: Vec<ObjectMeta>,
        workspace_id: Option<&str>,
    ) -> Result<Vec<DatabaseAssessment>, Error> {
        store.save_locations(self.locations)?;

        let mut grouped: BTreeMap<String, Vec<ObjectMeta>> = BTreeMap::new();
        for object in objects {
            grouped.entry(object.database.clone()).or_default().push(object);
        }

        let mut assessments = Vec::with_capacity(grouped.len());
        for (database, objects) in grouped {
            let assessment = self.assess(&database, &objects);
            let record = match store.load_record(&database)? {
                Some(mut existing) => {
                    existing.refresh_assessment(assessment.strategy, assessment.has_views);
                    existing
                }
                None => MigrationRecord::new(
                    &database,
                    assessment.strategy,
                    assessment.has_views,
                    workspace_id.map(String::from),
                ),
            };
            store.save_record(&record)?;
            store.save_snapshot(&DatabaseSnapshot::new(&database, objects))?;
            debug!(
                database = %assessment.database,
                strategy = %assessment.strategy,
                tables = assessment.tables,
                views = assessment.views,
                "Assessed database"
            );
            assessments.push(assessment);
        }
        Ok(assessments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared_locations() -> ExternalLocations {
        ExternalLocations::new(["s3://lake/sales", "s3://lake/shared"])
    }

    fn external_table(name: &str, location: &str) -> ObjectMeta {
        ObjectMeta::table("sales", name, StorageKind::External).with_location(location)
    }

    fn managed_table(name: &str) -> ObjectMeta {
        ObjectMeta::table("sales", name, StorageKind::Managed)
    }

    #[test]
    fn test_marker_wins_over_storage() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let table = managed_table("orders").with_upgrade_marker();

        assert_eq!(
            classifier.classify_table(&table),
            Classification::AlreadyUpgraded
        );
    }

    #[test]
    fn test_external_under_declared_location_is_in_place() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);

        assert_eq!(
            classifier.classify_table(&external_table("orders", "s3://lake/sales/orders")),
            Classification::Strategy(TableStrategy::InPlace)
        );
    }

    #[test]
    fn test_external_outside_declared_locations_is_manual() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);

        assert_eq!(
            classifier.classify_table(&external_table("legacy", "s3://other/legacy")),
            Classification::Strategy(TableStrategy::Manual)
        );
        // No location reported at all.
        let bare = ObjectMeta::table("sales", "bare", StorageKind::External);
        assert_eq!(
            classifier.classify_table(&bare),
            Classification::Strategy(TableStrategy::Manual)
        );
    }

    #[test]
    fn test_managed_is_ctas() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);

        assert_eq!(
            classifier.classify_table(&managed_table("orders")),
            Classification::Strategy(TableStrategy::Ctas)
        );
    }

    #[test]
    fn test_unknown_storage_is_manual() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let odd = ObjectMeta::table("sales", "odd", StorageKind::Unknown);

        assert_eq!(
            classifier.classify_table(&odd),
            Classification::Strategy(TableStrategy::Manual)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let table = external_table("orders", "s3://lake/sales/orders");

        let first = classifier.classify_table(&table);
        for _ in 0..10 {
            assert_eq!(classifier.classify_table(&table), first);
        }
    }

    #[test]
    fn test_uniform_tables_keep_single_strategy() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let objects = vec![
            external_table("orders", "s3://lake/sales/orders"),
            external_table("items", "s3://lake/sales/items"),
        ];

        let assessment = classifier.assess("sales", &objects);
        assert_eq!(assessment.strategy, UpgradeStrategy::InPlace);
        assert!(!assessment.has_views);
        assert_eq!(assessment.tables, 2);
    }

    #[test]
    fn test_disagreeing_tables_aggregate_to_mixed() {
        // Two external tables under a declared location plus one managed
        // table: the database is mixed and has no views.
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let objects = vec![
            external_table("orders", "s3://lake/sales/orders"),
            external_table("items", "s3://lake/sales/items"),
            managed_table("customers"),
        ];

        let assessment = classifier.assess("sales", &objects);
        assert_eq!(assessment.strategy, UpgradeStrategy::Mixed);
        assert!(!assessment.has_views);
        assert_eq!(assessment.views, 0);
    }

    #[test]
    fn test_excluded_tables_do_not_affect_aggregation() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let objects = vec![
            managed_table("old").with_upgrade_marker(),
            external_table("orders", "s3://lake/sales/orders"),
        ];

        let assessment = classifier.assess("sales", &objects);
        assert_eq!(assessment.strategy, UpgradeStrategy::InPlace);
        assert_eq!(assessment.excluded, 1);
    }

    #[test]
    fn test_fully_upgraded_database_defaults_to_manual() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let objects = vec![
            managed_table("a").with_upgrade_marker(),
            managed_table("b").with_upgrade_marker(),
        ];

        let assessment = classifier.assess("sales", &objects);
        assert_eq!(assessment.strategy, UpgradeStrategy::Manual);
        assert_eq!(assessment.excluded, 2);
    }

    #[test]
    fn test_views_never_force_mixed() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let objects = vec![
            external_table("orders", "s3://lake/sales/orders"),
            ObjectMeta::view("sales", "v_orders", "SELECT * FROM sales.orders"),
        ];

        let assessment = classifier.assess("sales", &objects);
        assert_eq!(assessment.strategy, UpgradeStrategy::InPlace);
        assert!(assessment.has_views);
        assert_eq!(assessment.views, 1);
    }

    #[test]
    fn test_refresh_plan_creates_records_and_snapshots() {
        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let store = PlanStore::open_temporary().unwrap();

        let objects = vec![
            external_table("orders", "s3://lake/sales/orders"),
            managed_table("customers"),
            ObjectMeta::table("archive", "history", StorageKind::Managed),
        ];

        let assessments = classifier
            .refresh_plan(&store, objects, Some("ws-prod"))
            .unwrap();
        assert_eq!(assessments.len(), 2);

        let sales = store.require_record("sales").unwrap();
        assert_eq!(sales.strategy, UpgradeStrategy::Mixed);
        assert_eq!(sales.workspace_id.as_deref(), Some("ws-prod"));
        assert_eq!(sales.target_catalog, "ws-prod");

        let snapshot = store.require_snapshot("archive").unwrap();
        assert_eq!(snapshot.objects.len(), 1);
    }

    #[test]
    fn test_refresh_plan_preserves_overrides_and_resets_run_state() {
        use crate::plan::{MigrationOp, UpgradeMessage, UpgradeStatus};

        let locations = declared_locations();
        let classifier = Classifier::new(&locations);
        let store = PlanStore::open_temporary().unwrap();

        classifier
            .refresh_plan(&store, vec![managed_table("orders")], None)
            .unwrap();
        store.set_target("sales", "prod", "sales_v2").unwrap();

        // Simulate a finished run with one recorded failure.
        let mut record = store.require_record("sales").unwrap();
        record.record_failure(UpgradeMessage::new(
            "sales.orders",
            MigrationOp::Clone,
            "copy interrupted",
        ));
        record.set_status(UpgradeStatus::Failed);
        store.save_record(&record).unwrap();

        classifier
            .refresh_plan(
                &store,
                vec![
                    managed_table("orders"),
                    external_table("items", "s3://lake/sales/items"),
                ],
                None,
            )
            .unwrap();

        let refreshed = store.require_record("sales").unwrap();
        assert_eq!(refreshed.strategy, UpgradeStrategy::Mixed);
        assert_eq!(refreshed.status, UpgradeStatus::NotStarted);
        assert!(refreshed.messages.is_empty());
        assert_eq!(refreshed.target_catalog, "prod");
        assert_eq!(refreshed.target_database, "sales_v2");
    }
}
