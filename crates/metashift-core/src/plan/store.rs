//! Durable plan storage.

use tracing::debug;

use crate::error::Error;
use crate::inventory::{DatabaseSnapshot, ExternalLocations};
use crate::plan::record::{MigrationRecord, UpgradeStrategy};

/// Durable store for migration records and inventory snapshots.
///
/// One sled database with three trees: plan records keyed by source
/// database name, the per-database inventory snapshots the executor reads
/// at run start, and plan-wide metadata such as the declared external
/// locations. Records are stored as JSON (the external projection format);
/// snapshots use the archive encoding. Every mutation is flushed before it
/// is reported as durable.
pub struct PlanStore {
    db: sled::Db,
    records: sled::Tree,
    inventory: sled::Tree,
    meta: sled::Tree,
}

impl PlanStore {
    /// Tree name for migration records.
    pub const RECORDS_TREE: &'static str = "plan:records";

    /// Tree name for inventory snapshots.
    pub const INVENTORY_TREE: &'static str = "plan:inventory";

    /// Tree name for plan-wide metadata.
    pub const META_TREE: &'static str = "plan:meta";

    const LOCATIONS_KEY: &'static [u8] = b"external_locations";

    /// Open (or create) a plan store at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let db = sled::open(path)?;
        Self::with_db(db)
    }

    /// Open a throwaway in-memory store, used by simulation runs and tests.
    pub fn open_temporary() -> Result<Self, Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db)
    }

    fn with_db(db: sled::Db) -> Result<Self, Error> {
        let records = db.open_tree(Self::RECORDS_TREE)?;
        let inventory = db.open_tree(Self::INVENTORY_TREE)?;
        let meta = db.open_tree(Self::META_TREE)?;
        Ok(Self {
            db,
            records,
            inventory,
            meta,
        })
    }

    /// Save a migration record.
    pub fn save_record(&self, record: &MigrationRecord) -> Result<(), Error> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| Error::Serialization(e.to_string()))?;
        self.records.insert(record.database.as_bytes(), bytes)?;
        self.records.flush()?;
        debug!(database = %record.database, status = %record.status, "Saved migration record");
        Ok(())
    }

    /// Load the migration record for a database.
    pub fn load_record(&self, database: &str) -> Result<Option<MigrationRecord>, Error> {
        match self.records.get(database.as_bytes())? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::Deserialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Load the migration record for a database, failing if absent.
    pub fn require_record(&self, database: &str) -> Result<MigrationRecord, Error> {
        self.load_record(database)?
            .ok_or_else(|| Error::UnknownDatabase(database.to_string()))
    }

    /// List all migration records, ordered by database name.
    pub fn list_records(&self) -> Result<Vec<MigrationRecord>, Error> {
        let mut records = Vec::new();
        for entry in self.records.iter() {
            let (_, bytes) = entry?;
            let record = serde_json::from_slice(&bytes)
                .map_err(|e| Error::Deserialization(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Override a record's target container (bounded editor write).
    pub fn set_target(
        &self,
        database: &str,
        catalog: &str,
        target_database: &str,
    ) -> Result<MigrationRecord, Error> {
        let mut record = self.require_record(database)?;
        record.set_target(catalog, target_database)?;
        self.save_record(&record)?;
        Ok(record)
    }

    /// Override a record's strategy (bounded editor write).
    pub fn set_strategy(
        &self,
        database: &str,
        strategy: UpgradeStrategy,
    ) -> Result<MigrationRecord, Error> {
        let mut record = self.require_record(database)?;
        record.set_strategy(strategy)?;
        self.save_record(&record)?;
        Ok(record)
    }

    /// Save the inventory snapshot for a database, replacing any prior one.
    pub fn save_snapshot(&self, snapshot: &DatabaseSnapshot) -> Result<(), Error> {
        let bytes = snapshot.to_bytes()?;
        self.inventory.insert(snapshot.database.as_bytes(), bytes)?;
        self.inventory.flush()?;
        debug!(
            database = %snapshot.database,
            objects = snapshot.objects.len(),
            "Saved inventory snapshot"
        );
        Ok(())
    }

    /// Load the inventory snapshot for a database.
    pub fn load_snapshot(&self, database: &str) -> Result<Option<DatabaseSnapshot>, Error> {
        match self.inventory.get(database.as_bytes())? {
            Some(bytes) => Ok(Some(DatabaseSnapshot::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load the inventory snapshot for a database, failing if absent.
    pub fn require_snapshot(&self, database: &str) -> Result<DatabaseSnapshot, Error> {
        self.load_snapshot(database)?
            .ok_or_else(|| Error::MissingSnapshot(database.to_string()))
    }

    /// Persist the declared external locations from the last assessment.
    pub fn save_locations(&self, locations: &ExternalLocations) -> Result<(), Error> {
        let bytes = serde_json::to_vec(locations.prefixes())
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.meta.insert(Self::LOCATIONS_KEY, bytes)?;
        self.meta.flush()?;
        Ok(())
    }

    /// Load the declared external locations; empty if never assessed.
    pub fn load_locations(&self) -> Result<ExternalLocations, Error> {
        match self.meta.get(Self::LOCATIONS_KEY)? {
            Some(bytes) => {
                let prefixes: Vec<String> = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::Deserialization(e.to_string()))?;
                Ok(ExternalLocations::new(prefixes))
            }
            None => Ok(ExternalLocations::empty()),
        }
    }

    /// Remove one database's record and snapshot (deliberate cleanup).
    pub fn remove_database(&self, database: &str) -> Result<bool, Error> {
        let had_record = self.records.remove(database.as_bytes())?.is_some();
        self.inventory.remove(database.as_bytes())?;
        self.records.flush()?;
        self.inventory.flush()?;
        Ok(had_record)
    }

    /// Remove the whole plan (deliberate cleanup).
    pub fn clear(&self) -> Result<(), Error> {
        self.records.clear()?;
        self.inventory.clear()?;
        self.meta.clear()?;
        self.db.flush()?;
        Ok(())
    }

    /// Number of migration records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Flush all trees to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::record::UpgradeStatus;

    fn temp_store() -> PlanStore {
        PlanStore::open_temporary().unwrap()
    }

    #[test]
    fn test_record_save_load_roundtrip() {
        let store = temp_store();
        let record = MigrationRecord::new("sales", UpgradeStrategy::Mixed, true, None);

        store.save_record(&record).unwrap();
        let loaded = store.load_record("sales").unwrap().unwrap();

        assert_eq!(loaded, record);
        assert!(store.load_record("absent").unwrap().is_none());
    }

    #[test]
    fn test_list_records_ordered_by_database() {
        let store = temp_store();
        for name in ["inventory", "sales", "archive"] {
            store
                .save_record(&MigrationRecord::new(name, UpgradeStrategy::Ctas, false, None))
                .unwrap();
        }

        let names: Vec<String> = store
            .list_records()
            .unwrap()
            .into_iter()
            .map(|r| r.database)
            .collect();
        assert_eq!(names, ["archive", "inventory", "sales"]);
    }

    #[test]
    fn test_editor_writes() {
        let store = temp_store();
        store
            .save_record(&MigrationRecord::new("sales", UpgradeStrategy::Ctas, false, None))
            .unwrap();

        let updated = store.set_target("sales", "prod", "sales_v2").unwrap();
        assert_eq!(updated.target_catalog, "prod");
        assert_eq!(updated.target_database, "sales_v2");

        let updated = store.set_strategy("sales", UpgradeStrategy::Manual).unwrap();
        assert_eq!(updated.strategy, UpgradeStrategy::Manual);

        assert!(matches!(
            store.set_target("absent", "prod", "x"),
            Err(Error::UnknownDatabase(_))
        ));
    }

    #[test]
    fn test_editor_writes_frozen_after_execution() {
        let store = temp_store();
        let mut record = MigrationRecord::new("sales", UpgradeStrategy::Ctas, false, None);
        record.set_status(UpgradeStatus::Partial);
        store.save_record(&record).unwrap();

        assert!(matches!(
            store.set_target("sales", "prod", "sales"),
            Err(Error::EditRejected(_))
        ));
    }

    #[test]
    fn test_snapshot_save_load() {
        use crate::inventory::{ObjectMeta, StorageKind};

        let store = temp_store();
        let snapshot = DatabaseSnapshot::new(
            "sales",
            vec![ObjectMeta::table("sales", "orders", StorageKind::Managed)],
        );

        store.save_snapshot(&snapshot).unwrap();
        let loaded = store.require_snapshot("sales").unwrap();
        assert_eq!(loaded, snapshot);

        assert!(matches!(
            store.require_snapshot("absent"),
            Err(Error::MissingSnapshot(_))
        ));
    }

    #[test]
    fn test_remove_database_drops_record_and_snapshot() {
        use crate::inventory::{ObjectMeta, StorageKind};

        let store = temp_store();
        store
            .save_record(&MigrationRecord::new("sales", UpgradeStrategy::Ctas, false, None))
            .unwrap();
        store
            .save_snapshot(&DatabaseSnapshot::new(
                "sales",
                vec![ObjectMeta::table("sales", "orders", StorageKind::Managed)],
            ))
            .unwrap();

        assert!(store.remove_database("sales").unwrap());
        assert!(store.load_record("sales").unwrap().is_none());
        assert!(store.load_snapshot("sales").unwrap().is_none());
        assert!(!store.remove_database("sales").unwrap());
    }

    #[test]
    fn test_locations_roundtrip() {
        let store = temp_store();
        assert!(store.load_locations().unwrap().is_empty());

        store
            .save_locations(&ExternalLocations::new(["s3://lake/sales/"]))
            .unwrap();
        let loaded = store.load_locations().unwrap();
        assert!(loaded.covers("s3://lake/sales/orders"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan");

        {
            let store = PlanStore::open(&path).unwrap();
            store
                .save_record(&MigrationRecord::new("sales", UpgradeStrategy::InPlace, false, None))
                .unwrap();
        }

        let store = PlanStore::open(&path).unwrap();
        let record = store.require_record("sales").unwrap();
        assert_eq!(record.strategy, UpgradeStrategy::InPlace);
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = temp_store();
        store
            .save_record(&MigrationRecord::new("sales", UpgradeStrategy::Ctas, false, None))
            .unwrap();

        store.clear().unwrap();
        assert_eq!(store.record_count(), 0);
        assert!(store.list_records().unwrap().is_empty());
    }
}
