//! In-memory catalog capability.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use super::{CatalogOps, OpsError};
use crate::inventory::{ObjectIdent, TargetIdent};

/// In-memory [`CatalogOps`] implementation for tests and simulation runs.
///
/// Tracks provisioned containers, migrated objects, markers, and a journal
/// of every operation in call order. Table and view operations require the
/// target container to have been provisioned first, so ordering bugs
/// surface as failures. Failures can be injected per key to exercise retry
/// paths.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

#[derive(Debug, Default)]
struct CatalogState {
    catalogs: BTreeSet<String>,
    databases: BTreeSet<String>,
    tables: BTreeSet<String>,
    views: BTreeMap<String, String>,
    markers: BTreeMap<String, TargetIdent>,
    failures: BTreeMap<String, u32>,
    journal: Vec<String>,
}

impl CatalogState {
    fn trip_failure(&mut self, key: &str) -> bool {
        match self.failures.get_mut(key) {
            Some(remaining) => {
                if *remaining > 0 {
                    *remaining -= 1;
                    if *remaining == 0 {
                        self.failures.remove(key);
                    }
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    fn container_key(catalog: &str, database: &str) -> String {
        format!("{catalog}.{database}")
    }

    fn require_container(&self, target: &TargetIdent) -> Result<(), OpsError> {
        let key = Self::container_key(&target.catalog, &target.database);
        if !self.catalogs.contains(&target.catalog) || !self.databases.contains(&key) {
            return Err(OpsError::ContainerNotFound(key));
        }
        Ok(())
    }
}

impl MemoryCatalog {
    /// Create an empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` operations keyed by `key` fail.
    ///
    /// Keys: source identifier for link/clone and marker writes, catalog
    /// name or `catalog.database` for the ensure operations, target
    /// identifier for view creation, `read-marker <source>` for marker
    /// reads.
    pub fn inject_failure(&self, key: impl Into<String>, times: u32) {
        self.state.lock().failures.insert(key.into(), times);
    }

    /// Whether a target table exists (was linked or cloned).
    pub fn has_table(&self, target: &str) -> bool {
        self.state.lock().tables.contains(target)
    }

    /// Definition of a created target view, if any.
    pub fn view_definition(&self, target: &str) -> Option<String> {
        self.state.lock().views.get(target).cloned()
    }

    /// Current marker of a source object, if any.
    pub fn marker(&self, object: &ObjectIdent) -> Option<TargetIdent> {
        self.state.lock().markers.get(&object.to_string()).cloned()
    }

    /// Whether a catalog has been provisioned.
    pub fn has_catalog(&self, catalog: &str) -> bool {
        self.state.lock().catalogs.contains(catalog)
    }

    /// Whether a database has been provisioned.
    pub fn has_database(&self, catalog: &str, database: &str) -> bool {
        self.state
            .lock()
            .databases
            .contains(&CatalogState::container_key(catalog, database))
    }

    /// Every operation performed, in call order.
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().journal.clone()
    }

    /// Number of journal entries whose operation matches `op`.
    pub fn count_ops(&self, op: &str) -> usize {
        let prefix = format!("{op} ");
        self.state
            .lock()
            .journal
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }
}

impl CatalogOps for MemoryCatalog {
    fn ensure_catalog(&self, catalog: &str) -> Result<(), OpsError> {
        let mut state = self.state.lock();
        if state.trip_failure(catalog) {
            return Err(OpsError::Failed(format!("injected failure: {catalog}")));
        }
        state.catalogs.insert(catalog.to_string());
        state.journal.push(format!("ensure-catalog {catalog}"));
        Ok(())
    }

    fn ensure_database(&self, catalog: &str, database: &str) -> Result<(), OpsError> {
        let key = CatalogState::container_key(catalog, database);
        let mut state = self.state.lock();
        if state.trip_failure(&key) {
            return Err(OpsError::Failed(format!("injected failure: {key}")));
        }
        if !state.catalogs.contains(catalog) {
            return Err(OpsError::ContainerNotFound(catalog.to_string()));
        }
        state.databases.insert(key.clone());
        state.journal.push(format!("ensure-database {key}"));
        Ok(())
    }

    fn upgrade_marker(&self, object: &ObjectIdent) -> Result<Option<TargetIdent>, OpsError> {
        let key = format!("read-marker {object}");
        let mut state = self.state.lock();
        if state.trip_failure(&key) {
            return Err(OpsError::Failed(format!("injected failure: {key}")));
        }
        Ok(state.markers.get(&object.to_string()).cloned())
    }

    fn set_upgrade_marker(
        &self,
        object: &ObjectIdent,
        target: &TargetIdent,
    ) -> Result<(), OpsError> {
        let key = object.to_string();
        let mut state = self.state.lock();
        if state.trip_failure(&key) {
            return Err(OpsError::Failed(format!("injected failure: {key}")));
        }
        state.markers.insert(key.clone(), target.clone());
        state.journal.push(format!("marker {key} -> {target}"));
        Ok(())
    }

    fn link_table(&self, source: &ObjectIdent, target: &TargetIdent) -> Result<(), OpsError> {
        let key = source.to_string();
        let mut state = self.state.lock();
        if state.trip_failure(&key) {
            return Err(OpsError::Failed(format!("injected failure: {key}")));
        }
        state.require_container(target)?;
        state.tables.insert(target.to_string());
        state.journal.push(format!("link {key} -> {target}"));
        Ok(())
    }

    fn clone_table(&self, source: &ObjectIdent, target: &TargetIdent) -> Result<(), OpsError> {
        let key = source.to_string();
        let mut state = self.state.lock();
        if state.trip_failure(&key) {
            return Err(OpsError::Failed(format!("injected failure: {key}")));
        }
        state.require_container(target)?;
        state.tables.insert(target.to_string());
        state.journal.push(format!("clone {key} -> {target}"));
        Ok(())
    }

    fn create_view(&self, target: &TargetIdent, definition: &str) -> Result<(), OpsError> {
        let key = target.to_string();
        let mut state = self.state.lock();
        if state.trip_failure(&key) {
            return Err(OpsError::Failed(format!("injected failure: {key}")));
        }
        state.require_container(target)?;
        state.views.insert(key.clone(), definition.to_string());
        state.journal.push(format!("view-create {key}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str) -> TargetIdent {
        TargetIdent::new("main", "sales", name)
    }

    fn provision(catalog: &MemoryCatalog) {
        catalog.ensure_catalog("main").unwrap();
        catalog.ensure_database("main", "sales").unwrap();
    }

    #[test]
    fn test_ensure_operations_are_idempotent() {
        let catalog = MemoryCatalog::new();
        provision(&catalog);
        provision(&catalog);

        assert!(catalog.has_catalog("main"));
        assert!(catalog.has_database("main", "sales"));
        assert_eq!(catalog.count_ops("ensure-catalog"), 2);
    }

    #[test]
    fn test_table_ops_require_provisioned_container() {
        let catalog = MemoryCatalog::new();
        let source = ObjectIdent::new("sales", "orders");

        let err = catalog.clone_table(&source, &target("orders")).unwrap_err();
        assert!(matches!(err, OpsError::ContainerNotFound(_)));

        provision(&catalog);
        catalog.clone_table(&source, &target("orders")).unwrap();
        assert!(catalog.has_table("main.sales.orders"));
    }

    #[test]
    fn test_marker_read_write() {
        let catalog = MemoryCatalog::new();
        let source = ObjectIdent::new("sales", "orders");

        assert!(catalog.upgrade_marker(&source).unwrap().is_none());
        catalog.set_upgrade_marker(&source, &target("orders")).unwrap();
        assert_eq!(
            catalog.upgrade_marker(&source).unwrap().unwrap().to_string(),
            "main.sales.orders"
        );
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let catalog = MemoryCatalog::new();
        provision(&catalog);
        let source = ObjectIdent::new("sales", "orders");
        catalog.inject_failure("sales.orders", 1);

        assert!(catalog.link_table(&source, &target("orders")).is_err());
        assert!(catalog.link_table(&source, &target("orders")).is_ok());
    }

    #[test]
    fn test_marker_read_failures_are_injectable() {
        let catalog = MemoryCatalog::new();
        let source = ObjectIdent::new("sales", "orders");
        catalog.inject_failure("read-marker sales.orders", 1);

        assert!(catalog.upgrade_marker(&source).is_err());
        assert!(catalog.upgrade_marker(&source).unwrap().is_none());
    }

    #[test]
    fn test_view_creation_records_definition() {
        let catalog = MemoryCatalog::new();
        provision(&catalog);

        catalog
            .create_view(&target("v_orders"), "SELECT * FROM main.sales.orders")
            .unwrap();
        assert_eq!(
            catalog.view_definition("main.sales.v_orders").unwrap(),
            "SELECT * FROM main.sales.orders"
        );
    }
}
