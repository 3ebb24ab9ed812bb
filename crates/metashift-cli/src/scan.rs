//! Scan-file parsing.
//!
//! The assessment scanner is external; what it hands over is a JSON file
//! with the declared external locations and the discovered objects. This
//! module owns the file format and converts it into the core's typed
//! inventory model.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use metashift_core::{ExternalLocations, ObjectIdent, ObjectMeta, StorageKind};

/// Errors raised while reading a scan file.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file could not be read.
    #[error("cannot read scan file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid scan JSON.
    #[error("invalid scan file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A reference is not a two-level `database.name` identifier.
    #[error("invalid reference `{0}` for view `{1}`: expected database.name")]
    BadReference(String, String),
}

/// Top-level scan file layout.
#[derive(Debug, Deserialize)]
pub struct ScanFile {
    /// Declared/recommended external location prefixes.
    #[serde(default)]
    pub external_locations: Vec<String>,
    /// Discovered objects.
    pub objects: Vec<ScanObject>,
}

/// One discovered object as serialized by the scanner.
#[derive(Debug, Deserialize)]
pub struct ScanObject {
    pub database: String,
    pub name: String,
    pub kind: ScanKind,
    #[serde(default)]
    pub storage: ScanStorage,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub upgraded: bool,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Table,
    View,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStorage {
    External,
    Managed,
    Virtual,
    #[default]
    Unknown,
}

impl From<ScanStorage> for StorageKind {
    fn from(storage: ScanStorage) -> Self {
        match storage {
            ScanStorage::External => StorageKind::External,
            ScanStorage::Managed => StorageKind::Managed,
            ScanStorage::Virtual => StorageKind::Virtual,
            ScanStorage::Unknown => StorageKind::Unknown,
        }
    }
}

impl ScanFile {
    /// Read and parse a scan file.
    pub fn read(path: &Path) -> Result<Self, ScanError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Declared external locations as the core's typed set.
    pub fn locations(&self) -> ExternalLocations {
        ExternalLocations::new(self.external_locations.iter().map(String::as_str))
    }

    /// Convert the discovered objects into the core's inventory model.
    pub fn into_objects(self) -> Result<Vec<ObjectMeta>, ScanError> {
        self.objects.into_iter().map(ScanObject::into_meta).collect()
    }
}

impl ScanObject {
    fn into_meta(self) -> Result<ObjectMeta, ScanError> {
        let mut meta = match self.kind {
            ScanKind::Table => {
                ObjectMeta::table(self.database, self.name, self.storage.into())
            }
            ScanKind::View => ObjectMeta::view(
                self.database,
                self.name,
                self.definition.unwrap_or_default(),
            ),
        };
        if let Some(location) = self.location {
            meta = meta.with_location(location);
        }
        if self.upgraded {
            meta = meta.with_upgrade_marker();
        }
        for reference in self.references {
            let (database, name) = reference
                .split_once('.')
                .filter(|(db, name)| !db.is_empty() && !name.is_empty())
                .ok_or_else(|| {
                    ScanError::BadReference(reference.clone(), meta.ident().to_string())
                })?;
            meta = meta.with_reference(ObjectIdent::new(database, name));
        }
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metashift_core::ObjectKind;

    const SCAN: &str = r#"{
        "external_locations": ["s3://lake/sales/"],
        "objects": [
            {
                "database": "sales",
                "name": "orders",
                "kind": "table",
                "storage": "external",
                "location": "s3://lake/sales/orders"
            },
            {
                "database": "sales",
                "name": "legacy",
                "kind": "table",
                "storage": "managed",
                "upgraded": true
            },
            {
                "database": "sales",
                "name": "v_orders",
                "kind": "view",
                "definition": "SELECT * FROM sales.orders",
                "references": ["sales.orders"]
            }
        ]
    }"#;

    #[test]
    fn test_parses_scan_json() {
        let scan: ScanFile = serde_json::from_str(SCAN).unwrap();

        assert!(scan.locations().covers("s3://lake/sales/orders"));
        let objects = scan.into_objects().unwrap();
        assert_eq!(objects.len(), 3);

        assert_eq!(objects[0].storage, StorageKind::External);
        assert_eq!(objects[0].location.as_deref(), Some("s3://lake/sales/orders"));
        assert!(objects[1].upgraded);
        assert_eq!(objects[2].kind, ObjectKind::View);
        assert_eq!(objects[2].references[0].to_string(), "sales.orders");
    }

    #[test]
    fn test_missing_storage_defaults_to_unknown() {
        let scan: ScanFile = serde_json::from_str(
            r#"{"objects": [{"database": "d", "name": "t", "kind": "table"}]}"#,
        )
        .unwrap();

        let objects = scan.into_objects().unwrap();
        assert_eq!(objects[0].storage, StorageKind::Unknown);
    }

    #[test]
    fn test_bad_reference_is_rejected() {
        let scan: ScanFile = serde_json::from_str(
            r#"{"objects": [{
                "database": "d", "name": "v", "kind": "view",
                "definition": "SELECT 1", "references": ["no_dot"]
            }]}"#,
        )
        .unwrap();

        assert!(matches!(
            scan.into_objects(),
            Err(ScanError::BadReference(_, _))
        ));
    }
}
