//! Discovered-object metadata.

use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

use crate::clock::now_micros;
use crate::error::Error;

/// Two-level identifier of a source object (`database.name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct ObjectIdent {
    /// Source database (schema) name.
    pub database: String,
    /// Object name within the database.
    pub name: String,
}

impl ObjectIdent {
    /// Create a new two-level identifier.
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

/// Three-level identifier of a migrated object (`catalog.database.name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct TargetIdent {
    /// Destination catalog name.
    pub catalog: String,
    /// Destination database (schema) name.
    pub database: String,
    /// Object name within the destination database.
    pub name: String,
}

impl TargetIdent {
    /// Create a new three-level identifier.
    pub fn new(
        catalog: impl Into<String>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            database: database.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TargetIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.database, self.name)
    }
}

/// Kind of a discovered catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A table backed by storage.
    Table,
    /// A view defined over other objects.
    View,
}

/// Storage backing of a discovered object, as reported by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum StorageKind {
    /// Table data lives under an externally managed path.
    External,
    /// Table data lives under metastore-managed storage, including the
    /// default root storage case.
    Managed,
    /// No backing storage (views).
    Virtual,
    /// Storage kind the scanner could not determine.
    Unknown,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::External => write!(f, "external"),
            StorageKind::Managed => write!(f, "managed"),
            StorageKind::Virtual => write!(f, "virtual"),
            StorageKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Metadata of one discovered object, as consumed from the assessment
/// scanner.
///
/// For views the scanner also supplies the stored definition text and the
/// objects the definition references (its two-level references); the view
/// migrator consumes both.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Source database name.
    pub database: String,
    /// Object name.
    pub name: String,
    /// Table or view.
    pub kind: ObjectKind,
    /// Storage backing.
    pub storage: StorageKind,
    /// Storage location path, if the scanner reported one.
    pub location: Option<String>,
    /// Whether the object already carried the upgrade marker at scan time.
    pub upgraded: bool,
    /// Stored definition text (views only).
    pub definition: Option<String>,
    /// Objects referenced by the definition (views only).
    pub references: Vec<ObjectIdent>,
}

impl ObjectMeta {
    /// Create table metadata.
    pub fn table(
        database: impl Into<String>,
        name: impl Into<String>,
        storage: StorageKind,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            kind: ObjectKind::Table,
            storage,
            location: None,
            upgraded: false,
            definition: None,
            references: Vec::new(),
        }
    }

    /// Create view metadata from its stored definition text.
    pub fn view(
        database: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            kind: ObjectKind::View,
            storage: StorageKind::Virtual,
            location: None,
            upgraded: false,
            definition: Some(definition.into()),
            references: Vec::new(),
        }
    }

    /// Set the storage location path.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Flag the object as already carrying the upgrade marker.
    pub fn with_upgrade_marker(mut self) -> Self {
        self.upgraded = true;
        self
    }

    /// Add a referenced object (views only).
    pub fn with_reference(mut self, reference: ObjectIdent) -> Self {
        self.references.push(reference);
        self
    }

    /// Add multiple referenced objects.
    pub fn with_references(mut self, references: impl IntoIterator<Item = ObjectIdent>) -> Self {
        self.references.extend(references);
        self
    }

    /// Two-level identifier of this object.
    pub fn ident(&self) -> ObjectIdent {
        ObjectIdent::new(self.database.clone(), self.name.clone())
    }

    /// Whether this object is a view.
    pub fn is_view(&self) -> bool {
        self.kind == ObjectKind::View
    }
}

/// Persisted output of one assessment scan for a single database.
///
/// A fresh assessment replaces the previous snapshot wholesale; executor
/// runs read the stored snapshot rather than requiring callers to re-supply
/// scan output.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    /// Source database name.
    pub database: String,
    /// Scan time in microseconds since the Unix epoch.
    pub scanned_at: u64,
    /// Discovered objects in this database.
    pub objects: Vec<ObjectMeta>,
}

impl DatabaseSnapshot {
    /// Create a snapshot from scanner output.
    pub fn new(database: impl Into<String>, objects: Vec<ObjectMeta>) -> Self {
        Self {
            database: database.into(),
            scanned_at: now_micros(),
            objects,
        }
    }

    /// Iterate over the tables in the snapshot.
    pub fn tables(&self) -> impl Iterator<Item = &ObjectMeta> {
        self.objects.iter().filter(|o| !o.is_view())
    }

    /// Iterate over the views in the snapshot.
    pub fn views(&self) -> impl Iterator<Item = &ObjectMeta> {
        self.objects.iter().filter(|o| o.is_view())
    }

    /// Serialize to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|bytes| bytes.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
