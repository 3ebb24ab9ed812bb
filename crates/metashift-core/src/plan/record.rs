//! Migration plan records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::now_micros;
use crate::error::Error;
use crate::inventory::TargetIdent;
use crate::plan::task::TableStrategy;

/// Target catalog used when no workspace identifier is known.
pub const DEFAULT_TARGET_CATALOG: &str = "main";

/// Upgrade strategy assigned to a database.
///
/// Persisted and exposed as a stable numeric code (`upgrade_assessment`):
/// 0 manual, 1 in-place, 2 ctas, 3 mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum UpgradeStrategy {
    /// Human decision required before any migration runs.
    Manual,
    /// Storage linked under the target identity without copying.
    InPlace,
    /// Data copied into target-managed storage.
    Ctas,
    /// Constituent tables require more than one strategy.
    Mixed,
}

impl UpgradeStrategy {
    /// Stable numeric code of this strategy.
    pub fn code(self) -> u8 {
        match self {
            UpgradeStrategy::Manual => 0,
            UpgradeStrategy::InPlace => 1,
            UpgradeStrategy::Ctas => 2,
            UpgradeStrategy::Mixed => 3,
        }
    }
}

impl From<UpgradeStrategy> for u8 {
    fn from(strategy: UpgradeStrategy) -> u8 {
        strategy.code()
    }
}

impl TryFrom<u8> for UpgradeStrategy {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        match code {
            0 => Ok(UpgradeStrategy::Manual),
            1 => Ok(UpgradeStrategy::InPlace),
            2 => Ok(UpgradeStrategy::Ctas),
            3 => Ok(UpgradeStrategy::Mixed),
            other => Err(Error::InvalidData(format!(
                "invalid strategy code: {other}"
            ))),
        }
    }
}

impl From<TableStrategy> for UpgradeStrategy {
    fn from(strategy: TableStrategy) -> Self {
        match strategy {
            TableStrategy::Manual => UpgradeStrategy::Manual,
            TableStrategy::InPlace => UpgradeStrategy::InPlace,
            TableStrategy::Ctas => UpgradeStrategy::Ctas,
        }
    }
}

impl fmt::Display for UpgradeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeStrategy::Manual => write!(f, "manual"),
            UpgradeStrategy::InPlace => write!(f, "in-place"),
            UpgradeStrategy::Ctas => write!(f, "ctas"),
            UpgradeStrategy::Mixed => write!(f, "mixed"),
        }
    }
}

/// Run status of a database's migration.
///
/// Persisted and exposed as a stable numeric code (`upgrade_status`):
/// 0 not-started, 1 failed, 2 partial, 3 complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum UpgradeStatus {
    /// Nothing has been attempted for this database.
    NotStarted,
    /// Work was attempted and nothing succeeded.
    Failed,
    /// Some objects succeeded, others failed or are still pending.
    Partial,
    /// Every constituent object reached terminal success.
    Complete,
}

impl UpgradeStatus {
    /// Stable numeric code of this status.
    pub fn code(self) -> u8 {
        match self {
            UpgradeStatus::NotStarted => 0,
            UpgradeStatus::Failed => 1,
            UpgradeStatus::Partial => 2,
            UpgradeStatus::Complete => 3,
        }
    }
}

impl From<UpgradeStatus> for u8 {
    fn from(status: UpgradeStatus) -> u8 {
        status.code()
    }
}

impl TryFrom<u8> for UpgradeStatus {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        match code {
            0 => Ok(UpgradeStatus::NotStarted),
            1 => Ok(UpgradeStatus::Failed),
            2 => Ok(UpgradeStatus::Partial),
            3 => Ok(UpgradeStatus::Complete),
            other => Err(Error::InvalidData(format!("invalid status code: {other}"))),
        }
    }
}

impl fmt::Display for UpgradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeStatus::NotStarted => write!(f, "not-started"),
            UpgradeStatus::Failed => write!(f, "failed"),
            UpgradeStatus::Partial => write!(f, "partial"),
            UpgradeStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Object-level operation whose failure a message records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationOp {
    /// In-place link of existing storage under the target identity.
    Link,
    /// Copy of data into target-managed storage.
    Clone,
    /// View re-creation under the target container.
    ViewCreate,
    /// Target container provisioning.
    Provision,
}

impl fmt::Display for MigrationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOp::Link => write!(f, "link"),
            MigrationOp::Clone => write!(f, "clone"),
            MigrationOp::ViewCreate => write!(f, "view-create"),
            MigrationOp::Provision => write!(f, "provision"),
        }
    }
}

/// One recorded object-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeMessage {
    /// Identifier of the object the operation ran against.
    pub object: String,
    /// Operation attempted.
    pub operation: MigrationOp,
    /// Failure cause as reported by the capability.
    pub cause: String,
    /// Time of the failure in microseconds since the Unix epoch.
    pub at: u64,
}

impl UpgradeMessage {
    /// Create a failure message stamped with the current time.
    pub fn new(
        object: impl Into<String>,
        operation: MigrationOp,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            object: object.into(),
            operation,
            cause: cause.into(),
            at: now_micros(),
        }
    }
}

/// One per-database migration plan row.
///
/// Field names in the JSON projection follow the persisted plan layout:
/// `upgrade_assessment` (strategy code), `views` (view flag),
/// `upgrade_status` (status code), `upgrade_messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Source database name. Immutable key.
    pub database: String,
    /// Assigned upgrade strategy.
    #[serde(rename = "upgrade_assessment")]
    pub strategy: UpgradeStrategy,
    /// Destination catalog.
    pub target_catalog: String,
    /// Destination database.
    pub target_database: String,
    /// Origin-workspace tag for multi-source consolidation.
    pub workspace_id: Option<String>,
    /// Whether the database contains views needing a second pass.
    #[serde(rename = "views")]
    pub has_views: bool,
    /// Current run status.
    #[serde(rename = "upgrade_status")]
    pub status: UpgradeStatus,
    /// Recorded object-level failures, ordered, keyed by object.
    #[serde(rename = "upgrade_messages")]
    pub messages: Vec<UpgradeMessage>,
    /// Record creation time in microseconds since the Unix epoch.
    pub created_at: u64,
    /// Last mutation time in microseconds since the Unix epoch.
    pub updated_at: u64,
}

impl MigrationRecord {
    /// Create a fresh record with the default target derivation: the target
    /// catalog is the workspace identifier (or [`DEFAULT_TARGET_CATALOG`])
    /// and the target database keeps the source name.
    pub fn new(
        database: impl Into<String>,
        strategy: UpgradeStrategy,
        has_views: bool,
        workspace_id: Option<String>,
    ) -> Self {
        let database = database.into();
        let target_catalog = workspace_id
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET_CATALOG.to_string());
        let now = now_micros();
        Self {
            target_database: database.clone(),
            database,
            strategy,
            target_catalog,
            workspace_id,
            has_views,
            status: UpgradeStatus::NotStarted,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Three-level target identity for an object of this database.
    pub fn target_for(&self, name: &str) -> TargetIdent {
        TargetIdent::new(
            self.target_catalog.clone(),
            self.target_database.clone(),
            name,
        )
    }

    /// Whether execution has started for this record.
    pub fn execution_started(&self) -> bool {
        self.status != UpgradeStatus::NotStarted
    }

    /// Whether every constituent object reached terminal success.
    pub fn is_complete(&self) -> bool {
        self.status == UpgradeStatus::Complete
    }

    /// Set the run status.
    pub fn set_status(&mut self, status: UpgradeStatus) {
        self.status = status;
        self.updated_at = now_micros();
    }

    /// Record an object-level failure.
    ///
    /// Messages are keyed by object: a repeated failure of the same object
    /// replaces its prior entry in place, so retry runs keep a stable
    /// message count. Entries for objects that later succeed are retained
    /// as history.
    pub fn record_failure(&mut self, message: UpgradeMessage) {
        match self.messages.iter_mut().find(|m| m.object == message.object) {
            Some(existing) => *existing = message,
            None => self.messages.push(message),
        }
        self.updated_at = now_micros();
    }

    /// Override the target container. Rejected once execution has started.
    pub fn set_target(
        &mut self,
        catalog: impl Into<String>,
        database: impl Into<String>,
    ) -> Result<(), Error> {
        if self.execution_started() {
            return Err(Error::EditRejected(format!(
                "target of {} is frozen once execution has started",
                self.database
            )));
        }
        self.target_catalog = catalog.into();
        self.target_database = database.into();
        self.updated_at = now_micros();
        Ok(())
    }

    /// Override the assigned strategy. Rejected once the record is
    /// complete; a Partial or Failed plan may still be re-tuned (a stuck
    /// database is exactly when an operator wants to fall back to
    /// `Manual`) — already-migrated tables are protected by their markers,
    /// not by the plan.
    pub fn set_strategy(&mut self, strategy: UpgradeStrategy) -> Result<(), Error> {
        if self.is_complete() {
            return Err(Error::EditRejected(format!(
                "strategy of {} cannot change after completion",
                self.database
            )));
        }
        self.strategy = strategy;
        self.updated_at = now_micros();
        Ok(())
    }

    /// Refresh this record from a new assessment: strategy and view flag are
    /// replaced, status returns to not-started, and the message sequence is
    /// reset. Target overrides and the workspace tag survive.
    pub fn refresh_assessment(&mut self, strategy: UpgradeStrategy, has_views: bool) {
        self.strategy = strategy;
        self.has_views = has_views;
        self.status = UpgradeStatus::NotStarted;
        self.messages.clear();
        self.updated_at = now_micros();
    }
}
