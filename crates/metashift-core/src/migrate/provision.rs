//! Target container provisioning.

use tracing::{debug, warn};

use crate::ops::{CatalogOps, OpsError};
use crate::plan::MigrationRecord;

/// Ensure a record's target catalog and database exist.
///
/// Both ensure operations are idempotent by the capability contract, so
/// provisioning an already-provisioned target is a no-op. A failure here is
/// fatal for the database's run: no table or view work may proceed against
/// a container that could not be created. Other databases are unaffected.
pub fn ensure_targets(ops: &dyn CatalogOps, record: &MigrationRecord) -> Result<(), OpsError> {
    ops.ensure_catalog(&record.target_catalog)?;
    ops.ensure_database(&record.target_catalog, &record.target_database)
        .map_err(|e| {
            warn!(
                database = %record.database,
                target = %format_args!("{}.{}", record.target_catalog, record.target_database),
                error = %e,
                "Target provisioning failed"
            );
            e
        })?;
    debug!(
        database = %record.database,
        target = %format_args!("{}.{}", record.target_catalog, record.target_database),
        "Target containers ensured"
    );
    Ok(())
}
