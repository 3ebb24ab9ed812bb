//! Migration execution: the state machine that turns plan records into
//! catalog operations.
//!
//! A run processes every non-complete record: provision the target
//! containers, migrate the tables (optionally fanned out across workers),
//! wait for the table phase to finish, then migrate the views whose
//! dependencies are ready. All object-level failures are contained and
//! recorded on the owning record; only plan-store infrastructure errors
//! escalate out of a run. The whole cycle is re-entrant: the durable
//! per-object signal is the already-upgraded marker on the source object,
//! re-checked fresh before every operation.

pub mod executor;
pub mod provision;
pub mod runner;
pub mod simulate;
pub mod views;

pub use executor::compute_status;
pub use runner::{DatabaseRunReport, MigrationRunner, RunConfig, RunReport};
pub use simulate::{simulate_run, SimulationOutcome};
