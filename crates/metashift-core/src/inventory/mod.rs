//! Inventory model: the discovered objects and external locations consumed
//! from the assessment scanner.
//!
//! The scanner itself lives outside this crate. What arrives here is its
//! output: per-object metadata ([`ObjectMeta`]) grouped into per-database
//! snapshots ([`DatabaseSnapshot`]), plus the set of declared external
//! locations ([`ExternalLocations`]) the classifier needs for its in-place
//! test. Snapshots are persisted in the plan store so later runs can resume
//! from storage alone.

pub mod locations;
pub mod object;

pub use locations::ExternalLocations;
pub use object::{DatabaseSnapshot, ObjectIdent, ObjectKind, ObjectMeta, StorageKind, TargetIdent};
