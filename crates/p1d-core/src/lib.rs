#![deny(missing_docs)]
#![doc = "Core data model, error surface and serialization helpers for labeling P1D simulation snapshots."]

pub mod errors;
/// Stable content hashing helpers.
pub mod hash;
pub mod provenance;
pub mod serde;
mod types;

pub use errors::{ErrorInfo, LabelError};
pub use hash::stable_hash_string;
pub use provenance::{DatasetProvenance, SchemaVersion};
pub use types::{
    AstroParameters, CosmologicalParameters, EmulatorParams, LinPowerSummary, P1dMeasurement,
    PowerFitParameters, SnapshotRecord, NEUTRINO_MASS_PER_OMEGA_EV,
};
