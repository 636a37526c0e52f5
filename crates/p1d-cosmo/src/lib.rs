#![deny(missing_docs)]
#![doc = "Cosmology loading, expansion history and linear matter power backends used to label P1D snapshots."]

pub mod background;
pub mod genic;
pub mod linear;
/// Analytic matter transfer functions.
pub mod transfer;

pub use background::{BackgroundOpts, DensityBudget, ExpansionHistory, FriedmannBackground};
pub use genic::{cosmology_from_genic_path, cosmology_from_genic_str, GenicCosmology, ParamFile};
pub use linear::{
    align_to_requested, AlignedLinearPower, EisensteinHuProvider, KGridSpec, LinearPowerOpts,
    LinearPowerProvider, LinearPowerTable,
};
pub use transfer::NoWiggleTransfer;
