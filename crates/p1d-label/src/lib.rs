#![deny(missing_docs)]
#![doc = "Polynomial shape fitting, astrophysical placeholders and snapshot labeling for P1D emulator training sets."]

pub mod astro;
/// Least-squares shape fit of the linear power around a pivot.
pub mod fit;
pub mod label;
/// 1D flux power measurement sources.
pub mod measure;

pub use astro::{estimate_astro, thermal_broadening_mpc, AstroDefaults, MeanFluxModel};
pub use fit::{fit_polynomial, summarize, LinPowerFitOpts, MAX_FIT_DEGREE};
pub use label::{label_simulation, label_snapshots, LabelOpts, SnapshotDataset};
pub use measure::{check_measurement, InMemoryP1d, JsonDirP1d, P1dSource};
