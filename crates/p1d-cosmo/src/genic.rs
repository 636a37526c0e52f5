//! Reader for MP-GenIC initial-condition parameter files.
//!
//! Only the cosmological subset of the file is interpreted; grid, seed, output
//! and unit-system keys are retained verbatim but otherwise ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use p1d_core::{CosmologicalParameters, ErrorInfo, LabelError, NEUTRINO_MASS_PER_OMEGA_EV};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn config_error(code: &str, message: impl Into<String>) -> LabelError {
    LabelError::ConfigParse(ErrorInfo::new(code, message.into()))
}

/// Raw value of a single `key = value` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamEntry {
    /// Unparsed value text.
    pub value: String,
    /// One-based line number in the source file.
    pub line: usize,
}

/// Key/value view of a parameter file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParamFile {
    entries: BTreeMap<String, ParamEntry>,
}

impl ParamFile {
    /// Parses `key value` or `key = value` lines; `#` and `%` start comments.
    pub fn parse(text: &str) -> Result<Self, LabelError> {
        let mut entries = BTreeMap::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw
                .split(|c: char| c == '#' || c == '%')
                .next()
                .unwrap_or("")
                .trim();
            if content.is_empty() {
                continue;
            }
            let (key, value) = match content.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => match content.split_once(char::is_whitespace) {
                    Some((key, value)) => (key.trim(), value.trim()),
                    None => (content, ""),
                },
            };
            if key.is_empty() || value.is_empty() {
                return Err(LabelError::ConfigParse(
                    ErrorInfo::new("malformed-line", "expected `key = value`")
                        .with_context("line", line)
                        .with_context("text", content),
                ));
            }
            let entry = ParamEntry {
                value: value.to_string(),
                line,
            };
            if let Some(previous) = entries.insert(key.to_string(), entry) {
                return Err(LabelError::ConfigParse(
                    ErrorInfo::new("duplicate-key", format!("{key} is defined twice"))
                        .with_context("key", key)
                        .with_context("first_line", previous.line)
                        .with_context("line", line),
                ));
            }
        }
        Ok(Self { entries })
    }

    /// Reads and parses a parameter file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).map_err(|err| LabelError::io("read-param-file", path, err))?;
        Self::parse(&text)
    }

    /// Returns the raw entry for a key.
    pub fn get(&self, key: &str) -> Option<&ParamEntry> {
        self.entries.get(key)
    }

    /// Number of parsed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file contained no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn float(&self, key: &str, default: Option<f64>) -> Result<f64, LabelError> {
        match (self.entries.get(key), default) {
            (Some(entry), _) => entry.value.parse::<f64>().map_err(|_| {
                LabelError::ConfigParse(
                    ErrorInfo::new("invalid-value", format!("{key} is not a number"))
                        .with_context("key", key)
                        .with_context("line", entry.line)
                        .with_context("value", &entry.value),
                )
            }),
            (None, Some(value)) => Ok(value),
            (None, None) => Err(LabelError::ConfigParse(
                ErrorInfo::new("missing-key", format!("{key} is required"))
                    .with_context("key", key)
                    .with_hint(format!("add `{key} = <value>` to the parameter file")),
            )),
        }
    }

    fn integer(&self, key: &str, default: i64) -> Result<i64, LabelError> {
        match self.entries.get(key) {
            Some(entry) => entry.value.parse::<i64>().map_err(|_| {
                LabelError::ConfigParse(
                    ErrorInfo::new("invalid-value", format!("{key} is not an integer"))
                        .with_context("key", key)
                        .with_context("line", entry.line)
                        .with_context("value", &entry.value),
                )
            }),
            None => Ok(default),
        }
    }

    fn bounded(
        &self,
        key: &str,
        default: Option<f64>,
        min: f64,
        max: f64,
    ) -> Result<f64, LabelError> {
        let value = self.float(key, default)?;
        if !(min..=max).contains(&value) {
            return Err(LabelError::ConfigParse(
                ErrorInfo::new("invalid-value", format!("{key} must lie in [{min}, {max}]"))
                    .with_context("key", key)
                    .with_context("value", value),
            ));
        }
        Ok(value)
    }
}

/// Cosmology-relevant subset of an MP-GenIC parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenicCosmology {
    /// Total matter density parameter.
    pub omega0: f64,
    /// Cosmological constant density parameter.
    pub omega_lambda: f64,
    /// Baryon density parameter.
    pub omega_baryon: f64,
    /// Dimensionless Hubble parameter.
    pub hubble_param: f64,
    /// Requested sigma_8 normalisation (negative when unset).
    pub sigma8: f64,
    /// Redshift of an externally supplied input power (negative when unset).
    pub input_power_redshift: f64,
    /// Whether separate baryon/CDM transfer functions are used.
    pub different_transfer_functions: i64,
    /// Dark energy fluid density.
    pub omega_fld: f64,
    /// Dark energy equation of state today.
    pub w0_fld: f64,
    /// Dark energy equation of state evolution.
    pub wa_fld: f64,
    /// Electron neutrino mass in eV.
    pub mnue: f64,
    /// Muon neutrino mass in eV.
    pub mnum: f64,
    /// Tau neutrino mass in eV.
    pub mnut: f64,
    /// Thermal warm dark matter mass in keV.
    pub mwdm_therm: f64,
    /// Primordial scalar spectral index.
    pub primordial_index: f64,
    /// Primordial scalar amplitude.
    pub primordial_amp: f64,
    /// CMB temperature in Kelvin.
    pub cmb_temperature: f64,
}

impl GenicCosmology {
    /// Extracts and range-checks the cosmological keys.
    pub fn from_param_file(file: &ParamFile) -> Result<Self, LabelError> {
        let cosmo = Self {
            omega0: file.bounded("Omega0", None, 0.0, 1.0)?,
            omega_lambda: file.bounded("OmegaLambda", None, 0.0, 1.0)?,
            omega_baryon: file.bounded("OmegaBaryon", Some(0.0486), 0.0, 1.0)?,
            hubble_param: file.bounded("HubbleParam", None, 0.0, 2.0)?,
            sigma8: file.float("Sigma8", Some(-1.0))?,
            input_power_redshift: file.float("InputPowerRedshift", Some(-1.0))?,
            different_transfer_functions: file.integer("DifferentTransferFunctions", 1)?,
            omega_fld: file.bounded("Omega_fld", Some(0.0), 0.0, 1.0)?,
            w0_fld: file.float("w0_fld", Some(-1.0))?,
            wa_fld: file.float("wa_fld", Some(0.0))?,
            mnue: file.bounded("MNue", Some(0.0), 0.0, f64::INFINITY)?,
            mnum: file.bounded("MNum", Some(0.0), 0.0, f64::INFINITY)?,
            mnut: file.bounded("MNut", Some(0.0), 0.0, f64::INFINITY)?,
            mwdm_therm: file.bounded("MWDM_Therm", Some(0.0), 0.0, f64::INFINITY)?,
            primordial_index: file.float("PrimordialIndex", Some(0.971))?,
            primordial_amp: file.float("PrimordialAmp", Some(2.215e-9))?,
            cmb_temperature: file.float("CMBTemperature", Some(2.7255))?,
        };
        if cosmo.hubble_param <= 0.0 {
            return Err(config_error("invalid-value", "HubbleParam must be positive"));
        }
        if !(0..=1).contains(&cosmo.different_transfer_functions) {
            return Err(config_error(
                "invalid-value",
                "DifferentTransferFunctions must be 0 or 1",
            ));
        }
        cosmo.check_supported()?;
        Ok(cosmo)
    }

    fn check_supported(&self) -> Result<(), LabelError> {
        let unsupported = |key: &str, message: &str| -> Result<(), LabelError> {
            Err(LabelError::ConfigParse(
                ErrorInfo::new("unsupported-option", message).with_context("key", key),
            ))
        };
        if self.different_transfer_functions == 0 {
            return unsupported(
                "DifferentTransferFunctions",
                "can only work with different transfer functions",
            );
        }
        if self.input_power_redshift > 0.0 {
            return unsupported("InputPowerRedshift", "can not specify input redshift");
        }
        if self.sigma8 > 0.0 {
            return unsupported("Sigma8", "can not specify Sigma8");
        }
        if self.omega_fld > 0.0 {
            return unsupported("Omega_fld", "Omega_fld > 0 not supported");
        }
        if self.w0_fld != -1.0 {
            return unsupported("w0_fld", "w0_fld != -1 not supported");
        }
        if self.wa_fld != 0.0 {
            return unsupported("wa_fld", "wa_fld != 0 not supported");
        }
        if self.mwdm_therm > 0.0 {
            return unsupported("MWDM_Therm", "warm dark matter cutoff not supported");
        }
        Ok(())
    }

    /// Sum of the three neutrino masses in eV.
    pub fn neutrino_mass_sum(&self) -> f64 {
        self.mnue + self.mnum + self.mnut
    }

    /// Translates the GenIC parameters into physical densities.
    pub fn to_cosmology(&self) -> Result<CosmologicalParameters, LabelError> {
        let h = self.hubble_param;
        let mnu = self.neutrino_mass_sum();
        let omega_nu = mnu / NEUTRINO_MASS_PER_OMEGA_EV / (h * h);
        let omega_cdm = self.omega0 - self.omega_baryon - omega_nu;
        if omega_cdm < 0.0 {
            return Err(LabelError::ConfigParse(
                ErrorInfo::new(
                    "invalid-value",
                    "Omega0 is smaller than the baryon plus neutrino densities",
                )
                .with_context("omega_cdm", omega_cdm),
            ));
        }
        Ok(CosmologicalParameters {
            h0: 100.0 * h,
            ombh2: self.omega_baryon * h * h,
            omch2: omega_cdm * h * h,
            mnu,
            omk: 1.0 - self.omega_lambda - self.omega0,
            t_cmb: self.cmb_temperature,
            a_s: self.primordial_amp,
            n_s: self.primordial_index,
        })
    }
}

/// Parses GenIC parameter text straight into cosmological parameters.
pub fn cosmology_from_genic_str(text: &str) -> Result<CosmologicalParameters, LabelError> {
    let file = ParamFile::parse(text)?;
    let genic = GenicCosmology::from_param_file(&file)?;
    let cosmo = genic.to_cosmology()?;
    debug!(keys = file.len(), h0 = cosmo.h0, omk = cosmo.omk, "parsed genic cosmology");
    Ok(cosmo)
}

/// Reads a GenIC parameter file from disk and returns its cosmology.
pub fn cosmology_from_genic_path(
    path: impl AsRef<Path>,
) -> Result<CosmologicalParameters, LabelError> {
    let file = ParamFile::from_path(path)?;
    GenicCosmology::from_param_file(&file)?.to_cosmology()
}
