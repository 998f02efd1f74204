pub mod errors;

pub use errors::{SimError, SimErrorCategory, SimResult};

use crate::common::constants::{MAS_TO_ARCSEC, PERCENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Noise-extraction method; also decides which quantity is the native axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationMode {
    #[serde(rename = "slope")]
    SlopeMethod,
    #[serde(rename = "2d extract")]
    TwoDExtract,
    #[serde(rename = "fml")]
    FluxMinusLast,
    #[serde(rename = "phase_spec")]
    PhaseSpectrum,
}

impl CalculationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SlopeMethod => "slope",
            Self::TwoDExtract => "2d extract",
            Self::FluxMinusLast => "fml",
            Self::PhaseSpectrum => "phase_spec",
        }
    }

    /// Phase-curve runs use elapsed time as their axis instead of wavelength.
    pub const fn uses_time_axis(self) -> bool {
        matches!(self, Self::PhaseSpectrum)
    }
}

impl Display for CalculationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for CalculationMode {
    type Err = SimError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "slope" | "slope method" => Ok(Self::SlopeMethod),
            "2d extract" => Ok(Self::TwoDExtract),
            "fml" => Ok(Self::FluxMinusLast),
            "phase_spec" => Ok(Self::PhaseSpectrum),
            _ => Err(SimError::input_validation(
                "INPUT.CALCULATION_MODE",
                format!(
                    "calculation method '{}' not found; expected one of 'slope', '2d extract', 'fml', 'phase_spec'",
                    token
                ),
            )),
        }
    }
}

/// Unit convention of the planet model spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectrumUnit {
    /// Secondary eclipse, planet-to-star flux ratio.
    #[serde(rename = "fp/f*")]
    PlanetStarFluxRatio,
    /// Primary transit, fractional area.
    #[serde(rename = "rp^2/r*^2")]
    TransitDepth,
}

impl SpectrumUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlanetStarFluxRatio => "fp/f*",
            Self::TransitDepth => "rp^2/r*^2",
        }
    }

    /// Eclipse spectra are reported with the opposite sign of transit spectra.
    pub const fn sign(self) -> f64 {
        match self {
            Self::PlanetStarFluxRatio => -1.0,
            Self::TransitDepth => 1.0,
        }
    }
}

impl Display for SpectrumUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FluxSpectrum {
    pub wave: Vec<f64>,
    pub flux: Vec<f64>,
}

impl FluxSpectrum {
    pub fn new(wave: Vec<f64>, flux: Vec<f64>) -> Self {
        Self { wave, flux }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub ngroup: u64,
    pub nint: u64,
    pub nexp: u64,
}

impl DetectorSettings {
    /// Two groups, one integration, one exposure: the smallest readout that
    /// still yields a slope.
    pub const PROBE: Self = Self {
        ngroup: 2,
        nint: 1,
        nexp: 1,
    };

    pub const fn new(ngroup: u64, nint: u64, nexp: u64) -> Self {
        Self { ngroup, nint, nexp }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::PROBE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub instrument: String,
    pub mode: String,
    #[serde(default)]
    pub aperture: String,
    #[serde(default)]
    pub disperser: String,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub subarray: String,
    #[serde(default)]
    pub readmode: String,
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub spectrum: Option<FluxSpectrum>,
    /// Engine-specific settings passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl InstrumentConfig {
    pub fn with_spectrum(&self, spectrum: FluxSpectrum) -> Self {
        Self {
            spectrum: Some(spectrum),
            ..self.clone()
        }
    }

    pub fn with_detector(&self, detector: DetectorSettings) -> Self {
        Self {
            detector,
            ..self.clone()
        }
    }

    /// Configuration for one simulation phase, derived without touching the base.
    pub fn for_phase(&self, detector: DetectorSettings, spectrum: FluxSpectrum) -> Self {
        Self {
            detector,
            spectrum: Some(spectrum),
            ..self.clone()
        }
    }
}

/// Static detector properties as used by the noise model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParameters {
    pub full_well: f64,
    pub read_noise: f64,
    pub pixel_size_arcsec: f64,
}

impl DetectorParameters {
    /// Instrument engines quote pixel scale in milliarcseconds.
    pub fn from_engine(full_well: f64, read_noise: f64, pixel_size_mas: f64) -> Self {
        Self {
            full_well,
            read_noise,
            pixel_size_arcsec: pixel_size_mas * MAS_TO_ARCSEC,
        }
    }
}

/// User saturation threshold, given as a percentage of full well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationLevel {
    pub percent_of_full_well: f64,
    pub full_well: f64,
}

impl SaturationLevel {
    pub fn new(percent_of_full_well: f64, full_well: f64) -> SimResult<Self> {
        if !percent_of_full_well.is_finite()
            || percent_of_full_well <= 0.0
            || percent_of_full_well > 100.0
        {
            return Err(SimError::input_validation(
                "INPUT.SATURATION_LEVEL",
                format!(
                    "saturation level must be in (0, 100] percent of full well, got {}",
                    percent_of_full_well
                ),
            ));
        }
        if !full_well.is_finite() || full_well <= 0.0 {
            return Err(SimError::computation(
                "RUN.DETECTOR_FULL_WELL",
                format!("detector full well must be finite and > 0, got {}", full_well),
            ));
        }
        Ok(Self {
            percent_of_full_well,
            full_well,
        })
    }

    pub fn electrons(&self) -> f64 {
        self.percent_of_full_well * PERCENT * self.full_well
    }

    pub fn fraction_of_full_well(&self) -> f64 {
        self.percent_of_full_well * PERCENT
    }
}
