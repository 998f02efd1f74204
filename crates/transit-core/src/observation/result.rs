use super::WarningSet;
use crate::domain::{SaturationLevel, SpectrumUnit};
use crate::engine::{EngineReport, TransitSpectra};
use crate::spectral::{BinnedSpectrum, RawSeries};
use crate::timing::ExposurePlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalInput {
    pub model_spec: Vec<f64>,
    pub model_wave: Vec<f64>,
}

impl From<&TransitSpectra> for OriginalInput {
    fn from(spectra: &TransitSpectra) -> Self {
        Self {
            model_spec: spectra.model_spec.clone(),
            model_wave: spectra.model_wave.clone(),
        }
    }
}

/// Compact record of the settings an observation ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSummary {
    #[serde(rename = "Target Mag")]
    pub target_mag: f64,
    #[serde(rename = "Saturation Level (electrons)")]
    pub saturation_electrons: f64,
    #[serde(rename = "Instrument")]
    pub instrument: String,
    #[serde(rename = "Mode")]
    pub mode: String,
    #[serde(rename = "Aperture")]
    pub aperture: String,
    #[serde(rename = "Disperser")]
    pub disperser: String,
    #[serde(rename = "Subarray")]
    pub subarray: String,
    #[serde(rename = "Readmode")]
    pub readmode: String,
    #[serde(rename = "Filter")]
    pub filter: String,
    #[serde(rename = "Primary/Secondary")]
    pub unit: SpectrumUnit,
    #[serde(rename = "Calculation Type")]
    pub calculation: String,
}

impl InputSummary {
    /// Instrument fields are taken from the configuration the out-of-transit
    /// report was produced with.
    pub fn new(
        target_mag: f64,
        saturation: &SaturationLevel,
        out_of_transit: &EngineReport,
        unit: SpectrumUnit,
        calculation: String,
    ) -> Self {
        let config = &out_of_transit.input;
        Self {
            target_mag,
            saturation_electrons: saturation.electrons(),
            instrument: config.instrument.clone(),
            mode: config.mode.clone(),
            aperture: config.aperture.clone(),
            disperser: config.disperser.clone(),
            subarray: config.subarray.clone(),
            readmode: config.readmode.clone(),
            filter: config.filter.clone(),
            unit,
            calculation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationResult {
    #[serde(rename = "OriginalInput")]
    pub original_input: OriginalInput,
    #[serde(rename = "RawData")]
    pub raw_data: RawSeries,
    #[serde(rename = "FinalSpectrum")]
    pub final_spectrum: BinnedSpectrum,
    #[serde(rename = "OutOfTransit")]
    pub out_of_transit: EngineReport,
    pub timing: ExposurePlan,
    pub warning: WarningSet,
    pub input: InputSummary,
}
