//! Seams to the external collaborators: the instrument engine, the spectrum
//! builder and the noise extractor. The core only drives them.

mod report;

pub use report::{
    EngineReport, ExposureSpecification, ExtractedFlux, NONLINEAR_WARNING_KEY,
    OneDimensionalOutput, ReportInformation, SATURATED_WARNING_KEY, TwoDimensionalOutput,
};

use crate::common::{PlanetConfig, StarConfig};
use crate::domain::{DetectorParameters, FluxSpectrum, InstrumentConfig, SimResult};
use crate::observation::InTransitPhase;
use crate::timing::ExposurePlan;
use serde::{Deserialize, Serialize};

/// Detector properties as quoted by the instrument engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorProperties {
    pub full_well: f64,
    pub read_noise: f64,
    pub pixel_size_mas: f64,
}

impl From<DetectorProperties> for DetectorParameters {
    fn from(properties: DetectorProperties) -> Self {
        DetectorParameters::from_engine(
            properties.full_well,
            properties.read_noise,
            properties.pixel_size_mas,
        )
    }
}

pub trait InstrumentEngine {
    fn detector_parameters(&self, config: &InstrumentConfig) -> SimResult<DetectorProperties>;

    /// Blocking full simulation of one configuration.
    fn run(&self, config: &InstrumentConfig) -> SimResult<EngineReport>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransitSpectra {
    pub wave: Vec<f64>,
    pub flux_out_trans: Vec<f64>,
    pub flux_in_trans: Vec<f64>,
    /// In-transit to out-of-transit flux ratio versus `wave`.
    pub frac: Vec<f64>,
    #[serde(default)]
    pub time: Vec<f64>,
    #[serde(default)]
    pub planet_phase: Vec<f64>,
    pub model_spec: Vec<f64>,
    pub model_wave: Vec<f64>,
}

impl TransitSpectra {
    pub fn out_of_transit_spectrum(&self) -> FluxSpectrum {
        FluxSpectrum::new(self.wave.clone(), self.flux_out_trans.clone())
    }

    pub fn in_transit_spectrum(&self) -> FluxSpectrum {
        FluxSpectrum::new(self.wave.clone(), self.flux_in_trans.clone())
    }

    /// Time span of the phase curve, when there is one.
    pub fn phase_curve_duration(&self) -> Option<f64> {
        crate::numerics::finite_extent(&self.time).map(|(start, end)| end - start)
    }
}

pub trait SpectrumBuilder {
    fn out_of_transit(&self, star: &StarConfig) -> SimResult<FluxSpectrum>;

    fn both_transit(&self, star: &FluxSpectrum, planet: &PlanetConfig)
    -> SimResult<TransitSpectra>;
}

#[derive(Debug, Clone, Copy)]
pub struct NoiseExtractionInput<'a> {
    pub in_transit: &'a InTransitPhase,
    pub out_of_transit: &'a EngineReport,
    pub read_noise: f64,
    pub pixel_size_arcsec: f64,
    pub plan: &'a ExposurePlan,
}

/// Per-axis photon counts and variances, aligned to the native axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NoiseExtraction {
    pub var_in_1d: Vec<f64>,
    pub var_out_1d: Vec<f64>,
    pub photon_in_1d: Vec<f64>,
    pub photon_out_1d: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Vec<f64>>,
}

pub trait NoiseExtractor {
    fn slope_method(&self, input: &NoiseExtractionInput<'_>) -> SimResult<NoiseExtraction>;

    fn two_d_extract(&self, input: &NoiseExtractionInput<'_>) -> SimResult<NoiseExtraction>;

    fn flux_minus_last(&self, input: &NoiseExtractionInput<'_>) -> SimResult<NoiseExtraction>;

    fn phase_spectrum(&self, input: &NoiseExtractionInput<'_>) -> SimResult<NoiseExtraction>;
}
