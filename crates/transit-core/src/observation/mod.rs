//! Drives one observation request end to end: saturation probe, exposure
//! plan, both transit phases, noise extraction and spectral aggregation.

mod phases;
mod result;
mod warnings;

pub use phases::{InTransitPhase, run_in_transit, run_out_of_transit, scale_by_transit_depth};
pub use result::{InputSummary, ObservationResult, OriginalInput};
pub use warnings::{HIGH_FULL_WELL_MESSAGE, WarningSet, build_warnings};

use crate::common::ObservationRequest;
use crate::domain::{CalculationMode, DetectorParameters, SaturationLevel, SimError, SimResult};
use crate::engine::{
    EngineReport, InstrumentEngine, NoiseExtraction, NoiseExtractionInput, NoiseExtractor,
    SpectrumBuilder, TransitSpectra,
};
use crate::spectral::{
    AggregationSettings, NativeSeries, NoiseRealization, RawSeries, aggregate_spectrum,
};
use crate::timing::{ExposurePlanInput, build_exposure_plan, probe_saturation};

pub struct ObservationSimulator<E, S, N> {
    engine: E,
    spectra: S,
    noise: N,
    realization: Option<NoiseRealization>,
}

impl<E, S, N> ObservationSimulator<E, S, N>
where
    E: InstrumentEngine,
    S: SpectrumBuilder,
    N: NoiseExtractor,
{
    pub fn new(engine: E, spectra: S, noise: N) -> Self {
        Self {
            engine,
            spectra,
            noise,
            realization: None,
        }
    }

    /// Overrides the realization otherwise derived from `observation.seed`.
    pub fn with_realization(mut self, realization: NoiseRealization) -> Self {
        self.realization = Some(realization);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn spectrum_builder(&self) -> &S {
        &self.spectra
    }

    pub fn noise_extractor(&self) -> &N {
        &self.noise
    }

    pub fn run(&self, request: &ObservationRequest) -> SimResult<ObservationResult> {
        request.validate()?;
        let mode = request.calculation_mode()?;
        let noise_floor = request.observation.noise_floor.resolve()?;
        let observation = &request.observation;

        let detector = DetectorParameters::from(
            self.engine.detector_parameters(&request.instrument)?,
        );
        let saturation = SaturationLevel::new(observation.sat_level, detector.full_well)?;

        let star = self.spectra.out_of_transit(&request.star)?;
        let spectra = self.spectra.both_transit(&star, &request.planet)?;
        let transit_duration = transit_duration_seconds(request, &spectra, mode)?;
        let base = request
            .instrument
            .with_spectrum(spectra.out_of_transit_spectrum());

        tracing::info!(instrument = %base.instrument, "computing duty cycle");
        let probe = probe_saturation(&self.engine, &base, saturation.electrons())?;
        let plan = build_exposure_plan(&ExposurePlanInput {
            probe,
            transit_duration_seconds: transit_duration,
            expfact_out: observation.fraction,
            noccultations: observation.noccultations,
        })?;
        tracing::info!(
            groups = plan.groups_per_integration,
            integrations_in = plan.integrations_in_transit,
            integrations_out = plan.integrations_out_of_transit,
            "finished duty cycle"
        );

        let out_of_transit = run_out_of_transit(&self.engine, &base, &plan, &spectra)?;
        let in_transit =
            run_in_transit(&self.engine, &base, &plan, &spectra, &out_of_transit, mode)?;
        let warning = build_warnings(&out_of_transit, &plan, &saturation, &base.instrument);

        let input = NoiseExtractionInput {
            in_transit: &in_transit,
            out_of_transit: &out_of_transit,
            read_noise: detector.read_noise,
            pixel_size_arcsec: detector.pixel_size_arcsec,
            plan: &plan,
        };
        let extraction = self.extract(mode, &input)?;
        let axis = native_axis(mode, &out_of_transit, &extraction)?;
        let series = NativeSeries::from_extraction(axis, &extraction)?;

        let settings = AggregationSettings {
            // Time axes are never rebinned by resolving power.
            resolution: if mode.uses_time_axis() {
                None
            } else {
                observation.resolution
            },
            noise_floor,
            unit: request.planet.f_unit,
            realization: self
                .realization
                .unwrap_or_else(|| NoiseRealization::from_seed(observation.seed)),
        };
        let final_spectrum = aggregate_spectrum(&series, &settings)?;
        tracing::debug!(bins = final_spectrum.wave.len(), "aggregated spectrum");

        let input = InputSummary::new(
            request.star.mag,
            &saturation,
            &out_of_transit,
            request.planet.f_unit,
            request.calculation_label(),
        );
        Ok(ObservationResult {
            original_input: OriginalInput::from(&spectra),
            raw_data: RawSeries::from(&series),
            final_spectrum,
            out_of_transit,
            timing: plan,
            warning,
            input,
        })
    }

    fn extract(
        &self,
        mode: CalculationMode,
        input: &NoiseExtractionInput<'_>,
    ) -> SimResult<NoiseExtraction> {
        match mode {
            CalculationMode::SlopeMethod => self.noise.slope_method(input),
            CalculationMode::TwoDExtract => self.noise.two_d_extract(input),
            CalculationMode::FluxMinusLast => self.noise.flux_minus_last(input),
            CalculationMode::PhaseSpectrum => self.noise.phase_spectrum(input),
        }
    }
}

fn transit_duration_seconds(
    request: &ObservationRequest,
    spectra: &TransitSpectra,
    mode: CalculationMode,
) -> SimResult<f64> {
    if mode.uses_time_axis() {
        return spectra.phase_curve_duration().ok_or_else(|| {
            SimError::computation(
                "RUN.PHASE_CURVE",
                "phase curve has no finite time samples",
            )
        });
    }
    request.planet.transit_duration.ok_or_else(|| {
        SimError::input_validation(
            "INPUT.TRANSIT_DURATION",
            "planet.transit_duration (seconds) is required outside phase-curve mode",
        )
    })
}

fn native_axis(
    mode: CalculationMode,
    out_of_transit: &EngineReport,
    extraction: &NoiseExtraction,
) -> SimResult<Vec<f64>> {
    match mode {
        CalculationMode::PhaseSpectrum => extraction.time.clone().ok_or_else(|| {
            SimError::computation(
                "RUN.NOISE_EXTRACTION",
                "phase spectrum extraction returned no time axis",
            )
        }),
        CalculationMode::SlopeMethod
        | CalculationMode::TwoDExtract
        | CalculationMode::FluxMinusLast => {
            Ok(out_of_transit.one_d.extracted_flux.wavelength.clone())
        }
    }
}
