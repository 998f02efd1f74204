use crate::domain::{CalculationMode, DetectorSettings, InstrumentConfig, SimError, SimResult};
use crate::engine::{EngineReport, InstrumentEngine, TransitSpectra};
use crate::numerics::interpolate_clamped_onto;
use crate::timing::ExposurePlan;
use serde::{Deserialize, Serialize};

/// In-transit side of an observation, one variant per way of obtaining it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InTransitPhase {
    /// Full engine run with the in-transit spectrum (slope, 2d extract).
    Simulated(EngineReport),
    /// Out-of-transit report with its 1d flux scaled by the transit depth (fml).
    FluxScaled(EngineReport),
    /// Phase curve straight from the spectrum builder; no detector simulation.
    PhaseCurve {
        time: Vec<f64>,
        planet_phase: Vec<f64>,
    },
}

impl InTransitPhase {
    pub fn report(&self) -> Option<&EngineReport> {
        match self {
            Self::Simulated(report) | Self::FluxScaled(report) => Some(report),
            Self::PhaseCurve { .. } => None,
        }
    }
}

fn phase_detector(plan: &ExposurePlan, integrations: u64) -> DetectorSettings {
    DetectorSettings::new(plan.groups_per_integration, integrations, 1)
}

pub fn run_out_of_transit<E>(
    engine: &E,
    base: &InstrumentConfig,
    plan: &ExposurePlan,
    spectra: &TransitSpectra,
) -> SimResult<EngineReport>
where
    E: InstrumentEngine + ?Sized,
{
    tracing::info!(
        groups = plan.groups_per_integration,
        integrations = plan.integrations_out_of_transit,
        "starting out-of-transit simulation"
    );
    let config = base.for_phase(
        phase_detector(plan, plan.integrations_out_of_transit),
        spectra.out_of_transit_spectrum(),
    );
    let report = engine.run(&config)?.without_cube();
    tracing::info!("finished out-of-transit simulation");
    Ok(report)
}

pub fn run_in_transit<E>(
    engine: &E,
    base: &InstrumentConfig,
    plan: &ExposurePlan,
    spectra: &TransitSpectra,
    out_of_transit: &EngineReport,
    mode: CalculationMode,
) -> SimResult<InTransitPhase>
where
    E: InstrumentEngine + ?Sized,
{
    tracing::info!(mode = %mode, "starting in-transit phase");
    let phase = match mode {
        CalculationMode::PhaseSpectrum => InTransitPhase::PhaseCurve {
            time: spectra.time.clone(),
            planet_phase: spectra.planet_phase.clone(),
        },
        CalculationMode::FluxMinusLast => {
            InTransitPhase::FluxScaled(scale_by_transit_depth(out_of_transit, spectra)?)
        }
        CalculationMode::SlopeMethod | CalculationMode::TwoDExtract => {
            let config = base.for_phase(
                phase_detector(plan, plan.integrations_in_transit),
                spectra.in_transit_spectrum(),
            );
            InTransitPhase::Simulated(engine.run(&config)?.without_cube())
        }
    };
    tracing::info!(mode = %mode, "finished in-transit phase");
    Ok(phase)
}

/// Copies `out_of_transit` and multiplies its 1d flux by `frac`, interpolated
/// onto the report's wavelengths.
pub fn scale_by_transit_depth(
    out_of_transit: &EngineReport,
    spectra: &TransitSpectra,
) -> SimResult<EngineReport> {
    let mut report = out_of_transit.clone();
    let extracted = &mut report.one_d.extracted_flux;
    if extracted.flux.len() != extracted.wavelength.len() {
        return Err(SimError::computation(
            "RUN.EXTRACTED_FLUX",
            format!(
                "extracted flux has {} samples but {} wavelengths",
                extracted.flux.len(),
                extracted.wavelength.len()
            ),
        ));
    }

    let depth = interpolate_clamped_onto(&extracted.wavelength, &spectra.wave, &spectra.frac)
        .map_err(|error| {
            SimError::computation(
                "RUN.TRANSIT_DEPTH",
                format!("transit depth curve cannot be interpolated: {}", error),
            )
        })?;
    for (flux, depth) in extracted.flux.iter_mut().zip(depth) {
        *flux *= depth;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{InTransitPhase, scale_by_transit_depth};
    use crate::domain::{DetectorSettings, InstrumentConfig};
    use crate::engine::{
        EngineReport, ExposureSpecification, ExtractedFlux, OneDimensionalOutput,
        ReportInformation, TransitSpectra, TwoDimensionalOutput,
    };
    use std::collections::BTreeMap;

    fn report(wavelength: Vec<f64>, flux: Vec<f64>) -> EngineReport {
        EngineReport {
            one_d: OneDimensionalOutput {
                extracted_flux: ExtractedFlux { wavelength, flux },
                other: BTreeMap::new(),
            },
            two_d: TwoDimensionalOutput::default(),
            three_d: None,
            information: ReportInformation {
                exposure_specification: ExposureSpecification {
                    tframe: 1.0,
                    nframe: 1,
                    nskip: 0,
                    ngroup: 2,
                    other: BTreeMap::new(),
                },
                other: BTreeMap::new(),
            },
            warnings: BTreeMap::new(),
            input: InstrumentConfig {
                instrument: "miri".to_string(),
                mode: "lrsslitless".to_string(),
                aperture: String::new(),
                disperser: String::new(),
                filter: String::new(),
                subarray: String::new(),
                readmode: String::new(),
                detector: DetectorSettings::PROBE,
                spectrum: None,
                extra: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn flux_scaling_interpolates_depth_and_keeps_source() {
        let out = report(vec![1.0, 1.5, 3.0], vec![100.0, 100.0, 100.0]);
        let spectra = TransitSpectra {
            wave: vec![1.0, 2.0],
            frac: vec![0.99, 0.97],
            ..TransitSpectra::default()
        };

        let scaled = scale_by_transit_depth(&out, &spectra).expect("scaled report");
        let flux = &scaled.one_d.extracted_flux.flux;
        assert!((flux[0] - 99.0).abs() <= 1.0e-12);
        assert!((flux[1] - 98.0).abs() <= 1.0e-12);
        assert!((flux[2] - 97.0).abs() <= 1.0e-12);
        assert_eq!(out.one_d.extracted_flux.flux, vec![100.0, 100.0, 100.0]);
        assert_eq!(
            scaled.one_d.extracted_flux.wavelength,
            out.one_d.extracted_flux.wavelength
        );
    }

    #[test]
    fn flux_scaling_rejects_unusable_depth_curve() {
        let out = report(vec![1.0, 2.0], vec![1.0, 1.0]);
        let error = scale_by_transit_depth(&out, &TransitSpectra::default())
            .expect_err("empty depth curve");
        assert_eq!(error.placeholder(), "RUN.TRANSIT_DEPTH");

        let ragged = report(vec![1.0, 2.0], vec![1.0]);
        let error = scale_by_transit_depth(&ragged, &TransitSpectra::default())
            .expect_err("ragged flux");
        assert_eq!(error.placeholder(), "RUN.EXTRACTED_FLUX");
    }

    #[test]
    fn phase_curve_carries_no_report() {
        let phase = InTransitPhase::PhaseCurve {
            time: vec![0.0, 1.0],
            planet_phase: vec![0.0, 0.5],
        };
        assert!(phase.report().is_none());
        let simulated = InTransitPhase::Simulated(report(vec![1.0], vec![1.0]));
        assert!(simulated.report().is_some());
    }
}
