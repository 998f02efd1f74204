//! Spectral aggregation: resolution rebinning, tophat summation, noise-floor
//! injection and assembly of the differential spectrum.

mod binning;
mod noise_floor;

pub use binning::{bin_wave_to_r, uniform_tophat_sum};
pub use noise_floor::{NoiseFloor, NoiseFloorTable, NoiseFloorTableError, add_noise_floor};

use crate::domain::{SimError, SpectrumUnit};
use crate::engine::NoiseExtraction;
use crate::numerics::InterpolationError;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng, thread_rng};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectralError {
    #[error("{field} has {actual} samples, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("noise floor must be finite and >= 0 ppm, got {ppm}")]
    InvalidFloor { ppm: f64 },
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

impl From<SpectralError> for SimError {
    fn from(error: SpectralError) -> Self {
        SimError::computation("RUN.SPECTRAL_AGGREGATION", error.to_string())
    }
}

/// Photon counts and variances on the native wavelength (or time) axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeSeries {
    pub wave: Vec<f64>,
    pub photon_out: Vec<f64>,
    pub photon_in: Vec<f64>,
    pub var_out: Vec<f64>,
    pub var_in: Vec<f64>,
}

impl NativeSeries {
    pub fn new(
        wave: Vec<f64>,
        photon_out: Vec<f64>,
        photon_in: Vec<f64>,
        var_out: Vec<f64>,
        var_in: Vec<f64>,
    ) -> Result<Self, SpectralError> {
        let series = Self {
            wave,
            photon_out,
            photon_in,
            var_out,
            var_in,
        };
        series.validate()?;
        Ok(series)
    }

    pub fn from_extraction(
        axis: Vec<f64>,
        extraction: &NoiseExtraction,
    ) -> Result<Self, SpectralError> {
        Self::new(
            axis,
            extraction.photon_out_1d.clone(),
            extraction.photon_in_1d.clone(),
            extraction.var_out_1d.clone(),
            extraction.var_in_1d.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), SpectralError> {
        let expected = self.wave.len();
        let columns = [
            ("photon_out", self.photon_out.len()),
            ("photon_in", self.photon_in.len()),
            ("var_out", self.var_out.len()),
            ("var_in", self.var_in.len()),
        ];
        for (field, actual) in columns {
            if actual != expected {
                return Err(SpectralError::LengthMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.wave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }

    /// Fractional error before any floor is applied.
    pub fn error_no_floor(&self) -> Vec<f64> {
        self.var_in
            .iter()
            .zip(&self.var_out)
            .zip(&self.photon_out)
            .map(|((var_in, var_out), flux_out)| (var_in + var_out).sqrt() / flux_out)
            .collect()
    }
}

/// Unbinned series as reported alongside the binned spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub flux_out: Vec<f64>,
    pub flux_in: Vec<f64>,
    pub var_in: Vec<f64>,
    pub var_out: Vec<f64>,
    pub wave: Vec<f64>,
    pub error_no_floor: Vec<f64>,
}

impl From<&NativeSeries> for RawSeries {
    fn from(series: &NativeSeries) -> Self {
        Self {
            flux_out: series.photon_out.clone(),
            flux_in: series.photon_in.clone(),
            var_in: series.var_in.clone(),
            var_out: series.var_out.clone(),
            wave: series.wave.clone(),
            error_no_floor: series.error_no_floor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedSpectrum {
    pub wave: Vec<f64>,
    pub spectrum: Vec<f64>,
    pub spectrum_w_rand: Vec<f64>,
    pub error_w_floor: Vec<f64>,
}

/// Source of the Gaussian draws in `spectrum_w_rand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseRealization {
    #[default]
    Entropy,
    Seeded(u64),
    /// No draws; `spectrum_w_rand` equals `spectrum`.
    Disabled,
}

impl NoiseRealization {
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or(Self::Entropy, Self::Seeded)
    }

    fn draws(self, sigma: &[f64]) -> Option<Vec<f64>> {
        let seed = match self {
            Self::Disabled => return None,
            Self::Seeded(seed) => seed,
            Self::Entropy => thread_rng().next_u64(),
        };
        let mut rng = StdRng::seed_from_u64(seed);
        Some(
            sigma
                .iter()
                .map(|sigma| {
                    let draw: f64 = StandardNormal.sample(&mut rng);
                    sigma * draw
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// Target resolving power; `None` keeps the native axis.
    pub resolution: Option<f64>,
    pub noise_floor: NoiseFloor,
    pub unit: SpectrumUnit,
    #[serde(default)]
    pub realization: NoiseRealization,
}

fn rebin(
    series: &NativeSeries,
    resolution: Option<f64>,
) -> Result<NativeSeries, SpectralError> {
    let Some(resolution) = resolution else {
        return Ok(series.clone());
    };

    let wave = bin_wave_to_r(&series.wave, resolution);
    Ok(NativeSeries {
        photon_out: uniform_tophat_sum(&wave, &series.wave, &series.photon_out)?,
        photon_in: uniform_tophat_sum(&wave, &series.wave, &series.photon_in)?,
        var_out: uniform_tophat_sum(&wave, &series.wave, &series.var_out)?,
        var_in: uniform_tophat_sum(&wave, &series.wave, &series.var_in)?,
        wave,
    })
}

/// Rebins `series`, applies the error floor and assembles the nominal and
/// randomized differential spectra.
pub fn aggregate_spectrum(
    series: &NativeSeries,
    settings: &AggregationSettings,
) -> Result<BinnedSpectrum, SpectralError> {
    series.validate()?;
    let binned = rebin(series, settings.resolution)?;

    let sigma: Vec<f64> = binned
        .var_in
        .iter()
        .zip(&binned.var_out)
        .map(|(var_in, var_out)| (var_in + var_out).sqrt())
        .collect();
    let error_spec: Vec<f64> = sigma
        .iter()
        .zip(&binned.photon_out)
        .map(|(sigma, flux_out)| sigma / flux_out)
        .collect();
    let error_w_floor = add_noise_floor(&settings.noise_floor, &binned.wave, &error_spec)?;

    let sign = settings.unit.sign();
    let spectrum: Vec<f64> = binned
        .photon_out
        .iter()
        .zip(&binned.photon_in)
        .map(|(flux_out, flux_in)| sign * ((flux_out - flux_in) / flux_out))
        .collect();
    let spectrum_w_rand = match settings.realization.draws(&sigma) {
        Some(noise) => binned
            .photon_out
            .iter()
            .zip(&binned.photon_in)
            .zip(noise)
            .map(|((flux_out, flux_in), noise)| sign * ((flux_out - flux_in + noise) / flux_out))
            .collect(),
        None => spectrum.clone(),
    };

    Ok(BinnedSpectrum {
        wave: binned.wave,
        spectrum,
        spectrum_w_rand,
        error_w_floor,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        AggregationSettings, NativeSeries, NoiseFloor, NoiseRealization, RawSeries,
        SpectralError, aggregate_spectrum,
    };
    use crate::domain::SpectrumUnit;

    fn series() -> NativeSeries {
        let count = 1000;
        let wave: Vec<f64> = (0..count)
            .map(|index| 1.0 + index as f64 / (count - 1) as f64)
            .collect();
        NativeSeries::new(
            wave,
            vec![100.0; count],
            vec![99.0; count],
            vec![4.0; count],
            vec![5.0; count],
        )
        .expect("aligned series")
    }

    fn settings(unit: SpectrumUnit, realization: NoiseRealization) -> AggregationSettings {
        AggregationSettings {
            resolution: Some(10.0),
            noise_floor: NoiseFloor::Constant { ppm: 0.0 },
            unit,
            realization,
        }
    }

    fn bits(values: &[f64]) -> Vec<u64> {
        values.iter().map(|value| value.to_bits()).collect()
    }

    #[test]
    fn binned_spectrum_is_the_differential_depth() {
        let binned = aggregate_spectrum(
            &series(),
            &settings(SpectrumUnit::TransitDepth, NoiseRealization::Disabled),
        )
        .expect("aggregate");

        assert_eq!(binned.wave.len(), 11);
        assert_eq!(binned.spectrum.len(), 11);
        assert_eq!(binned.error_w_floor.len(), 11);
        for depth in &binned.spectrum {
            assert!((depth - 0.01).abs() <= 1.0e-12, "depth {depth}");
        }
        assert_eq!(bits(&binned.spectrum), bits(&binned.spectrum_w_rand));
    }

    #[test]
    fn eclipse_unit_negates_both_spectra() {
        let native = series();
        let transit = aggregate_spectrum(
            &native,
            &settings(SpectrumUnit::TransitDepth, NoiseRealization::Seeded(7)),
        )
        .expect("transit");
        let eclipse = aggregate_spectrum(
            &native,
            &settings(SpectrumUnit::PlanetStarFluxRatio, NoiseRealization::Seeded(7)),
        )
        .expect("eclipse");

        for (lhs, rhs) in transit.spectrum.iter().zip(&eclipse.spectrum) {
            assert_eq!(*lhs, -*rhs);
        }
        for (lhs, rhs) in transit.spectrum_w_rand.iter().zip(&eclipse.spectrum_w_rand) {
            assert_eq!(*lhs, -*rhs);
        }
        assert_eq!(transit.error_w_floor, eclipse.error_w_floor);
    }

    #[test]
    fn disabled_realization_is_byte_identical_across_runs() {
        let native = series();
        let settings = settings(SpectrumUnit::TransitDepth, NoiseRealization::Disabled);
        let first = aggregate_spectrum(&native, &settings).expect("first");
        let second = aggregate_spectrum(&native, &settings).expect("second");

        assert_eq!(bits(&first.wave), bits(&second.wave));
        assert_eq!(bits(&first.spectrum), bits(&second.spectrum));
        assert_eq!(bits(&first.spectrum_w_rand), bits(&second.spectrum_w_rand));
        assert_eq!(bits(&first.error_w_floor), bits(&second.error_w_floor));
    }

    #[test]
    fn seeded_realization_is_reproducible_and_noisy() {
        let native = series();
        let seeded = settings(SpectrumUnit::TransitDepth, NoiseRealization::Seeded(42));
        let first = aggregate_spectrum(&native, &seeded).expect("first");
        let second = aggregate_spectrum(&native, &seeded).expect("second");
        assert_eq!(bits(&first.spectrum_w_rand), bits(&second.spectrum_w_rand));
        assert_ne!(bits(&first.spectrum_w_rand), bits(&first.spectrum));

        let other = aggregate_spectrum(
            &native,
            &settings(SpectrumUnit::TransitDepth, NoiseRealization::Seeded(43)),
        )
        .expect("other seed");
        assert_ne!(bits(&first.spectrum_w_rand), bits(&other.spectrum_w_rand));
    }

    #[test]
    fn missing_resolution_keeps_native_axis_and_applies_floor() {
        let native = NativeSeries::new(
            vec![1.0, 2.0, 3.0],
            vec![1.0e6; 3],
            vec![0.99e6; 3],
            vec![1.0; 3],
            vec![0.0; 3],
        )
        .expect("series");
        let settings = AggregationSettings {
            resolution: None,
            noise_floor: NoiseFloor::Constant { ppm: 20.0 },
            unit: SpectrumUnit::TransitDepth,
            realization: NoiseRealization::Disabled,
        };
        let binned = aggregate_spectrum(&native, &settings).expect("aggregate");

        assert_eq!(binned.wave, native.wave);
        // sqrt(1) / 1e6 = 1 ppm, below the 20 ppm floor.
        assert!(binned.error_w_floor.iter().all(|value| *value == 20.0 * 1.0e-6));
        let raw = RawSeries::from(&native);
        assert!(raw.error_no_floor.iter().all(|value| *value == 1.0e-6));
    }

    #[test]
    fn misaligned_series_is_rejected() {
        let error = NativeSeries::new(
            vec![1.0, 2.0],
            vec![1.0, 1.0],
            vec![1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
        )
        .expect_err("short photon_in");
        assert_eq!(
            error,
            SpectralError::LengthMismatch {
                field: "photon_in",
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn seed_selects_realization() {
        assert_eq!(NoiseRealization::from_seed(Some(3)), NoiseRealization::Seeded(3));
        assert_eq!(NoiseRealization::from_seed(None), NoiseRealization::Entropy);
    }
}
