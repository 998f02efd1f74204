use crate::domain::InstrumentConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SATURATED_WARNING_KEY: &str = "saturated";
pub const NONLINEAR_WARNING_KEY: &str = "nonlinear";
const HARD_SATURATION_PREFIX: &str = "Hard";

/// Extracted 1d flux, serialized as `[[wavelength...], [flux...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "[Vec<f64>; 2]", into = "[Vec<f64>; 2]")]
pub struct ExtractedFlux {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
}

impl From<[Vec<f64>; 2]> for ExtractedFlux {
    fn from([wavelength, flux]: [Vec<f64>; 2]) -> Self {
        Self { wavelength, flux }
    }
}

impl From<ExtractedFlux> for [Vec<f64>; 2] {
    fn from(value: ExtractedFlux) -> Self {
        [value.wavelength, value.flux]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OneDimensionalOutput {
    pub extracted_flux: ExtractedFlux,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TwoDimensionalOutput {
    /// Noiseless detector count rate, e-/s per pixel.
    pub detector: Vec<Vec<f64>>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSpecification {
    /// Seconds per frame.
    pub tframe: f64,
    pub nframe: u32,
    pub nskip: u32,
    pub ngroup: u64,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInformation {
    pub exposure_specification: ExposureSpecification,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    #[serde(rename = "1d")]
    pub one_d: OneDimensionalOutput,
    #[serde(rename = "2d")]
    pub two_d: TwoDimensionalOutput,
    #[serde(rename = "3d", default, skip_serializing_if = "Option::is_none")]
    pub three_d: Option<Value>,
    pub information: ReportInformation,
    #[serde(default)]
    pub warnings: BTreeMap<String, String>,
    pub input: InstrumentConfig,
}

impl EngineReport {
    /// Drops the 3d cube; nothing downstream reads it.
    pub fn without_cube(mut self) -> Self {
        self.three_d = None;
        self
    }

    pub fn warning(&self, key: &str) -> Option<&str> {
        self.warnings.get(key).map(String::as_str)
    }

    pub fn is_hard_saturated(&self) -> bool {
        self.warning(SATURATED_WARNING_KEY)
            .is_some_and(|message| message.starts_with(HARD_SATURATION_PREFIX))
    }

    /// Peak detector rate; NaN anywhere in the image propagates.
    pub fn peak_detector_rate(&self) -> Option<f64> {
        self.two_d
            .detector
            .iter()
            .flatten()
            .copied()
            .fold(None, |peak, value| match peak {
                None => Some(value),
                Some(current) if current.is_nan() || value.is_nan() => Some(f64::NAN),
                Some(current) => Some(current.max(value)),
            })
    }

    pub fn exposure_specification(&self) -> &ExposureSpecification {
        &self.information.exposure_specification
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EngineReport, ExposureSpecification, ExtractedFlux, OneDimensionalOutput,
        ReportInformation, TwoDimensionalOutput,
    };
    use crate::domain::{DetectorSettings, InstrumentConfig};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn report(detector: Vec<Vec<f64>>) -> EngineReport {
        EngineReport {
            one_d: OneDimensionalOutput {
                extracted_flux: ExtractedFlux {
                    wavelength: vec![1.0, 2.0],
                    flux: vec![5.0, 6.0],
                },
                other: BTreeMap::new(),
            },
            two_d: TwoDimensionalOutput {
                detector,
                other: BTreeMap::new(),
            },
            three_d: Some(json!([[[1.0]]])),
            information: ReportInformation {
                exposure_specification: ExposureSpecification {
                    tframe: 0.5,
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
    fn report_uses_engine_field_names() {
        let value = serde_json::to_value(report(vec![vec![1.0]])).expect("serialize");
        assert_eq!(value["1d"]["extracted_flux"], json!([[1.0, 2.0], [5.0, 6.0]]));
        assert_eq!(value["2d"]["detector"], json!([[1.0]]));
        assert_eq!(value["information"]["exposure_specification"]["tframe"], json!(0.5));
        assert!(value.get("3d").is_some());

        let parsed: EngineReport = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed.one_d.extracted_flux.flux, vec![5.0, 6.0]);
        assert!(parsed.without_cube().three_d.is_none());
    }

    #[test]
    fn peak_rate_propagates_nan_and_handles_empty_images() {
        assert_eq!(
            report(vec![vec![1.0, 4.0], vec![3.0]]).peak_detector_rate(),
            Some(4.0)
        );
        assert!(
            report(vec![vec![1.0, f64::NAN]])
                .peak_detector_rate()
                .expect("non-empty")
                .is_nan()
        );
        assert_eq!(report(Vec::new()).peak_detector_rate(), None);
    }

    #[test]
    fn hard_saturation_is_read_from_warning_prefix() {
        let mut hard = report(vec![vec![1.0]]);
        hard.warnings.insert(
            "saturated".to_string(),
            "Hard saturation: pixels above full well".to_string(),
        );
        assert!(hard.is_hard_saturated());

        let mut soft = report(vec![vec![1.0]]);
        soft.warnings
            .insert("saturated".to_string(), "Partial saturation".to_string());
        assert!(!soft.is_hard_saturated());
        assert!(!report(vec![vec![1.0]]).is_hard_saturated());
    }
}
