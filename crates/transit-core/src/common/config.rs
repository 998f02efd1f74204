//! Observation request schema and loader.
//!
//! A request bundles the instrument configuration handed to the instrument
//! engine, the star/planet description handed to the spectrum builder, and
//! the observation settings consumed by the timing and spectral kernels.

use crate::domain::{CalculationMode, InstrumentConfig, SimError, SimResult, SpectrumUnit};
use crate::spectral::{NoiseFloor, NoiseFloorTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Planet axis unit that switches a run into phase-curve mode.
pub const TIME_AXIS_UNIT: &str = "sec";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarConfig {
    pub mag: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetConfig {
    #[serde(default)]
    pub w_unit: String,
    pub f_unit: SpectrumUnit,
    /// Seconds. Ignored in phase-curve mode.
    #[serde(default)]
    pub transit_duration: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PlanetConfig {
    pub fn is_time_series(&self) -> bool {
        self.w_unit.eq_ignore_ascii_case(TIME_AXIS_UNIT)
    }
}

/// Raw noise-floor setting: a ppm number or a path to a two-column table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoiseFloorInput(pub Value);

impl NoiseFloorInput {
    pub fn constant(ppm: f64) -> Self {
        Self(Value::from(ppm))
    }

    pub fn table(path: impl AsRef<Path>) -> Self {
        Self(Value::from(path.as_ref().to_string_lossy().into_owned()))
    }

    pub fn resolve(&self) -> SimResult<NoiseFloor> {
        match &self.0 {
            Value::Number(number) => {
                let ppm = number
                    .as_f64()
                    .filter(|ppm| ppm.is_finite() && *ppm >= 0.0)
                    .ok_or_else(|| {
                        SimError::input_validation(
                            "INPUT.NOISE_FLOOR",
                            format!("noise floor must be finite and >= 0 ppm, got {}", number),
                        )
                    })?;
                Ok(NoiseFloor::Constant { ppm })
            }
            Value::String(path) => Ok(NoiseFloor::Table(NoiseFloorTable::load(path)?)),
            other => Err(SimError::input_validation(
                "INPUT.NOISE_FLOOR",
                format!("noise floor must be a number (ppm) or a table file path, got {}", other),
            )),
        }
    }
}

impl Default for NoiseFloorInput {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSettings {
    /// Percent of full well.
    pub sat_level: f64,
    pub noccultations: u32,
    #[serde(rename = "R", default)]
    pub resolution: Option<f64>,
    /// Out-of-transit to in-transit exposure time ratio.
    pub fraction: f64,
    #[serde(default)]
    pub noise_floor: NoiseFloorInput,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRequest {
    pub instrument: InstrumentConfig,
    pub star: StarConfig,
    pub planet: PlanetConfig,
    pub observation: ObservationSettings,
    pub calculation: String,
}

impl ObservationRequest {
    pub fn calculation_mode(&self) -> SimResult<CalculationMode> {
        if self.planet.is_time_series() {
            return Ok(CalculationMode::PhaseSpectrum);
        }
        self.calculation.parse()
    }

    /// Calculation type as recorded in the run summary: the requested string,
    /// or `phase_spec` when a time axis forces phase-curve mode.
    pub fn calculation_label(&self) -> String {
        if self.planet.is_time_series() {
            CalculationMode::PhaseSpectrum.as_str().to_string()
        } else {
            self.calculation.trim().to_string()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        let observation = &self.observation;
        if !observation.sat_level.is_finite()
            || observation.sat_level <= 0.0
            || observation.sat_level > 100.0
        {
            return Err(SimError::input_validation(
                "INPUT.SATURATION_LEVEL",
                format!(
                    "sat_level must be in (0, 100] percent of full well, got {}",
                    observation.sat_level
                ),
            ));
        }
        if observation.noccultations == 0 {
            return Err(SimError::input_validation(
                "INPUT.OCCULTATIONS",
                "noccultations must be at least 1",
            ));
        }
        if !observation.fraction.is_finite() || observation.fraction <= 0.0 {
            return Err(SimError::input_validation(
                "INPUT.OUT_OF_TRANSIT_FRACTION",
                format!(
                    "fraction must be finite and > 0, got {}",
                    observation.fraction
                ),
            ));
        }
        if let Some(resolution) = observation.resolution
            && (!resolution.is_finite() || resolution <= 0.0)
        {
            return Err(SimError::input_validation(
                "INPUT.RESOLUTION",
                format!("R must be finite and > 0, got {}", resolution),
            ));
        }
        if let Some(duration) = self.planet.transit_duration
            && (!duration.is_finite() || duration < 0.0)
        {
            return Err(SimError::input_validation(
                "INPUT.TRANSIT_DURATION",
                format!(
                    "transit_duration must be finite and >= 0 seconds, got {}",
                    duration
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read observation request '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse observation request '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ConfigError> for SimError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Read { .. } => SimError::io_system("IO.REQUEST_READ", error.to_string()),
            ConfigError::Parse { .. } => {
                SimError::input_validation("INPUT.REQUEST_PARSE", error.to_string())
            }
        }
    }
}

pub fn load_observation_request(
    request_path: impl AsRef<Path>,
) -> Result<ObservationRequest, ConfigError> {
    let request_path = request_path.as_ref();
    let source = fs::read_to_string(request_path).map_err(|source| ConfigError::Read {
        path: request_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
        path: request_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{NoiseFloorInput, ObservationRequest, load_observation_request};
    use crate::domain::{CalculationMode, SimErrorCategory, SpectrumUnit};
    use crate::spectral::NoiseFloor;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn request_json() -> serde_json::Value {
        json!({
            "instrument": {
                "instrument": "niriss",
                "mode": "soss",
                "disperser": "gr700xd",
                "subarray": "substrip256",
                "readmode": "nisrapid",
                "detector": { "ngroup": 2, "nint": 1, "nexp": 1 },
                "strategy": { "method": "soss" }
            },
            "star": { "mag": 8.0, "temp": 5500.0 },
            "planet": {
                "w_unit": "um",
                "f_unit": "rp^2/r*^2",
                "transit_duration": 7200.0
            },
            "observation": {
                "sat_level": 80.0,
                "noccultations": 2,
                "R": 100.0,
                "fraction": 1.0,
                "noise_floor": 20
            },
            "calculation": "FML"
        })
    }

    fn parse(value: serde_json::Value) -> ObservationRequest {
        serde_json::from_value(value).expect("request should parse")
    }

    #[test]
    fn request_round_trips_pass_through_fields() {
        let request = parse(request_json());
        assert_eq!(request.star.mag, 8.0);
        assert!(request.star.extra.contains_key("temp"));
        assert!(request.instrument.extra.contains_key("strategy"));
        assert_eq!(request.planet.f_unit, SpectrumUnit::TransitDepth);
        assert_eq!(request.observation.resolution, Some(100.0));
        assert_eq!(
            request.calculation_mode().expect("mode"),
            CalculationMode::FluxMinusLast
        );
        request.validate().expect("request should validate");
    }

    #[test]
    fn time_axis_forces_phase_curve_mode() {
        let mut value = request_json();
        value["planet"]["w_unit"] = json!("sec");
        value["calculation"] = json!("not-a-mode");
        let request = parse(value);
        assert_eq!(
            request.calculation_mode().expect("mode"),
            CalculationMode::PhaseSpectrum
        );
        assert_eq!(request.calculation_label(), "phase_spec");
    }

    #[test]
    fn calculation_label_keeps_requested_spelling() {
        let mut value = request_json();
        value["calculation"] = json!(" slope method ");
        let request = parse(value);
        assert_eq!(
            request.calculation_mode().expect("mode"),
            CalculationMode::SlopeMethod
        );
        assert_eq!(request.calculation_label(), "slope method");
    }

    #[test]
    fn missing_calculation_is_a_parse_failure() {
        let mut value = request_json();
        value
            .as_object_mut()
            .expect("request object")
            .remove("calculation");
        let error = serde_json::from_value::<ObservationRequest>(value)
            .expect_err("calculation is required");
        assert!(error.to_string().contains("calculation"));
    }

    #[test]
    fn validation_rejects_out_of_range_settings() {
        let mut value = request_json();
        value["observation"]["fraction"] = json!(0.0);
        let error = parse(value).validate().expect_err("zero fraction");
        assert_eq!(error.placeholder(), "INPUT.OUT_OF_TRANSIT_FRACTION");

        let mut value = request_json();
        value["observation"]["R"] = json!(-5.0);
        let error = parse(value).validate().expect_err("negative R");
        assert_eq!(error.placeholder(), "INPUT.RESOLUTION");

        let mut value = request_json();
        value["planet"]["transit_duration"] = json!(-1.0);
        let error = parse(value).validate().expect_err("negative duration");
        assert_eq!(error.placeholder(), "INPUT.TRANSIT_DURATION");
    }

    #[test]
    fn noise_floor_input_resolves_numbers_and_rejects_other_types() {
        assert_eq!(
            NoiseFloorInput::constant(20.0).resolve().expect("constant"),
            NoiseFloor::Constant { ppm: 20.0 }
        );
        let error = NoiseFloorInput::constant(-20.0)
            .resolve()
            .expect_err("negative floor should fail");
        assert_eq!(error.placeholder(), "INPUT.NOISE_FLOOR");
        assert!(NoiseFloorInput::constant(f64::NAN).resolve().is_err());

        let error = NoiseFloorInput(json!([1.0, 2.0]))
            .resolve()
            .expect_err("array floor should fail");
        assert_eq!(error.category(), SimErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.NOISE_FLOOR");
    }

    #[test]
    fn noise_floor_input_loads_table_from_path() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("floor.txt");
        fs::write(&path, "1.0 30.0\n2.0 10.0\n").expect("table should be written");

        let floor = NoiseFloorInput::table(&path).resolve().expect("table floor");
        match floor {
            NoiseFloor::Table(table) => assert_eq!(table.len(), 2),
            other => panic!("expected table floor, got {other:?}"),
        }
    }

    #[test]
    fn loader_reports_read_and_parse_failures() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = temp.path().join("missing.json");
        let error = load_observation_request(&missing).expect_err("missing file");
        assert!(error.to_string().contains("failed to read"));

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ not json").expect("file should be written");
        let error = load_observation_request(&broken).expect_err("broken json");
        assert!(error.to_string().contains("failed to parse"));

        let valid = temp.path().join("request.json");
        fs::write(&valid, request_json().to_string()).expect("file should be written");
        let request = load_observation_request(&valid).expect("valid request");
        assert_eq!(request.observation.noccultations, 2);
    }
}
