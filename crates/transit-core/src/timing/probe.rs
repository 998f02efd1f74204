use crate::domain::{DetectorSettings, InstrumentConfig, SimError, SimResult};
use crate::engine::{EngineReport, InstrumentEngine};
use serde::{Deserialize, Serialize};

/// Longest integration before the user saturation level is reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationLimit {
    Seconds(f64),
    /// Already saturated within the probe, or the probe image carries no signal.
    Undefined,
}

impl SaturationLimit {
    pub fn from_peak_rate(saturation_electrons: f64, peak_rate: Option<f64>) -> Self {
        match peak_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => {
                let seconds = saturation_electrons / rate;
                if seconds.is_finite() {
                    Self::Seconds(seconds)
                } else {
                    Self::Undefined
                }
            }
            _ => Self::Undefined,
        }
    }

    pub const fn seconds(self) -> Option<f64> {
        match self {
            Self::Seconds(seconds) => Some(seconds),
            Self::Undefined => None,
        }
    }

    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationProbeResult {
    pub max_exposure_per_integration: SaturationLimit,
    pub frame_time: f64,
    pub frames_per_group: u32,
    pub skipped_frames_per_group: u32,
}

impl SaturationProbeResult {
    pub fn new(
        max_exposure_per_integration: SaturationLimit,
        frame_time: f64,
        frames_per_group: u32,
        skipped_frames_per_group: u32,
    ) -> SimResult<Self> {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return Err(SimError::computation(
                "RUN.FRAME_TIME",
                format!("frame time must be finite and > 0 seconds, got {}", frame_time),
            ));
        }
        if frames_per_group + skipped_frames_per_group == 0 {
            return Err(SimError::computation(
                "RUN.FRAME_TIME",
                "frames per group plus skipped frames must be at least 1",
            ));
        }
        Ok(Self {
            max_exposure_per_integration,
            frame_time,
            frames_per_group,
            skipped_frames_per_group,
        })
    }

    pub(crate) fn from_report(report: &EngineReport, saturation_electrons: f64) -> SimResult<Self> {
        let limit = if report.is_hard_saturated() {
            tracing::warn!("hard saturation with the minimum number of groups");
            SaturationLimit::Undefined
        } else {
            SaturationLimit::from_peak_rate(saturation_electrons, report.peak_detector_rate())
        };

        let specification = report.exposure_specification();
        Self::new(
            limit,
            specification.tframe,
            specification.nframe,
            specification.nskip,
        )
    }
}

/// Runs the two-group probe and derives the saturation-limited integration time.
pub fn probe_saturation<E>(
    engine: &E,
    config: &InstrumentConfig,
    saturation_electrons: f64,
) -> SimResult<SaturationProbeResult>
where
    E: InstrumentEngine + ?Sized,
{
    let probe_config = config.with_detector(DetectorSettings::PROBE);
    let report = engine.run(&probe_config)?;
    let result = SaturationProbeResult::from_report(&report, saturation_electrons)?;
    tracing::debug!(
        limit = ?result.max_exposure_per_integration,
        frame_time = result.frame_time,
        "saturation probe finished"
    );
    Ok(result)
}
