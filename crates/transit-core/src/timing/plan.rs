//! Exposure planning: turns the saturation-limited integration time into a
//! groups/integrations plan for one transit or eclipse.
//!
//! Terminology follows the detector readout model: a frame is one readout, a
//! group is one frame here, an integration is one reset-to-reset cycle of
//! groups, and an exposure is a run of integrations.

use super::probe::SaturationProbeResult;
use crate::common::constants::{
    MAX_GROUPS_PER_INTEGRATION, MAX_INTEGRATION_COUNT, MIN_GROUPS_PER_INTEGRATION,
    MIN_INTEGRATIONS_IN_TRANSIT, SECONDS_PER_HOUR, TARGET_ACQUISITION_HOURS, TRANSIT_COVERAGE_GROUP_DIVISOR,
};
use crate::domain::{SimError, SimResult};
use serde::{Deserialize, Serialize};

pub const GROUPS_TOO_HIGH_MESSAGE: &str = "Groups/int > max num of allowed groups";
pub const GROUPS_RESET_MESSAGE: &str = "NGROUPS<2, SET TO NGROUPS=2 BY DEFAULT";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposurePlanInput {
    pub probe: SaturationProbeResult,
    pub transit_duration_seconds: f64,
    /// Out-of-transit exposure time as a multiple of in-transit time.
    pub expfact_out: f64,
    pub noccultations: u32,
}

impl ExposurePlanInput {
    fn validate(&self) -> SimResult<()> {
        if !self.transit_duration_seconds.is_finite() || self.transit_duration_seconds < 0.0 {
            return Err(SimError::input_validation(
                "INPUT.TRANSIT_DURATION",
                format!(
                    "transit duration must be finite and >= 0 seconds, got {}",
                    self.transit_duration_seconds
                ),
            ));
        }
        if !self.expfact_out.is_finite() || self.expfact_out <= 0.0 {
            return Err(SimError::input_validation(
                "INPUT.OUT_OF_TRANSIT_FRACTION",
                format!(
                    "out-of-transit fraction must be finite and > 0, got {}",
                    self.expfact_out
                ),
            ));
        }
        if self.noccultations == 0 {
            return Err(SimError::input_validation(
                "INPUT.OCCULTATIONS",
                "number of transits must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanFlags {
    pub group_count_too_high: bool,
    pub group_count_reset: bool,
}

impl PlanFlags {
    pub fn too_high_message(&self) -> Option<&'static str> {
        self.group_count_too_high.then_some(GROUPS_TOO_HIGH_MESSAGE)
    }

    pub fn reset_message(&self) -> Option<&'static str> {
        self.group_count_reset.then_some(GROUPS_RESET_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposurePlan {
    pub frames_per_integration: u64,
    pub groups_per_integration: u64,
    pub integrations_in_transit: u64,
    pub integrations_out_of_transit: u64,
    pub seconds_per_frame: f64,
    pub exposure_time_per_integration: f64,
    pub clock_time_per_integration: f64,
    /// Fraction of each integration that is signal-bearing.
    pub observing_efficiency: f64,
    pub on_source_time_seconds: f64,
    pub reset_plus_acquisition_hours: f64,
    pub transit_duration_hours: f64,
    pub number_of_transits: u32,
    /// Set when the group count was divided to improve transit coverage.
    pub coverage_corrected: bool,
    pub flags: PlanFlags,
}

impl ExposurePlan {
    pub fn integrations_per_occultation(&self) -> u64 {
        self.integrations_in_transit
            .saturating_add(self.integrations_out_of_transit)
    }

    pub fn observing_efficiency_percent(&self) -> f64 {
        self.observing_efficiency * 100.0
    }

    /// Timing summary keyed the way observers read it.
    pub fn timing_table(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Transit Duration", self.transit_duration_hours),
            ("Seconds per Frame", self.seconds_per_frame),
            (
                "Exposure Time Per Integration (secs)",
                self.exposure_time_per_integration,
            ),
            (
                "Num Groups per Integration",
                self.groups_per_integration as f64,
            ),
            (
                "Num Integrations Out of Transit",
                self.integrations_out_of_transit as f64,
            ),
            (
                "Num Integrations In Transit",
                self.integrations_in_transit as f64,
            ),
            (
                "Num Integrations per Occultation",
                self.integrations_per_occultation() as f64,
            ),
            ("On Source Time(sec)", self.on_source_time_seconds),
            (
                "Reset time Plus 30 min TA time (hrs)",
                self.reset_plus_acquisition_hours,
            ),
            (
                "Observing Efficiency (%)",
                self.observing_efficiency_percent(),
            ),
            ("Number of Transits", f64::from(self.number_of_transits)),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct TransitCoverage {
    exposure_time: f64,
    clock_time: f64,
    efficiency: f64,
    in_transit: f64,
    out_of_transit: f64,
}

impl TransitCoverage {
    fn compute(
        groups: f64,
        exposure_time: f64,
        frame_time: f64,
        transit_duration: f64,
        expfact_out: f64,
    ) -> Self {
        let efficiency = (groups - 1.0) / (groups + 1.0);
        let per_occultation = transit_duration * efficiency / exposure_time;
        let in_transit = per_occultation.ceil();
        Self {
            exposure_time,
            clock_time: groups * frame_time,
            efficiency,
            in_transit,
            out_of_transit: (in_transit / expfact_out).ceil(),
        }
    }
}

fn saturation_limited_groups(probe: &SaturationProbeResult, flags: &mut PlanFlags) -> (f64, f64) {
    let minimum = MIN_GROUPS_PER_INTEGRATION as f64;
    let Some(max_exposure) = probe.max_exposure_per_integration.seconds() else {
        tracing::warn!("saturation limit undefined; using the minimum number of groups");
        flags.group_count_reset = true;
        return (minimum, minimum);
    };

    let mut frames = (max_exposure / probe.frame_time).floor();
    let frames_per_cycle = f64::from(probe.frames_per_group + probe.skipped_frames_per_group);
    let mut groups = (frames / frames_per_cycle).floor();

    if groups > MAX_GROUPS_PER_INTEGRATION {
        tracing::warn!(
            groups,
            "groups per integration exceed the detector limit; clamping to {}",
            MAX_GROUPS_PER_INTEGRATION
        );
        groups = MAX_GROUPS_PER_INTEGRATION;
        flags.group_count_too_high = true;
    }

    if groups < minimum {
        tracing::warn!("hard saturation during the first group; check engine warnings");
        groups = minimum;
        frames = minimum;
        flags.group_count_reset = true;
    }

    (frames, groups)
}

fn as_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

/// Integration counts must be finite and small enough to stay exact in f64,
/// so their sum cannot overflow either.
fn integration_count(value: f64, phase: &str) -> SimResult<u64> {
    if !value.is_finite() || value < 0.0 || value > MAX_INTEGRATION_COUNT {
        return Err(SimError::computation(
            "RUN.INTEGRATION_COUNT",
            format!(
                "{} integration count {} is not representable; check the transit duration and out-of-transit fraction",
                phase, value
            ),
        ));
    }
    Ok(value as u64)
}

/// Builds the observation plan.
///
/// The transit-coverage correction runs at most once: a target whose
/// corrected plan still has no in-transit integration keeps that plan, with
/// only the out-of-transit count forced to the minimum.
pub fn build_exposure_plan(input: &ExposurePlanInput) -> SimResult<ExposurePlan> {
    input.validate()?;

    let probe = &input.probe;
    let frame_time = probe.frame_time;
    let mut flags = PlanFlags::default();
    let (frames, mut groups) = saturation_limited_groups(probe, &mut flags);

    let mut coverage = TransitCoverage::compute(
        groups,
        groups * frame_time,
        frame_time,
        input.transit_duration_seconds,
        input.expfact_out,
    );

    let minimum_integrations = MIN_INTEGRATIONS_IN_TRANSIT as f64;
    let coverage_corrected = coverage.in_transit < minimum_integrations;
    if coverage_corrected {
        groups = (groups / TRANSIT_COVERAGE_GROUP_DIVISOR)
            .floor()
            .max(MIN_GROUPS_PER_INTEGRATION as f64);
        tracing::info!(
            groups,
            "no integration fits in transit; reducing groups per integration"
        );
        coverage = TransitCoverage::compute(
            groups,
            (groups - 1.0) * frame_time,
            frame_time,
            input.transit_duration_seconds,
            input.expfact_out,
        );
    }

    let integrations_in_transit = integration_count(coverage.in_transit, "in-transit")?;
    let integrations_out_of_transit =
        integration_count(coverage.out_of_transit, "out-of-transit")?
            .max(MIN_INTEGRATIONS_IN_TRANSIT);
    let integration_count = (integrations_in_transit + integrations_out_of_transit) as f64;

    Ok(ExposurePlan {
        frames_per_integration: as_count(frames),
        groups_per_integration: groups as u64,
        integrations_in_transit,
        integrations_out_of_transit,
        seconds_per_frame: frame_time,
        exposure_time_per_integration: coverage.exposure_time,
        clock_time_per_integration: coverage.clock_time,
        observing_efficiency: coverage.efficiency,
        on_source_time_seconds: f64::from(input.noccultations)
            * coverage.clock_time
            * integration_count,
        reset_plus_acquisition_hours: frame_time * integration_count / SECONDS_PER_HOUR
            + TARGET_ACQUISITION_HOURS,
        transit_duration_hours: input.transit_duration_seconds / SECONDS_PER_HOUR,
        number_of_transits: input.noccultations,
        coverage_corrected,
        flags,
    })
}
