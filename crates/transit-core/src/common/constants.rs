//! Observation-planning constants shared by the timing, warning and
//! spectral kernels.
//!
//! Advisory thresholds (`FULL_WELL_WARNING_FRACTION`,
//! `MIN_RECOMMENDED_GROUPS`) are policy values, not detector limits.

pub const MAX_GROUPS_PER_INTEGRATION: f64 = 65_536.0;
pub const MIN_GROUPS_PER_INTEGRATION: u64 = 2;
pub const MIN_INTEGRATIONS_IN_TRANSIT: u64 = 1;
/// Largest integration count that stays exact in f64 (2^53).
pub const MAX_INTEGRATION_COUNT: f64 = 9_007_199_254_740_992.0;
pub const TRANSIT_COVERAGE_GROUP_DIVISOR: f64 = 3.0;
pub const TARGET_ACQUISITION_HOURS: f64 = 0.5;

pub const FULL_WELL_WARNING_FRACTION: f64 = 0.8;
pub const MIN_RECOMMENDED_GROUPS: u64 = 5;
pub const ALL_GOOD: &str = "All good";

pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const PPM: f64 = 1.0e-6;
pub const PERCENT: f64 = 1.0e-2;
pub const MAS_TO_ARCSEC: f64 = 1.0e-3;
