mod plan;
mod probe;

pub use plan::{ExposurePlan, ExposurePlanInput, PlanFlags, build_exposure_plan};
pub use probe::{SaturationLimit, SaturationProbeResult, probe_saturation};
