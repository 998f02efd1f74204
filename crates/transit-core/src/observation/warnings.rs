use crate::common::constants::{ALL_GOOD, FULL_WELL_WARNING_FRACTION, MIN_RECOMMENDED_GROUPS};
use crate::domain::SaturationLevel;
use crate::engine::{EngineReport, NONLINEAR_WARNING_KEY, SATURATED_WARNING_KEY};
use crate::timing::ExposurePlan;
use serde::{Deserialize, Serialize};

pub const HIGH_FULL_WELL_MESSAGE: &str = "% full well>80%";

/// Advisory checks on an observation plan. Never alters computed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningSet {
    #[serde(rename = "Group Number Too Low?")]
    pub group_number_too_low: String,
    #[serde(rename = "Group Number Too High?")]
    pub group_number_too_high: String,
    #[serde(rename = "Non linear?")]
    pub non_linear: String,
    #[serde(rename = "Saturated?")]
    pub saturated: String,
    #[serde(rename = "% full well high?")]
    pub full_well_high: String,
    #[serde(rename = "Num Groups Reset?")]
    pub group_count_reset: String,
}

impl WarningSet {
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("Group Number Too Low?", &self.group_number_too_low),
            ("Group Number Too High?", &self.group_number_too_high),
            ("Non linear?", &self.non_linear),
            ("Saturated?", &self.saturated),
            ("% full well high?", &self.full_well_high),
            ("Num Groups Reset?", &self.group_count_reset),
        ]
    }

    pub fn advisories(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.entries()
            .into_iter()
            .filter(|(_, status)| *status != ALL_GOOD)
    }
}

fn status(message: Option<&str>) -> String {
    message.unwrap_or(ALL_GOOD).to_string()
}

pub fn build_warnings(
    out_of_transit: &EngineReport,
    plan: &ExposurePlan,
    saturation: &SaturationLevel,
    instrument: &str,
) -> WarningSet {
    let high_full_well = saturation.fraction_of_full_well() > FULL_WELL_WARNING_FRACTION;
    let too_few_groups = plan.groups_per_integration < MIN_RECOMMENDED_GROUPS;

    let warnings = WarningSet {
        group_number_too_low: if high_full_well && too_few_groups {
            format!(
                "% full well>80% & only {} groups",
                plan.groups_per_integration
            )
        } else {
            ALL_GOOD.to_string()
        },
        group_number_too_high: status(plan.flags.too_high_message()),
        non_linear: status(out_of_transit.warning(NONLINEAR_WARNING_KEY)),
        saturated: status(out_of_transit.warning(SATURATED_WARNING_KEY)),
        full_well_high: status(high_full_well.then_some(HIGH_FULL_WELL_MESSAGE)),
        group_count_reset: status(plan.flags.reset_message()),
    };

    for (check, message) in warnings.advisories() {
        tracing::warn!(instrument, check, message, "observation advisory");
    }
    warnings
}
