use super::CliError;
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use transit_core::common::{NoiseFloorInput, load_observation_request};
use transit_core::domain::{CalculationMode, SimError, SpectrumUnit};
use transit_core::spectral::{
    AggregationSettings, BinnedSpectrum, NativeSeries, NoiseFloor, NoiseRealization,
    aggregate_spectrum,
};
use transit_core::timing::{
    ExposurePlan, ExposurePlanInput, SaturationLimit, SaturationProbeResult, build_exposure_plan,
};

#[derive(clap::Args)]
pub(super) struct PlanArgs {
    /// Longest integration before saturation, in seconds; omit when undefined
    #[arg(long)]
    max_exposure: Option<f64>,

    /// Seconds per frame
    #[arg(long)]
    frame_time: f64,

    /// Frames per group
    #[arg(long, default_value_t = 1)]
    nframe: u32,

    /// Skipped frames per group
    #[arg(long, default_value_t = 0)]
    nskip: u32,

    /// Transit duration in seconds
    #[arg(long)]
    transit_duration: f64,

    /// Out-of-transit to in-transit exposure time ratio
    #[arg(long, default_value_t = 1.0)]
    fraction: f64,

    /// Number of transits
    #[arg(long, default_value_t = 1)]
    noccultations: u32,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct RebinArgs {
    /// Native series JSON (wave, photon_out, photon_in, var_out, var_in)
    #[arg(long)]
    input: PathBuf,

    /// Target resolving power; omit to keep the native axis
    #[arg(long)]
    resolution: Option<f64>,

    /// Constant floor in ppm, or a two-column wavelength/ppm table path
    #[arg(long, default_value = "0")]
    noise_floor: String,

    /// Spectrum unit: rp^2/r*^2 or fp/f*
    #[arg(long, default_value = "rp^2/r*^2")]
    unit: String,

    /// Seed for the randomized spectrum
    #[arg(long, conflicts_with = "no_noise")]
    seed: Option<u64>,

    /// Skip the randomized realization
    #[arg(long)]
    no_noise: bool,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct CheckArgs {
    /// Observation request JSON
    #[arg(long)]
    request: PathBuf,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    plan: &'a ExposurePlan,
    timing: BTreeMap<&'static str, f64>,
}

#[derive(Serialize)]
struct RequestSummary {
    calculation: String,
    mode: CalculationMode,
    unit: SpectrumUnit,
    noccultations: u32,
    resolution: Option<f64>,
    noise_floor: NoiseFloor,
    seed: Option<u64>,
}

pub(super) fn run_check_command(args: CheckArgs) -> Result<i32, CliError> {
    let request = load_observation_request(&args.request).map_err(SimError::from)?;
    request.validate()?;
    let summary = RequestSummary {
        calculation: request.calculation_label(),
        mode: request.calculation_mode()?,
        unit: request.planet.f_unit,
        noccultations: request.observation.noccultations,
        resolution: request.observation.resolution,
        noise_floor: request.observation.noise_floor.resolve()?,
        seed: request.observation.seed,
    };
    tracing::info!(mode = %summary.mode, "observation request is valid");
    emit_json(&summary, args.output.as_deref())?;
    Ok(0)
}

pub(super) fn run_plan_command(args: PlanArgs) -> Result<i32, CliError> {
    let limit = args
        .max_exposure
        .map_or(SaturationLimit::Undefined, SaturationLimit::Seconds);
    let probe = SaturationProbeResult::new(limit, args.frame_time, args.nframe, args.nskip)?;
    let plan = build_exposure_plan(&ExposurePlanInput {
        probe,
        transit_duration_seconds: args.transit_duration,
        expfact_out: args.fraction,
        noccultations: args.noccultations,
    })?;

    let report = PlanReport {
        plan: &plan,
        timing: plan.timing_table().into_iter().collect(),
    };
    emit_json(&report, args.output.as_deref())?;
    Ok(0)
}

pub(super) fn run_rebin_command(args: RebinArgs) -> Result<i32, CliError> {
    let series = read_native_series(&args.input)?;
    let settings = AggregationSettings {
        resolution: args.resolution,
        noise_floor: noise_floor_input(&args.noise_floor)?.resolve()?,
        unit: parse_unit(&args.unit)?,
        realization: if args.no_noise {
            NoiseRealization::Disabled
        } else {
            NoiseRealization::from_seed(args.seed)
        },
    };
    if let Some(resolution) = settings.resolution
        && (!resolution.is_finite() || resolution <= 0.0)
    {
        return Err(SimError::input_validation(
            "INPUT.RESOLUTION",
            format!("resolution must be finite and > 0, got {}", resolution),
        )
        .into());
    }

    let binned: BinnedSpectrum = aggregate_spectrum(&series, &settings).map_err(SimError::from)?;
    tracing::info!(
        native = series.len(),
        binned = binned.wave.len(),
        "rebinned native series"
    );
    emit_json(&binned, args.output.as_deref())?;
    Ok(0)
}

fn read_native_series(path: &Path) -> Result<NativeSeries, SimError> {
    let source = fs::read_to_string(path).map_err(|source| {
        SimError::io_system(
            "IO.SERIES_READ",
            format!("failed to read native series '{}': {}", path.display(), source),
        )
    })?;
    let series: NativeSeries = serde_json::from_str(&source).map_err(|source| {
        SimError::input_validation(
            "INPUT.SERIES_PARSE",
            format!("failed to parse native series '{}': {}", path.display(), source),
        )
    })?;
    series.validate()?;
    Ok(series)
}

fn noise_floor_input(raw: &str) -> Result<NoiseFloorInput, SimError> {
    match raw.trim().parse::<f64>() {
        Ok(ppm) if ppm.is_finite() => Ok(NoiseFloorInput::constant(ppm)),
        Ok(ppm) => Err(SimError::input_validation(
            "INPUT.NOISE_FLOOR",
            format!("noise floor must be finite and >= 0 ppm, got {}", ppm),
        )),
        Err(_) => Ok(NoiseFloorInput::table(raw)),
    }
}

fn parse_unit(raw: &str) -> Result<SpectrumUnit, SimError> {
    serde_json::from_value(Value::String(raw.to_string())).map_err(|_| {
        SimError::input_validation(
            "INPUT.SPECTRUM_UNIT",
            format!("unknown spectrum unit '{}'; expected 'rp^2/r*^2' or 'fp/f*'", raw),
        )
    })
}

fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory '{}'", parent.display())
                })?;
            }
            fs::write(path, rendered)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{noise_floor_input, parse_unit};
    use serde_json::json;
    use transit_core::domain::SpectrumUnit;

    #[test]
    fn noise_floor_argument_is_a_number_or_a_path() {
        assert_eq!(noise_floor_input("20").expect("constant").0, json!(20.0));
        assert_eq!(
            noise_floor_input("floor.txt").expect("table").0,
            json!("floor.txt")
        );
        for raw in ["nan", "inf", "-infinity"] {
            let error = noise_floor_input(raw).expect_err("non-finite floor");
            assert_eq!(error.placeholder(), "INPUT.NOISE_FLOOR");
        }
    }

    #[test]
    fn unit_argument_uses_serialized_names() {
        assert_eq!(parse_unit("fp/f*").expect("unit"), SpectrumUnit::PlanetStarFluxRatio);
        assert_eq!(parse_unit("rp^2/r*^2").expect("unit"), SpectrumUnit::TransitDepth);
        let error = parse_unit("ppm").expect_err("unknown unit");
        assert_eq!(error.placeholder(), "INPUT.SPECTRUM_UNIT");
    }
}
