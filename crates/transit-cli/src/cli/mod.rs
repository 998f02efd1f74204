mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use transit_core::domain::SimError;

const PROGRAM_NAME: &str = "transit-sim";

pub fn run_from_env() -> i32 {
    init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let sim_error = error.as_sim_error();
            eprintln!("{}", sim_error.diagnostic_line());
            if let Some(summary_line) = sim_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            sim_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "transit-sim",
    about = "Exposure timing and spectral aggregation for transit observations"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Validate an observation request and show how it resolves
    Check(commands::CheckArgs),
    /// Build an exposure plan from saturation probe numbers
    Plan(commands::PlanArgs),
    /// Rebin a native photon/variance series and apply the noise floor
    Rebin(commands::RebinArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Check(args) => commands::run_check_command(args),
        CliCommand::Plan(args) => commands::run_plan_command(args),
        CliCommand::Rebin(args) => commands::run_rebin_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SimError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SimError> for CliError {
    fn from(error: SimError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_sim_error(&self) -> SimError {
        match self {
            Self::Usage(message) => SimError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SimError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, run};
    use transit_core::domain::{SimError, SimErrorCategory};

    #[test]
    fn unknown_subcommand_is_a_usage_error() {
        let error = run(["observe"]).expect_err("unknown subcommand");
        assert!(matches!(error, CliError::Usage(_)));
        let sim_error = error.as_sim_error();
        assert_eq!(sim_error.placeholder(), "INPUT.CLI_USAGE");
        assert_eq!(sim_error.exit_code(), 2);
    }

    #[test]
    fn help_exits_cleanly() {
        assert_eq!(run(["--help"]).expect("help"), 0);
    }

    #[test]
    fn compute_errors_keep_their_category() {
        let error = CliError::from(SimError::computation("RUN.FRAME_TIME", "bad frame time"));
        let sim_error = error.as_sim_error();
        assert_eq!(sim_error.category(), SimErrorCategory::ComputationError);
        assert_eq!(sim_error.exit_code(), 4);

        let internal = CliError::from(anyhow::anyhow!("disk full"));
        assert_eq!(internal.as_sim_error().placeholder(), "IO.CLI");
    }
}
