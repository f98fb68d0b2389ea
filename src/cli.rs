//! The command line interface.
use crate::baseline::{BaselineProvider, DefaultBaselineProvider, FileBaselineProvider};
use crate::input::read_json;
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{ResultsWriter, create_output_directory, get_output_dir};
use crate::request::SweepRequest;
use crate::response::{Response, respond};
use crate::settings::Settings;
use crate::sweep::{Collaborators, sweep};
use ::log::{error, info, warn};
use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// Plan multi-year logistics networks.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write per-year allocations for every scenario
    #[arg(long)]
    pub debug_model: bool,
    /// TOML file containing the historical baseline (`annual_cost = ...`)
    #[arg(long)]
    pub baseline: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a network sweep.
    Run {
        /// Path to the request JSON file.
        request_path: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example requests.
    Example {
        /// The available subcommands for managing example requests.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a request without solving it.
    Validate {
        /// Path to the request JSON file.
        request_path: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { request_path, opts } => {
                check_response(&handle_run_command(&request_path, &opts, None)?)
            }
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { request_path } => handle_validate_command(&request_path, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the selected command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ netplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Fail if the request couldn't be planned, so that the process exits with an error status
fn check_response(response: &Response) -> Result<()> {
    match response {
        Response::Sweep(_) => Ok(()),
        Response::Error(err) => bail!("Request could not be planned: {}", err.error),
    }
}

/// Load a request from a JSON file
fn load_request(request_path: &Path) -> Result<SweepRequest> {
    read_json(request_path)
}

/// Handle the `run` command.
///
/// Results are written to the output directory whether or not the request could be planned.
///
/// # Returns
///
/// The response, or an error if the request couldn't be read or outputs couldn't be written.
pub fn handle_run_command(
    request_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<Response> {
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if opts.debug_model {
        settings.debug_model = true;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(request_path)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(&settings.log_level, Some(output_path))
        .context("Failed to initialise logging.")?;

    let request = load_request(request_path).context("Failed to load request.")?;
    info!("Loaded request from {}", request_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let file_baseline;
    let baseline: &dyn BaselineProvider = match &opts.baseline {
        Some(path) => {
            file_baseline = FileBaselineProvider { path: path.clone() };
            &file_baseline
        }
        None => &DefaultBaselineProvider,
    };
    let collaborators = Collaborators {
        baseline,
        ..Collaborators::default()
    };
    let response = respond(sweep(request, &collaborators));

    let mut writer = ResultsWriter::create(output_path, settings.debug_model)?;
    writer.write_response(&response)?;
    writer.flush()?;
    write_metadata(output_path, request_path, response.is_ok())
        .context("Failed to save metadata.")?;

    match &response {
        Response::Sweep(sweep) => match sweep.batch_summary.best_scenario_nodes {
            Some(nodes) => info!("Sweep complete! Best network has {nodes} facilities"),
            None => warn!("Sweep complete, but no scenario could be solved"),
        },
        Response::Error(err) => error!("{}", err.error),
    }

    Ok(response)
}

/// Handle the `validate` command.
pub fn handle_validate_command(request_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // We won't save log files when running the validate command
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let request = load_request(request_path).context("Failed to load request.")?;
    let input = request.validate().context("Failed to validate request.")?;
    info!(
        "Request validation successful! {} candidate facilities, {} destinations, {} scenarios",
        input.facilities.len(),
        input.destinations.len(),
        input.node_counts.len()
    );

    Ok(())
}
