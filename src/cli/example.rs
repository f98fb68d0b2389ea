//! The bundled example requests and the CLI commands for working with them.
use super::{RunOpts, check_response, handle_run_command};
use crate::output::get_output_dir;
use crate::response::Response;
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the example requests.
static EXAMPLES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The request file within each example
const REQUEST_FILE_NAME: &str = "request.json";

/// The optional baseline file within each example
const BASELINE_FILE_NAME: &str = "baseline.toml";

/// The available subcommands for managing example requests.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example request to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder for the example.
        new_path: Option<PathBuf>,
    },
    /// Run an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract { name, new_path } => {
                handle_example_extract_command(&name, new_path.as_deref())?;
            }
            Self::Run { name, opts } => {
                check_response(&handle_example_run_command(&name, opts, None)?)?;
            }
        }

        Ok(())
    }
}

/// Names of the bundled examples
pub fn example_names() -> impl Iterator<Item = &'static str> {
    EXAMPLES_DIR
        .dirs()
        .filter_map(|dir| dir.path().file_name()?.to_str())
}

fn handle_example_list_command() {
    for name in example_names() {
        println!("{name}");
    }
}

fn handle_example_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = EXAMPLES_DIR
        .get_file(path)
        .context("Example not found.")?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")?;

    println!("{readme}");

    Ok(())
}

fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    extract_example(name, dest.unwrap_or(Path::new(name)))
}

/// Copy the files of an example to a new directory
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let sub_dir = EXAMPLES_DIR.get_dir(name).context("Example not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir(new_path)?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::Dir(dir) => {
                anyhow::bail!(
                    "Subdirectories in examples are not supported: {}",
                    dir.path().display()
                )
            }
            DirEntry::File(f) => {
                let file_name = f
                    .path()
                    .file_name()
                    .context("Example file has no name")?;
                fs::write(new_path.join(file_name), f.contents())?;
            }
        }
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// Results go to `netplan_results/<name>` unless an output directory is given. A `baseline.toml`
/// bundled with the example is used unless another baseline file is given.
pub fn handle_example_run_command(
    name: &str,
    mut opts: RunOpts,
    settings: Option<Settings>,
) -> Result<Response> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let example_path = temp_dir.path().join(name);
    extract_example(name, &example_path)?;

    if opts.output_dir.is_none() {
        opts.output_dir = Some(get_output_dir(Path::new(name))?);
    }
    let bundled_baseline = example_path.join(BASELINE_FILE_NAME);
    if opts.baseline.is_none() && bundled_baseline.is_file() {
        opts.baseline = Some(bundled_baseline);
    }

    handle_run_command(&example_path.join(REQUEST_FILE_NAME), &opts, settings)
}
