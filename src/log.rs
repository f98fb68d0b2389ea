//! Initialisation of the program logger.
//!
//! Messages at `info` level and below go to stdout and warnings and errors go to stderr, coloured
//! when writing to a terminal. When an output directory is given, plain copies are also written to
//! log files there.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Environment variable which overrides the log level in the settings file
pub const LOG_LEVEL_ENV_VAR: &str = "NETPLAN_LOG_LEVEL";

/// The log level used if neither the environment nor the settings file specify one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file for messages about the ordinary progress of a run
const LOG_INFO_FILE_NAME: &str = "netplan_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "netplan_error.log";

/// Whether [`init`] has already been called successfully
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name (case insensitive)
fn parse_log_level(level: &str) -> Result<LevelFilter> {
    Ok(match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// Create (or truncate) a log file in the given directory
fn open_log_file(dir: &Path, file_name: &str) -> Result<File> {
    let path = dir.join(file_name);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("Could not create log file {}", path.display()))
}

/// Initialise the program logger.
///
/// The level is taken from the `NETPLAN_LOG_LEVEL` environment variable if set, otherwise from
/// `log_level_from_settings`. Valid levels are `off`, `error`, `warn`, `info`, `debug` and `trace`.
///
/// # Arguments
///
/// * `log_level_from_settings`: The level given in the settings file
/// * `log_file_dir`: Where to write log files, if anywhere
pub fn init(log_level_from_settings: &str, log_file_dir: Option<&Path>) -> Result<()> {
    let log_level = env::var(LOG_LEVEL_ENV_VAR)
        .unwrap_or_else(|_| log_level_from_settings.to_string());
    let log_level = parse_log_level(&log_level)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let use_colour_stdout = std::io::stdout().is_terminal();
    let use_colour_stderr = std::io::stderr().is_terminal();

    let mut dispatch = Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stdout, &colours);
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stderr, &colours);
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(dir) = log_file_dir {
        // Files always get at least info-level messages, whatever the console shows
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(open_log_file(dir, LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(open_log_file(dir, LOG_ERROR_FILE_NAME)?),
            );
    }

    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}
