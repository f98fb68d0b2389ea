//! Metadata about a run, written alongside its results.
use anyhow::{Result, anyhow};
use chrono::Local;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build, generated by the build script
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The short git hash of the build, marked if the tree was dirty
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata,
    platform: PlatformMetadata,
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    /// The request file which was planned
    request_path: &'a Path,
    /// When the run started
    datetime: String,
    /// Whether the request was planned successfully
    ok: bool,
}

#[derive(Serialize)]
struct ProgramMetadata {
    name: &'static str,
    version: &'static str,
    /// Target triple of the build
    target: &'static str,
    is_debug: bool,
    rustc_version: &'static str,
    build_time_utc: &'static str,
    git_commit_hash: String,
}

impl Default for ProgramMetadata {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Fields of [`PlatformInfo`]
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;

        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata about the run to `metadata.toml` in the output directory
pub fn write_metadata(output_path: &Path, request_path: &Path, ok: bool) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            request_path,
            datetime: Local::now().to_rfc2822(),
            ok,
        },
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::new()?,
    };
    fs::write(
        output_path.join(METADATA_FILE_NAME),
        toml::to_string(&metadata)?,
    )?;

    Ok(())
}
