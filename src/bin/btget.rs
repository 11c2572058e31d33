//! btget CLI - fetch a URL and verify it against transparency logs
//!
//! Usage:
//!   btget [OPTIONS] <URL>
//!
//! Exits non-zero when no SCT vouches for the artifact (nothing is saved)
//! or when the run fails outright.

use anyhow::{Context, Result};
use btget::transparency::Digest;
use btget::{CancelToken, Config, DownloadOrchestrator, Error, HttpTransport, Overrides, output};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "btget")]
#[command(about = "Download a file and verify it is logged in binary transparency logs")]
#[command(version)]
struct Cli {
    /// URL of the artifact
    url: String,

    /// Config file (default: $XDG_CONFIG_HOME/btget/config.toml, ~/.btget.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Where to save the artifact (file or existing directory)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Log list to trust, as a path or URL
    #[arg(long, value_name = "PATH|URL", env = "BTGET_LOG_LIST")]
    log_list: Option<String>,

    /// Expected SHA-256 of the artifact, checked while downloading
    #[arg(long, value_name = "HEX")]
    sha256: Option<Digest>,

    /// Local SCT bundle (JSON) to consider, may be repeated
    #[arg(long = "sct-file", value_name = "PATH")]
    sct_files: Vec<PathBuf>,

    /// Connect and idle-read timeout in seconds
    #[arg(long, value_name = "SECS", env = "BTGET_TIMEOUT")]
    timeout: Option<u64>,

    /// Do not look for an SCT sidecar next to the artifact
    #[arg(long)]
    no_sidecar: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>().and_then(Error::report) {
                Some(report) => {
                    output::verdict(&report.verdict);
                    output::detail(&format!("not saved to {}", report.path.display()));
                }
                None => output::error(&format!("{:#}", e)),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        log_list: cli.log_list,
        output: cli.output,
        timeout_secs: cli.timeout,
        expected_sha256: cli.sha256,
        sct_files: cli.sct_files,
        no_sidecar: cli.no_sidecar,
    };
    let config = Config::load(cli.config.as_deref(), overrides).context("Failed to load config")?;

    let cancel = CancelToken::new();
    let transport = HttpTransport::new(config.timeout);
    let orchestrator = DownloadOrchestrator::new(config, transport);

    let report = orchestrator.run(&cli.url, &cancel)?;

    output::verdict(&report.verdict);
    output::success(&format!("saved to {}", report.path.display()));
    Ok(())
}
