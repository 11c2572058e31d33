//! Download lifecycle
//!
//! One run walks through fixed stages:
//!
//! ```text
//! Pending -> Downloading -> Downloaded -> Verifying -> Accepted
//!                                                   \-> Rejected
//! ```
//!
//! 1. Pending: load the log registry (failure aborts before any download)
//! 2. Downloading: stream the artifact through the transport
//! 3. Downloaded: every byte is staged in a temporary file beside the destination
//! 4. Verifying: digest, collect SCTs, verify them, apply the policy
//! 5. Accepted moves the file to the destination, Rejected discards it
//!
//! The destination is only written on acceptance, so a rejected download
//! leaves any existing file there untouched.

use std::fmt;
use std::path::PathBuf;

use super::config::Config;
use super::error::{Error, Result};
use super::output;
use crate::helpers::acquire::{CancelToken, DownloadRequest, Transport, TransportError};
use crate::helpers::internal::fs_utils::ensure_parent_dir;
use crate::helpers::internal::progress::with_spinner;
use crate::helpers::internal::url_utils::{extract_filename, validate_url_scheme};
use crate::transparency::registry::log_source_for;
use crate::transparency::verifier::{self, VerificationOutcome};
use crate::transparency::{
    Artifact, Digest, FileSource, HeaderSource, LogRegistry, LogSource, SctCollector,
    SidecarSource, Verdict, digest, policy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Downloading,
    Downloaded,
    Verifying,
    Accepted,
    Rejected,
}

impl Stage {
    /// Whether `next` directly follows `self`. Stages are never skipped.
    pub fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Downloading)
                | (Self::Downloading, Self::Downloaded)
                | (Self::Downloaded, Self::Verifying)
                | (Self::Verifying, Self::Accepted)
                | (Self::Verifying, Self::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Verifying => "verifying",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        })
    }
}

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct Report {
    pub url: String,
    /// Destination. Written only when accepted.
    pub path: PathBuf,
    pub size: u64,
    pub digest: Digest,
    pub outcomes: Vec<VerificationOutcome>,
    pub verdict: Verdict,
    /// Stages visited, in order.
    pub stages: Vec<Stage>,
}

impl Report {
    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Pending)
    }
}

#[derive(Debug)]
struct StageTracker(Vec<Stage>);

impl StageTracker {
    fn new() -> Self {
        Self(vec![Stage::Pending])
    }

    fn advance(&mut self, next: Stage) {
        let current = self.0.last().copied().unwrap_or(Stage::Pending);
        debug_assert!(
            current.can_advance_to(next),
            "illegal stage transition {current} -> {next}"
        );
        self.0.push(next);
    }
}

/// Build the collector described by `config`.
///
/// Response headers are always checked; the sidecar unless disabled; then
/// any local bundle files.
pub fn collector_for(config: &Config) -> SctCollector {
    let mut collector = SctCollector::default().with_source(HeaderSource);
    if let Some(suffix) = &config.sidecar_suffix {
        collector = collector.with_source(SidecarSource {
            suffix: suffix.clone(),
        });
    }
    for path in &config.sct_files {
        collector = collector.with_source(FileSource { path: path.clone() });
    }
    collector
}

/// Runs the download-then-verify pipeline for one URL.
pub struct DownloadOrchestrator<T: Transport> {
    config: Config,
    transport: T,
    log_source: Box<dyn LogSource>,
    collector: SctCollector,
}

impl<T: Transport> DownloadOrchestrator<T> {
    pub fn new(config: Config, transport: T) -> Self {
        let log_source = log_source_for(&config.log_list);
        let collector = collector_for(&config);
        Self {
            config,
            transport,
            log_source,
            collector,
        }
    }

    pub fn with_log_source(mut self, source: impl LogSource + 'static) -> Self {
        self.log_source = Box::new(source);
        self
    }

    pub fn with_collector(mut self, collector: SctCollector) -> Self {
        self.collector = collector;
        self
    }

    /// Local path the artifact at `url` is saved to.
    pub fn destination_for(&self, url: &str) -> PathBuf {
        match &self.config.output {
            Some(path) if path.is_dir() => path.join(extract_filename(url)),
            Some(path) => path.clone(),
            None => self.config.output_dir.join(extract_filename(url)),
        }
    }

    /// Fetch `url` and decide whether to keep it.
    ///
    /// Returns the report for OK and Warning verdicts, with the artifact
    /// saved at [`Report::path`]. An Error verdict discards the download and
    /// returns [`Error::Rejected`].
    pub fn run(&self, url: &str, cancel: &CancelToken) -> Result<Report> {
        validate_url_scheme(url).map_err(Error::InvalidUrl)?;
        let mut stages = StageTracker::new();

        output::action(&format!("Fetching {}", url));
        output::sub_action("logs");
        let location = self.log_source.location();
        let registry = with_spinner(&format!("loading {}", location), || {
            LogRegistry::load(self.log_source.as_ref(), &self.transport)
        })?;
        output::detail(&format!("{} logs from {}", registry.len(), location));

        stages.advance(Stage::Downloading);
        output::sub_action("download");
        let dest = self.destination_for(url);
        ensure_parent_dir(&dest)?;
        let request = DownloadRequest {
            url,
            dest: &dest,
            expected_sha256: self.config.expected_sha256,
            cancel,
        };
        let mut downloaded = self.transport.download(&request).map_err(|e| match e {
            TransportError::Cancelled => Error::Cancelled,
            e => Error::Transport(e),
        })?;
        stages.advance(Stage::Downloaded);
        output::detail(&format!("{} bytes staged for {}", downloaded.size, dest.display()));

        let artifact = Artifact {
            url: url.to_string(),
            path: downloaded.path().to_path_buf(),
            size: downloaded.size,
            headers: std::mem::take(&mut downloaded.headers),
        };

        // Any early return drops `downloaded`, which removes the staged file
        stages.advance(Stage::Verifying);
        output::sub_action("verify");
        let (digest, outcomes) = self.verify(&artifact, &registry, cancel)?;
        let verdict = policy::evaluate(&outcomes);

        let rejected = verdict.is_error();
        if rejected {
            drop(downloaded);
            stages.advance(Stage::Rejected);
        } else {
            downloaded.persist(&dest)?;
            stages.advance(Stage::Accepted);
        }

        let report = Report {
            url: artifact.url,
            path: dest,
            size: artifact.size,
            digest,
            outcomes,
            verdict,
            stages: stages.0,
        };

        if rejected {
            Err(Error::Rejected(Box::new(report)))
        } else {
            Ok(report)
        }
    }

    fn verify(
        &self,
        artifact: &Artifact,
        registry: &LogRegistry,
        cancel: &CancelToken,
    ) -> Result<(Digest, Vec<VerificationOutcome>)> {
        let digest = digest::compute_file(&artifact.path)?;
        output::detail(&format!("sha256 {}", digest));
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let materials = self.collector.collect(artifact, &self.transport);
        output::detail(&format!("{} SCTs found", materials.len()));

        let outcomes = verifier::verify_all(
            &materials,
            &digest,
            registry,
            self.config.workers,
            cancel,
        )
        .map_err(|_| Error::Cancelled)?;

        for (material, outcome) in materials.iter().zip(&outcomes) {
            if let VerificationOutcome::Invalid { reason, .. } = outcome {
                output::detail(&format!("invalid SCT from {}: {}", material.origin, reason));
            }
        }

        Ok((digest, outcomes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ConfigToml, Overrides};
    use crate::helpers::acquire::Downloaded;

    const ALL: [Stage; 6] = [
        Stage::Pending,
        Stage::Downloading,
        Stage::Downloaded,
        Stage::Verifying,
        Stage::Accepted,
        Stage::Rejected,
    ];

    struct Offline;

    impl Transport for Offline {
        fn download(&self, _: &DownloadRequest<'_>) -> Result<Downloaded, TransportError> {
            Err(TransportError::Cancelled)
        }

        fn fetch(&self, _: &str) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(None)
        }
    }

    fn config(output_dir: &str, output: Option<PathBuf>) -> Config {
        Config::resolve(
            ConfigToml {
                output_dir: Some(PathBuf::from(output_dir)),
                ..Default::default()
            },
            Overrides {
                output,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_stage_graph() {
        let path = [
            Stage::Pending,
            Stage::Downloading,
            Stage::Downloaded,
            Stage::Verifying,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]));
        }
        assert!(Stage::Verifying.can_advance_to(Stage::Accepted));
        assert!(Stage::Verifying.can_advance_to(Stage::Rejected));

        assert!(!Stage::Pending.can_advance_to(Stage::Verifying));
        assert!(!Stage::Downloading.can_advance_to(Stage::Accepted));
        assert!(!Stage::Downloaded.can_advance_to(Stage::Downloading));
    }

    #[test]
    fn test_terminal_stages_are_final() {
        for terminal in [Stage::Accepted, Stage::Rejected] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(!terminal.can_advance_to(next));
            }
        }
        assert!(!Stage::Verifying.is_terminal());
    }

    #[test]
    fn test_destination_from_output_dir() {
        let orchestrator = DownloadOrchestrator::new(config("/srv/dl", None), Offline);
        assert_eq!(
            orchestrator.destination_for("https://example.com/a/tool-1.0.tar.gz?x=1"),
            PathBuf::from("/srv/dl/tool-1.0.tar.gz")
        );
    }

    #[test]
    fn test_destination_explicit_output() {
        let temp = tempfile::tempdir().unwrap();

        let file = temp.path().join("renamed.bin");
        let orchestrator = DownloadOrchestrator::new(config(".", Some(file.clone())), Offline);
        assert_eq!(orchestrator.destination_for("https://example.com/tool.bin"), file);

        let dir = temp.path().to_path_buf();
        let orchestrator = DownloadOrchestrator::new(config(".", Some(dir.clone())), Offline);
        assert_eq!(
            orchestrator.destination_for("https://example.com/tool.bin"),
            dir.join("tool.bin")
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let orchestrator = DownloadOrchestrator::new(Config::default(), Offline);
        let err = orchestrator
            .run("ftp://example.com/tool.bin", &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_collector_for_config() {
        let mut cfg = Config::default();
        cfg.sct_files = vec![PathBuf::from("a.sct.json")];
        let names: Vec<String> = collector_for(&cfg).sources().collect();
        assert_eq!(names.len(), 3);
        assert!(names[0].starts_with("header"));
        assert!(names[1].starts_with("sidecar"));
        assert!(names[2].starts_with("file"));

        cfg.sidecar_suffix = None;
        assert_eq!(collector_for(&cfg).sources().count(), 2);
    }
}
