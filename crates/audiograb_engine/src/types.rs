use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::input::ResolveError;
use crate::persist::PersistError;

/// 1-based position of a URL inside the resolved list.
pub type ItemIndex = usize;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Kbps128,
    #[default]
    Kbps192,
    Kbps320,
}

impl Quality {
    pub fn kbps(self) -> u32 {
        match self {
            Quality::Kbps128 => 128,
            Quality::Kbps192 => 192,
            Quality::Kbps320 => 320,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Ogg,
}

impl AudioFormat {
    /// Codec name understood by the transcoder.
    pub fn codec(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "vorbis",
        }
    }

    /// Extension of the produced file.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "ogg",
        }
    }
}

/// Everything a batch needs. Immutable once the batch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub raw_input: String,
    pub destination: PathBuf,
    pub quality: Quality,
    pub format: AudioFormat,
    pub expand_playlists: bool,
    pub skip_existing: bool,
    pub retry_count: u32,
    pub socket_timeout: Duration,
}

impl JobRequest {
    pub fn new(raw_input: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            raw_input: raw_input.into(),
            destination: destination.into(),
            quality: Quality::default(),
            format: AudioFormat::default(),
            expand_playlists: true,
            skip_existing: true,
            retry_count: DEFAULT_RETRIES,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Probing,
    Downloading,
    Finished,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Metadata lookup failed; the item is still attempted.
    Probe,
    Download,
    Transcode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Probe => write!(f, "probe error"),
            FailureKind::Download => write!(f, "download error"),
            FailureKind::Transcode => write!(f, "transcode error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub index: ItemIndex,
    pub total: usize,
    pub label: String,
    pub phase: Phase,
    pub detail: String,
    pub failure: Option<FailureKind>,
}

impl ProgressEvent {
    /// True for the single event that closes an item: finished, or an error
    /// that counted the item as failed. Probe warnings are not outcomes.
    pub fn is_outcome(&self) -> bool {
        match self.phase {
            Phase::Finished => true,
            Phase::Error => self.failure != Some(FailureKind::Probe),
            Phase::Probing | Phase::Downloading => false,
        }
    }
}

/// Overall progress after an item completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Live update from the engine while a download runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferUpdate {
    Downloading {
        filename: String,
        percent: String,
        speed: String,
    },
    Finished {
        filename: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Item(ProgressEvent),
    Transfer {
        index: ItemIndex,
        update: TransferUpdate,
    },
    Overall(BatchProgress),
    Completed(BatchResult),
    /// Batch-fatal error, reported once; no `Completed` follows.
    Aborted { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDescriptor {
    Single {
        title: String,
        /// Output name stem as the engine would produce it, when known.
        file_stem: Option<String>,
    },
    Collection {
        title: String,
        entry_count: usize,
    },
}

impl MediaDescriptor {
    pub fn is_collection(&self) -> bool {
        matches!(self, MediaDescriptor::Collection { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistScope {
    /// Fetch every member of a collection.
    Expand,
    /// Treat the URL as a single item even if it references a collection.
    Single,
    /// Fetch only the first member of a collection.
    FirstEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputNaming {
    /// `"<2-digit index> - <title>.<ext>"`
    Indexed,
    /// `"<title>.<ext>"`
    Title,
    /// Indexed when the engine reports a collection index, plain title otherwise.
    IndexedIfCollection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    pub quality: Quality,
    pub retries: u32,
    pub playlist: PlaylistScope,
    pub naming: OutputNaming,
    pub skip_existing: bool,
    pub socket_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadReport {
    /// Final files written by the engine.
    pub files: Vec<PathBuf>,
    /// Errors for collection members that were skipped over.
    pub member_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Probe(String),
    #[error("{0}")]
    Download(String),
    #[error("{0}")]
    Transcode(String),
    #[error("{0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Probe(_) => FailureKind::Probe,
            EngineError::Transcode(_) => FailureKind::Transcode,
            EngineError::Download(_) | EngineError::Unavailable(_) => FailureKind::Download,
        }
    }
}

/// Errors that stop a batch before any item is attempted.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Input(#[from] ResolveError),
    #[error(transparent)]
    OutputDir(#[from] PersistError),
    #[error("no URLs found in input")]
    NoUrls,
    #[error("failed to start batch worker: {0}")]
    Worker(std::io::Error),
}

impl BatchError {
    /// True for filesystem failures (unreadable input, unusable destination).
    pub fn is_io(&self) -> bool {
        matches!(self, BatchError::Input(_) | BatchError::OutputDir(_))
    }
}
