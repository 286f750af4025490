//! Audiograb engine: input resolution, batch orchestration, and the yt-dlp backend.
mod batch;
mod decode;
mod engine;
mod filename;
mod input;
mod media;
mod persist;
mod types;
mod ytdlp;

pub use batch::{run_batch, ChannelProgressSink, ProgressSink};
pub use decode::{decode_text, DecodeError, DecodedText};
pub use engine::BatchHandle;
pub use filename::{expected_output_path, sanitize_title};
pub use input::{resolve_input, split_url_lines, ResolveError};
pub use media::{MediaEngine, TransferObserver};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    AudioFormat, BatchError, BatchProgress, BatchResult, DownloadReport, DownloadRequest,
    EngineError, EngineEvent, FailureKind, ItemIndex, JobRequest, MediaDescriptor, OutputNaming,
    Phase, PlaylistScope, ProgressEvent, Quality, TransferUpdate, DEFAULT_RETRIES,
    DEFAULT_SOCKET_TIMEOUT,
};
pub use ytdlp::{YtDlpEngine, YtDlpSettings};
