use std::time::Duration;

use crate::{DownloadReport, DownloadRequest, EngineError, MediaDescriptor, TransferUpdate};

/// Receives transfer updates while a download is running.
pub trait TransferObserver: Send + Sync {
    fn on_transfer(&self, update: TransferUpdate);
}

/// The external media fetch/transcode engine.
///
/// One instance serves one batch at a time; the orchestrator never calls it
/// concurrently.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Metadata-only lookup; no media bytes are fetched.
    async fn probe(&self, url: &str, socket_timeout: Duration)
        -> Result<MediaDescriptor, EngineError>;

    /// Download and transcode everything `request` selects.
    async fn download(
        &self,
        request: &DownloadRequest,
        observer: &dyn TransferObserver,
    ) -> Result<DownloadReport, EngineError>;
}
