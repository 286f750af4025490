use std::sync::mpsc;

use engine_logging::{engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::filename::expected_output_path;
use crate::input::resolve_input;
use crate::media::{MediaEngine, TransferObserver};
use crate::persist::ensure_output_dir;
use crate::{
    BatchError, BatchProgress, BatchResult, DownloadReport, DownloadRequest, EngineError,
    EngineEvent, FailureKind, ItemIndex, JobRequest, MediaDescriptor, OutputNaming, Phase,
    PlaylistScope, ProgressEvent, TransferUpdate,
};

/// Receives everything a batch reports. Called from the batch worker thread.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Run one batch to completion.
///
/// Input and destination problems fail the whole batch before any item event
/// is emitted. After that, every URL is attempted in order; a failing item is
/// counted and reported, never propagated. `cancel` is honoured between items.
pub async fn run_batch(
    engine: &dyn MediaEngine,
    request: &JobRequest,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<BatchResult, BatchError> {
    let urls = resolve_input(&request.raw_input)?;
    if urls.is_empty() {
        return Err(BatchError::NoUrls);
    }
    ensure_output_dir(&request.destination)?;

    let total = urls.len();
    engine_info!(
        "batch start: {} url(s) -> {:?} ({} {}kbps, playlists={}, retries={})",
        total,
        request.destination,
        request.format.extension(),
        request.quality.kbps(),
        request.expand_playlists,
        request.retry_count
    );

    let mut result = BatchResult::new(total);
    for (offset, url) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            engine_warn!(
                "batch cancelled with {} of {} item(s) left",
                total - offset,
                total
            );
            result.cancelled = true;
            break;
        }

        let item = ItemReporter {
            sink,
            index: offset + 1,
            total,
            label: url.clone(),
        };
        if process_item(engine, request, &item).await {
            result.succeeded += 1;
        } else {
            result.failed += 1;
        }
        sink.emit(EngineEvent::Overall(BatchProgress {
            completed: item.index,
            total,
        }));
    }

    engine_info!(
        "batch done: total={} succeeded={} failed={} cancelled={}",
        result.total,
        result.succeeded,
        result.failed,
        result.cancelled
    );
    sink.emit(EngineEvent::Completed(result));
    Ok(result)
}

struct ItemReporter<'a> {
    sink: &'a dyn ProgressSink,
    index: ItemIndex,
    total: usize,
    label: String,
}

impl ItemReporter<'_> {
    fn emit(&self, phase: Phase, detail: impl Into<String>, failure: Option<FailureKind>) {
        self.sink.emit(EngineEvent::Item(ProgressEvent {
            index: self.index,
            total: self.total,
            label: self.label.clone(),
            phase,
            detail: detail.into(),
            failure,
        }));
    }

    fn fail(&self, err: &EngineError) {
        self.emit(Phase::Error, err.to_string(), Some(err.kind()));
    }
}

impl TransferObserver for ItemReporter<'_> {
    fn on_transfer(&self, update: TransferUpdate) {
        self.sink.emit(EngineEvent::Transfer {
            index: self.index,
            update,
        });
    }
}

/// Returns whether the item counts as succeeded.
async fn process_item(
    engine: &dyn MediaEngine,
    request: &JobRequest,
    item: &ItemReporter<'_>,
) -> bool {
    let url = item.label.as_str();
    item.emit(Phase::Probing, "", None);

    let descriptor = match engine.probe(url, request.socket_timeout).await {
        Ok(descriptor) => Some(descriptor),
        Err(err) => {
            // Non-fatal: the download below is still attempted.
            engine_warn!("probe failed for {} (continuing with download): {}", url, err);
            item.emit(Phase::Error, err.to_string(), Some(FailureKind::Probe));
            None
        }
    };

    if request.skip_existing {
        let existing = descriptor
            .as_ref()
            .and_then(|d| expected_output_path(&request.destination, d, request.format))
            .filter(|path| path.exists());
        if let Some(path) = existing {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            engine_info!("skipping {}: {:?} already exists", url, path);
            item.emit(Phase::Finished, format!("skipped, {name} already exists"), None);
            return true;
        }
    }

    let download = plan_download(url, request, descriptor.as_ref());
    item.emit(
        Phase::Downloading,
        describe(descriptor.as_ref(), request.expand_playlists),
        None,
    );

    match engine.download(&download, item).await {
        Ok(report) => {
            engine_info!("downloaded {} ({} file(s))", url, report.files.len());
            item.emit(Phase::Finished, summarize(&report), None);
            true
        }
        Err(err) => {
            engine_warn!("{} failed for {}: {}", err.kind(), url, err);
            item.fail(&err);
            false
        }
    }
}

fn plan_download(
    url: &str,
    request: &JobRequest,
    descriptor: Option<&MediaDescriptor>,
) -> DownloadRequest {
    let is_collection = descriptor.map(MediaDescriptor::is_collection);
    let (playlist, naming) = match (request.expand_playlists, is_collection) {
        (true, Some(true)) => (PlaylistScope::Expand, OutputNaming::Indexed),
        (true, Some(false)) => (PlaylistScope::Expand, OutputNaming::Title),
        (true, None) => (PlaylistScope::Expand, OutputNaming::IndexedIfCollection),
        (false, Some(true)) => (PlaylistScope::FirstEntry, OutputNaming::Title),
        (false, _) => (PlaylistScope::Single, OutputNaming::Title),
    };

    DownloadRequest {
        url: url.to_string(),
        output_dir: request.destination.clone(),
        format: request.format,
        quality: request.quality,
        retries: request.retry_count,
        playlist,
        naming,
        skip_existing: request.skip_existing,
        socket_timeout: request.socket_timeout,
    }
}

fn describe(descriptor: Option<&MediaDescriptor>, expand_playlists: bool) -> String {
    match descriptor {
        Some(MediaDescriptor::Collection { title, entry_count }) => {
            let scope = if expand_playlists {
                "downloading all"
            } else {
                "first entry only"
            };
            format!("playlist '{title}' ({entry_count} entries), {scope}")
        }
        Some(MediaDescriptor::Single { title, .. }) => format!("video '{title}'"),
        None => String::new(),
    }
}

fn summarize(report: &DownloadReport) -> String {
    match (report.files.len(), report.member_errors.len()) {
        (0, 0) => String::new(),
        (1, 0) => report.files[0]
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        (files, 0) => format!("{files} files"),
        (files, errors) => format!("{files} files, {errors} entries failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn collection() -> MediaDescriptor {
        MediaDescriptor::Collection {
            title: "Mix".into(),
            entry_count: 12,
        }
    }

    #[test]
    fn collection_without_expansion_fetches_first_entry() {
        let mut request = JobRequest::new("x", "out");
        request.expand_playlists = false;
        let plan = plan_download("u", &request, Some(&collection()));
        assert_eq!(plan.playlist, PlaylistScope::FirstEntry);
        assert_eq!(plan.naming, OutputNaming::Title);
    }

    #[test]
    fn expanded_collection_uses_indexed_names() {
        let request = JobRequest::new("x", "out");
        let plan = plan_download("u", &request, Some(&collection()));
        assert_eq!(plan.playlist, PlaylistScope::Expand);
        assert_eq!(plan.naming, OutputNaming::Indexed);
        assert_eq!(plan.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn unknown_kind_defers_naming_to_engine() {
        let request = JobRequest::new("x", "out");
        let plan = plan_download("u", &request, None);
        assert_eq!(plan.naming, OutputNaming::IndexedIfCollection);

        let mut request = request;
        request.expand_playlists = false;
        let plan = plan_download("u", &request, None);
        assert_eq!(plan.playlist, PlaylistScope::Single);
        assert_eq!(plan.naming, OutputNaming::Title);
    }

    #[test]
    fn summary_mentions_member_failures() {
        let report = DownloadReport {
            files: vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")],
            member_errors: vec!["gone".into()],
        };
        assert_eq!(summarize(&report), "2 files, 1 entries failed");
        let single = DownloadReport {
            files: vec![PathBuf::from("/music/a.mp3")],
            member_errors: Vec::new(),
        };
        assert_eq!(summarize(&single), "a.mp3");
    }
}
