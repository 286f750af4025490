#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use audiograb_engine::{
    CancellationToken, DownloadReport, DownloadRequest, EngineError, EngineEvent, MediaDescriptor,
    MediaEngine, ProgressEvent, ProgressSink, TransferObserver, TransferUpdate,
};

/// Scriptable stand-in for yt-dlp.
#[derive(Default)]
pub struct FakeEngine {
    pub fail_download: HashSet<String>,
    pub fail_transcode: HashSet<String>,
    pub fail_probe: HashSet<String>,
    pub collections: HashSet<String>,
    /// Cancelled when the download of this URL starts.
    pub cancel_on: Option<(String, CancellationToken)>,
    pub downloads: Mutex<Vec<DownloadRequest>>,
    pub probes: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn failing_on(urls: &[&str]) -> Self {
        Self {
            fail_download: urls.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl MediaEngine for FakeEngine {
    async fn probe(
        &self,
        url: &str,
        _socket_timeout: Duration,
    ) -> Result<MediaDescriptor, EngineError> {
        self.probes.lock().unwrap().push(url.to_string());
        if self.fail_probe.contains(url) {
            return Err(EngineError::Probe(format!("no metadata for {url}")));
        }
        if self.collections.contains(url) {
            return Ok(MediaDescriptor::Collection {
                title: format!("{url} list"),
                entry_count: 3,
            });
        }
        Ok(MediaDescriptor::Single {
            title: format!("{url} title"),
            file_stem: Some(format!("{url} title")),
        })
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        observer: &dyn TransferObserver,
    ) -> Result<DownloadReport, EngineError> {
        self.downloads.lock().unwrap().push(request.clone());
        if let Some((url, token)) = &self.cancel_on {
            if *url == request.url {
                token.cancel();
            }
        }
        if self.fail_download.contains(&request.url) {
            return Err(EngineError::Download(format!("{} is unavailable", request.url)));
        }
        if self.fail_transcode.contains(&request.url) {
            return Err(EngineError::Transcode("ffmpeg not found".to_string()));
        }
        let filename = format!("{} title.webm", request.url);
        observer.on_transfer(TransferUpdate::Downloading {
            filename: filename.clone(),
            percent: "50.0%".to_string(),
            speed: "1.00MiB/s".to_string(),
        });
        observer.on_transfer(TransferUpdate::Finished { filename });
        Ok(DownloadReport {
            files: vec![request.output_dir.join(format!(
                "{} title.{}",
                request.url,
                request.format.extension()
            ))],
            member_errors: Vec::new(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn item_events(&self) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Item(progress) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn outcomes(&self) -> Vec<ProgressEvent> {
        self.item_events()
            .into_iter()
            .filter(ProgressEvent::is_outcome)
            .collect()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Overall(progress) => Some(progress.fraction()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn write_url_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
