use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use audiograb_core::{BatchOrder, BatchSummary, Effect, ItemPhase, Msg, Settings};
use audiograb_engine::{
    AudioFormat, BatchHandle, CancellationToken, EngineEvent, FailureKind, JobRequest,
    MediaEngine, Phase, Quality, TransferUpdate,
};
use engine_logging::{engine_error, engine_info, engine_warn};

/// Runs effects produced by `update` and feeds engine events back as `Msg`s.
pub struct EffectRunner {
    engine: Arc<dyn MediaEngine>,
    socket_timeout: Duration,
    msg_tx: mpsc::Sender<Msg>,
    active: Option<CancellationToken>,
}

impl EffectRunner {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        socket_timeout: Duration,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            engine,
            socket_timeout,
            msg_tx,
            active: None,
        }
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartBatch(order) => self.start(order),
                Effect::CancelBatch => match &self.active {
                    Some(token) => {
                        engine_info!("Cancel requested; stopping before the next item");
                        token.cancel();
                    }
                    None => engine_warn!("Cancel requested but no batch is running"),
                },
            }
        }
    }

    fn start(&mut self, order: BatchOrder) {
        let request = job_request(&order, self.socket_timeout);
        engine_info!(
            "StartBatch input_len={} folder={:?}",
            order.raw_input.len(),
            order.folder
        );

        let handle = BatchHandle::spawn(self.engine.clone(), request);
        self.active = Some(handle.cancel_token());

        let msg_tx = self.msg_tx.clone();
        let spawned = thread::Builder::new()
            .name("audiograb-events".to_string())
            .spawn(move || forward_events(handle, msg_tx));
        if let Err(err) = spawned {
            engine_error!("Failed to start event forwarding: {}", err);
            let _ = self
                .msg_tx
                .send(Msg::BatchAborted(format!("failed to start event forwarding: {err}")));
        }
    }
}

/// Message sent when the worker goes away without reporting an outcome.
pub(crate) const WORKER_STOPPED: &str = "batch worker stopped unexpectedly";

fn forward_events(handle: BatchHandle, msg_tx: mpsc::Sender<Msg>) {
    let mut terminal_seen = false;
    while let Some(event) = handle.recv() {
        terminal_seen = matches!(
            event,
            EngineEvent::Completed(_) | EngineEvent::Aborted { .. }
        );
        if msg_tx.send(to_msg(event)).is_err() || terminal_seen {
            break;
        }
    }
    handle.join();
    if !terminal_seen {
        engine_error!("{}", WORKER_STOPPED);
        let _ = msg_tx.send(Msg::BatchAborted(WORKER_STOPPED.to_string()));
    }
}

pub(crate) fn job_request(order: &BatchOrder, socket_timeout: Duration) -> JobRequest {
    let Settings {
        quality,
        format,
        expand_playlists,
        skip_existing,
        retries,
    } = order.settings;

    let mut request = JobRequest::new(order.raw_input.clone(), order.folder.clone());
    request.quality = map_quality(quality);
    request.format = map_format(format);
    request.expand_playlists = expand_playlists;
    request.skip_existing = skip_existing;
    request.retry_count = retries;
    request.socket_timeout = socket_timeout;
    request
}

pub(crate) fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Item(progress) => Msg::ItemProgress {
            index: progress.index,
            total: progress.total,
            probe_warning: progress.failure == Some(FailureKind::Probe),
            label: progress.label,
            phase: map_phase(progress.phase),
            detail: progress.detail,
        },
        EngineEvent::Transfer {
            index,
            update: TransferUpdate::Downloading {
                filename,
                percent,
                speed,
            },
        } => Msg::Transfer {
            index,
            filename,
            percent,
            speed,
        },
        EngineEvent::Transfer {
            index,
            update: TransferUpdate::Finished { filename },
        } => Msg::TransferFinished { index, filename },
        EngineEvent::Overall(progress) => Msg::OverallProgress {
            completed: progress.completed,
            total: progress.total,
        },
        EngineEvent::Completed(result) => Msg::BatchFinished(BatchSummary {
            total: result.total,
            succeeded: result.succeeded,
            failed: result.failed,
            cancelled: result.cancelled,
        }),
        EngineEvent::Aborted { message } => Msg::BatchAborted(message),
    }
}

fn map_phase(phase: Phase) -> ItemPhase {
    match phase {
        Phase::Probing => ItemPhase::Probing,
        Phase::Downloading => ItemPhase::Downloading,
        Phase::Finished => ItemPhase::Finished,
        Phase::Error => ItemPhase::Error,
    }
}

fn map_quality(quality: audiograb_core::Quality) -> Quality {
    match quality {
        audiograb_core::Quality::Kbps128 => Quality::Kbps128,
        audiograb_core::Quality::Kbps192 => Quality::Kbps192,
        audiograb_core::Quality::Kbps320 => Quality::Kbps320,
    }
}

fn map_format(format: audiograb_core::AudioFormat) -> AudioFormat {
    match format {
        audiograb_core::AudioFormat::Mp3 => AudioFormat::Mp3,
        audiograb_core::AudioFormat::M4a => AudioFormat::M4a,
        audiograb_core::AudioFormat::Ogg => AudioFormat::Ogg,
    }
}
