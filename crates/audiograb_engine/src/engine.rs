use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::engine_error;
use tokio_util::sync::CancellationToken;

use crate::batch::{run_batch, ChannelProgressSink, ProgressSink};
use crate::media::MediaEngine;
use crate::{BatchError, EngineEvent, JobRequest};

/// A batch running on its own worker thread.
///
/// Events arrive in emission order. The stream ends with exactly one
/// `Completed` or `Aborted` event.
pub struct BatchHandle {
    event_rx: mpsc::Receiver<EngineEvent>,
    cancel: CancellationToken,
    worker: Option<thread::JoinHandle<()>>,
}

impl BatchHandle {
    pub fn spawn(engine: Arc<dyn MediaEngine>, request: JobRequest) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();

        let worker_cancel = cancel.clone();
        let worker_tx = event_tx.clone();
        let spawned = thread::Builder::new()
            .name("audiograb-batch".to_string())
            .spawn(move || run_worker(engine.as_ref(), &request, worker_tx, &worker_cancel));

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                report_abort(&event_tx, &BatchError::Worker(err));
                None
            }
        };

        Self {
            event_rx,
            cancel,
            worker,
        }
    }

    /// Stop before the next item; the running item is finished first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Blocks until the next event; `None` once the worker is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Wait for the worker thread to exit.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                engine_error!("batch worker panicked");
            }
        }
    }
}

fn run_worker(
    engine: &dyn MediaEngine,
    request: &JobRequest,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: &CancellationToken,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            report_abort(&event_tx, &BatchError::Worker(err));
            return;
        }
    };

    let sink = ChannelProgressSink::new(event_tx.clone());
    if let Err(err) = runtime.block_on(run_batch(engine, request, &sink, cancel)) {
        report_abort(&event_tx, &err);
    }
}

fn report_abort(event_tx: &mpsc::Sender<EngineEvent>, err: &BatchError) {
    engine_error!("batch aborted: {}", err);
    let sink = ChannelProgressSink::new(event_tx.clone());
    sink.emit(EngineEvent::Aborted {
        message: err.to_string(),
    });
}
