use std::io::{self, BufRead, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use audiograb_core::{update, AppState, Msg, SessionState};
use audiograb_engine::{YtDlpEngine, YtDlpSettings};
use engine_logging::{engine_error, engine_info, engine_warn};
use log::LevelFilter;

use super::effects::EffectRunner;
use super::persistence::{load_settings, save_settings, PersistedSettings};
use super::ui::render::TerminalRenderer;
use super::ui::theme;
use crate::cli::Cli;

/// Render throttle while a batch is running.
const TICK_INTERVAL: Duration = Duration::from_millis(75);

/// Exit code when the batch ran but some items failed or it was cancelled.
const EXIT_PARTIAL: u8 = 2;

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    if !engine_logging::initialize(cli.log_to, LevelFilter::Info, &cli.log_file) {
        eprintln!("Warning: logging is disabled");
    }
    engine_info!("audiograb {} starting", env!("CARGO_PKG_VERSION"));

    let persisted = load_settings(&cli.settings);
    let settings = cli.override_settings(persisted.settings());
    let folder = match cli.dest.clone().or_else(|| persisted.folder.clone()) {
        Some(folder) => folder,
        None => std::env::current_dir().context("resolving the current directory")?,
    };

    let engine = YtDlpEngine::new(YtDlpSettings {
        program: cli.yt_dlp.clone(),
        ..YtDlpSettings::default()
    });

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let icons = if cli.ascii {
        &theme::ASCII
    } else {
        &theme::EMOJI
    };
    let mut session = Session {
        state: AppState::with_settings(settings),
        runner: EffectRunner::new(Arc::new(engine), cli.socket_timeout(), msg_tx.clone()),
        renderer: TerminalRenderer::new(io::stdout(), icons),
        outcome: None,
    };

    session.dispatch(Msg::InputChanged(cli.input.clone()))?;
    session.dispatch(Msg::FolderChosen(folder.clone()))?;
    session.dispatch(Msg::StartClicked)?;
    if session.state.session() == SessionState::Idle {
        // Start was rejected; the reason is already on screen.
        return Ok(ExitCode::FAILURE);
    }

    spawn_cancel_listener(msg_tx);

    let outcome = loop {
        let msg = match msg_rx.recv_timeout(TICK_INTERVAL) {
            Ok(msg) => msg,
            Err(mpsc::RecvTimeoutError::Timeout) => Msg::Tick,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                break Outcome::Aborted;
            }
        };
        session.dispatch(msg)?;
        if let Some(outcome) = session.outcome {
            break outcome;
        }
    };

    let persisted = PersistedSettings::from_settings(
        session.state.settings(),
        remembered_folder(outcome, folder, persisted.folder),
    );
    if let Err(err) = save_settings(&cli.settings, &persisted) {
        engine_warn!("Could not save settings: {:#}", err);
    }

    Ok(match outcome {
        Outcome::Clean => ExitCode::SUCCESS,
        Outcome::Partial => ExitCode::from(EXIT_PARTIAL),
        Outcome::Aborted => ExitCode::FAILURE,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Every item succeeded.
    Clean,
    /// Some items failed or the batch was cancelled.
    Partial,
    /// The batch never ran.
    Aborted,
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer<Stdout>,
    outcome: Option<Outcome>,
}

impl Session {
    fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        match &msg {
            Msg::BatchFinished(summary) => {
                self.outcome = Some(if summary.failed == 0 && !summary.cancelled {
                    Outcome::Clean
                } else {
                    Outcome::Partial
                });
            }
            Msg::BatchAborted(message) => {
                engine_error!("Batch aborted: {}", message);
                self.outcome = Some(Outcome::Aborted);
            }
            _ => {}
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.run(effects);

        if state.consume_dirty() {
            self.renderer
                .render(&state.view())
                .context("writing to the terminal")?;
        }
        self.state = state;
        Ok(())
    }
}

/// The folder is only remembered once a batch actually ran in it.
fn remembered_folder(
    outcome: Outcome,
    used: PathBuf,
    previous: Option<PathBuf>,
) -> Option<PathBuf> {
    match outcome {
        Outcome::Clean | Outcome::Partial => Some(used),
        Outcome::Aborted => previous,
    }
}

/// Typing `q` or `cancel` followed by Enter asks the batch to stop.
fn spawn_cancel_listener(msg_tx: mpsc::Sender<Msg>) {
    let spawned = thread::Builder::new()
        .name("audiograb-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if is_cancel_command(&line) && msg_tx.send(Msg::CancelClicked).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        engine_warn!("Cancel listener unavailable: {}", err);
    }
}

fn is_cancel_command(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit" | "cancel")
}
