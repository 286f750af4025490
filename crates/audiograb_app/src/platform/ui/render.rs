use std::io::{self, Write};

use audiograb_core::{AppViewModel, Icon, SessionState};

use super::theme::IconTable;

const CLEAR_LINE: &str = "\r\x1b[2K";

/// Appends new status lines to a terminal and keeps one live transfer line
/// at the bottom.
pub struct TerminalRenderer<W: Write> {
    out: W,
    icons: &'static IconTable,
    clock: fn() -> String,
    generation: u64,
    printed: usize,
    transfer_open: bool,
    last_session: SessionState,
    last_percent: f32,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, icons: &'static IconTable) -> Self {
        Self::with_clock(out, icons, local_clock)
    }

    pub fn with_clock(out: W, icons: &'static IconTable, clock: fn() -> String) -> Self {
        Self {
            out,
            icons,
            clock,
            generation: 0,
            printed: 0,
            transfer_open: false,
            last_session: SessionState::Idle,
            last_percent: 0.0,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if view.log_generation != self.generation {
            self.generation = view.log_generation;
            self.printed = 0;
            self.last_percent = 0.0;
        }

        let started = self.last_session == SessionState::Idle && view.session != SessionState::Idle;
        let finished = self.last_session != SessionState::Idle && view.session == SessionState::Idle;
        self.last_session = view.session;

        let new_lines = view.status_lines.get(self.printed..).unwrap_or(&[]);
        let percent_changed = view.progress_percent != self.last_percent;
        if !new_lines.is_empty() || percent_changed || started || finished {
            self.close_transfer()?;
        }

        if started {
            if let Some(label) = &view.folder_label {
                writeln!(self.out, "{} {}", self.icons.folder, label)?;
            }
        }
        for line in new_lines {
            self.stamped(self.icons.glyph(line.icon), &line.text)?;
        }
        self.printed = view.status_lines.len();

        if percent_changed {
            self.last_percent = view.progress_percent;
            self.stamped("", &format!("Progress: {:.0}%", view.progress_percent))?;
        }
        if finished {
            writeln!(self.out, "{} {}", self.icons.stats, view.stats_text)?;
        }

        match &view.transfer_line {
            Some(line) => {
                write!(
                    self.out,
                    "{CLEAR_LINE}{} {}",
                    self.icons.glyph(Icon::Download),
                    line
                )?;
                self.transfer_open = true;
            }
            None => self.close_transfer()?,
        }
        self.out.flush()
    }

    fn stamped(&mut self, glyph: &str, text: &str) -> io::Result<()> {
        let time = (self.clock)();
        if glyph.is_empty() {
            writeln!(self.out, "[{time}] {text}")
        } else {
            writeln!(self.out, "[{time}] {glyph} {text}")
        }
    }

    fn close_transfer(&mut self) -> io::Result<()> {
        if self.transfer_open {
            write!(self.out, "{CLEAR_LINE}")?;
            self.transfer_open = false;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

fn local_clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use audiograb_core::{update, AppState, BatchSummary, ItemPhase, Msg};

    use super::super::theme::ASCII;
    use super::*;

    fn fixed_clock() -> String {
        "12:00:00".to_string()
    }

    fn step(state: AppState, msg: Msg, renderer: &mut TerminalRenderer<Vec<u8>>) -> AppState {
        let (state, _) = update(state, msg);
        renderer.render(&state.view()).unwrap();
        state
    }

    #[test]
    fn status_lines_are_printed_once_with_timestamps() {
        let mut renderer = TerminalRenderer::with_clock(Vec::new(), &ASCII, fixed_clock);
        let state = step(
            AppState::new(),
            Msg::InputChanged("https://v.example/1".into()),
            &mut renderer,
        );
        let state = step(state, Msg::FolderChosen(PathBuf::from("/music")), &mut renderer);
        let state = step(state, Msg::StartClicked, &mut renderer);
        let state = step(
            state,
            Msg::ItemProgress {
                index: 1,
                total: 1,
                label: "https://v.example/1".into(),
                phase: ItemPhase::Probing,
                detail: String::new(),
                probe_warning: false,
            },
            &mut renderer,
        );
        let state = step(state, Msg::Tick, &mut renderer);
        let state = step(
            state,
            Msg::OverallProgress {
                completed: 1,
                total: 1,
            },
            &mut renderer,
        );
        step(
            state,
            Msg::BatchFinished(BatchSummary {
                total: 1,
                succeeded: 1,
                failed: 0,
                cancelled: false,
            }),
            &mut renderer,
        );

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[12:00:00] [>] Destination folder: /music",
                "[dir] /music",
                "[12:00:00] [*] Starting download...",
                "[12:00:00] [~] [1/1] Processing: https://v.example/1",
                "[12:00:00] Progress: 100%",
                "[12:00:00] [=] Completed! Succeeded: 1, Errors: 0",
                "[stats] Downloads: 1 | Succeeded: 1 | Errors: 0",
            ]
        );
    }

    #[test]
    fn transfer_line_is_rewritten_in_place() {
        let mut renderer = TerminalRenderer::with_clock(Vec::new(), &ASCII, fixed_clock);
        let mut state = AppState::new();
        for percent in ["10.0%", "55.5%"] {
            state = step(
                state,
                Msg::Transfer {
                    index: 1,
                    filename: "Song.webm".into(),
                    percent: percent.into(),
                    speed: "1.00MiB/s".into(),
                },
                &mut renderer,
            );
        }
        step(
            state,
            Msg::TransferFinished {
                index: 1,
                filename: "Song.webm".into(),
            },
            &mut renderer,
        );

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(
            output,
            format!(
                "{CLEAR_LINE}[v] Song.webm: 10.0% at 1.00MiB/s\
                 {CLEAR_LINE}[v] Song.webm: 55.5% at 1.00MiB/s\
                 {CLEAR_LINE}[12:00:00] [ok] Transferred: Song.webm\n"
            )
        );
    }
}
