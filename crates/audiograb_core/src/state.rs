use std::path::{Path, PathBuf};

use crate::view_model::AppViewModel;

/// Upper bound for the per-item retry budget offered to the user.
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Kbps128,
    #[default]
    Kbps192,
    Kbps320,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Kbps128, Quality::Kbps192, Quality::Kbps320];

    pub fn from_kbps(kbps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|quality| quality.kbps() == kbps)
    }

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
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::M4a, AudioFormat::Ogg];

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "ogg",
        }
    }
}

/// Download options the user can change between batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub quality: Quality,
    pub format: AudioFormat,
    pub expand_playlists: bool,
    pub skip_existing: bool,
    pub retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            format: AudioFormat::default(),
            expand_playlists: true,
            skip_existing: true,
            retries: 3,
        }
    }
}

impl Settings {
    pub fn clamped(mut self) -> Self {
        self.retries = self.retries.min(MAX_RETRIES);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    /// Cancel requested; the running item is still finishing.
    Cancelling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Glyph key for a status line. The front-end owns the actual glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Music,
    Playlist,
    Folder,
    Rocket,
    Download,
    Success,
    Skip,
    Warning,
    Error,
    Cancel,
    Celebrate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub icon: Icon,
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    folder: Option<PathBuf>,
    settings: Settings,
    session: SessionState,
    status: Vec<StatusLine>,
    log_generation: u64,
    completed: usize,
    total: usize,
    transfer: Option<String>,
    summary: Option<BatchSummary>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: settings.clamped(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::from_state(self)
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub(crate) fn status(&self) -> &[StatusLine] {
        &self.status
    }

    pub(crate) fn log_generation(&self) -> u64 {
        self.log_generation
    }

    pub(crate) fn progress(&self) -> (usize, usize) {
        (self.completed, self.total)
    }

    pub(crate) fn transfer(&self) -> Option<&str> {
        self.transfer.as_deref()
    }

    pub(crate) fn summary(&self) -> Option<BatchSummary> {
        self.summary
    }

    pub(crate) fn can_start(&self) -> bool {
        self.session == SessionState::Idle
            && !self.input.trim().is_empty()
            && self.folder.is_some()
    }

    pub(crate) fn set_input(&mut self, input: String) {
        if self.input != input {
            self.input = input;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_folder(&mut self, folder: PathBuf) {
        self.folder = Some(folder);
        self.mark_dirty();
    }

    pub(crate) fn set_settings(&mut self, settings: Settings) {
        let settings = settings.clamped();
        if self.settings != settings {
            self.settings = settings;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_session(&mut self, session: SessionState) {
        if self.session != session {
            self.session = session;
            self.mark_dirty();
        }
    }

    /// Clears the status log and progress for a new batch.
    pub(crate) fn reset_batch(&mut self) {
        self.status.clear();
        self.log_generation += 1;
        self.completed = 0;
        self.total = 0;
        self.transfer = None;
        self.mark_dirty();
    }

    pub(crate) fn push_status(&mut self, icon: Icon, severity: Severity, text: String) {
        self.status.push(StatusLine {
            icon,
            severity,
            text,
        });
        self.mark_dirty();
    }

    pub(crate) fn set_progress(&mut self, completed: usize, total: usize) {
        self.completed = completed.min(total);
        self.total = total;
        self.mark_dirty();
    }

    pub(crate) fn set_transfer(&mut self, line: Option<String>) {
        if self.transfer != line {
            self.transfer = line;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_summary(&mut self, summary: BatchSummary) {
        self.summary = Some(summary);
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
