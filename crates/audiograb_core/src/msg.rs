use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the URL / file input.
    InputChanged(String),
    /// User picked the destination folder.
    FolderChosen(PathBuf),
    /// User saved new download options.
    SettingsChanged(crate::Settings),
    /// User clicked Download.
    StartClicked,
    /// User clicked Cancel.
    CancelClicked,
    /// Engine progress for one item.
    ItemProgress {
        index: usize,
        total: usize,
        label: String,
        phase: ItemPhase,
        detail: String,
        /// Set on the non-fatal metadata lookup failure.
        probe_warning: bool,
    },
    /// Engine transfer update for the running item.
    Transfer {
        index: usize,
        filename: String,
        percent: String,
        speed: String,
    },
    /// One file of the running item finished transferring.
    TransferFinished { index: usize, filename: String },
    /// Items attempted so far.
    OverallProgress { completed: usize, total: usize },
    /// Engine completion for the batch.
    BatchFinished(crate::BatchSummary),
    /// The batch could not start (input or destination problem).
    BatchAborted(String),
    /// UI/render tick to coalesce rendering.
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    Probing,
    Downloading,
    Finished,
    Error,
}
