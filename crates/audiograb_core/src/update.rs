use crate::{
    AppState, BatchOrder, BatchSummary, Effect, Icon, ItemPhase, Msg, SessionState, Severity,
};

/// Longest item label shown in a "Processing" line.
const LABEL_LIMIT: usize = 50;

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(input) => {
            state.set_input(input);
            Vec::new()
        }
        Msg::FolderChosen(folder) => {
            let text = format!("Destination folder: {}", folder.display());
            state.set_folder(folder);
            state.push_status(Icon::Folder, Severity::Info, text);
            Vec::new()
        }
        Msg::SettingsChanged(settings) => {
            state.set_settings(settings);
            Vec::new()
        }
        Msg::StartClicked => start_batch(&mut state),
        Msg::CancelClicked => {
            if state.session() == SessionState::Running {
                state.set_session(SessionState::Cancelling);
                state.push_status(
                    Icon::Cancel,
                    Severity::Warning,
                    "Cancelling after the current item...".to_string(),
                );
                vec![Effect::CancelBatch]
            } else {
                Vec::new()
            }
        }
        Msg::ItemProgress {
            index,
            total,
            label,
            phase,
            detail,
            probe_warning,
        } => {
            apply_item_progress(&mut state, index, total, &label, phase, detail, probe_warning);
            Vec::new()
        }
        Msg::Transfer {
            filename,
            percent,
            speed,
            ..
        } => {
            state.set_transfer(Some(format!("{filename}: {percent} at {speed}")));
            Vec::new()
        }
        Msg::TransferFinished { filename, .. } => {
            state.set_transfer(None);
            state.push_status(
                Icon::Success,
                Severity::Success,
                format!("Transferred: {filename}"),
            );
            Vec::new()
        }
        Msg::OverallProgress { completed, total } => {
            state.set_progress(completed, total);
            Vec::new()
        }
        Msg::BatchFinished(summary) => {
            finish_batch(&mut state, summary);
            Vec::new()
        }
        Msg::BatchAborted(message) => {
            if state.session() != SessionState::Idle {
                state.set_session(SessionState::Idle);
                state.set_transfer(None);
                state.push_status(Icon::Error, Severity::Error, format!("Batch failed: {message}"));
            }
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn start_batch(state: &mut AppState) -> Vec<Effect> {
    if state.session() != SessionState::Idle {
        return Vec::new();
    }
    if state.input().trim().is_empty() {
        state.push_status(
            Icon::Error,
            Severity::Error,
            "Enter a URL or choose a file with URLs first.".to_string(),
        );
        return Vec::new();
    }
    let Some(folder) = state.folder().map(ToOwned::to_owned) else {
        state.push_status(
            Icon::Error,
            Severity::Error,
            "Choose a download folder first.".to_string(),
        );
        return Vec::new();
    };

    let order = BatchOrder {
        raw_input: state.input().trim().to_string(),
        folder,
        settings: state.settings(),
    };
    state.reset_batch();
    state.set_session(SessionState::Running);
    state.push_status(Icon::Rocket, Severity::Info, "Starting download...".to_string());
    vec![Effect::StartBatch(order)]
}

fn apply_item_progress(
    state: &mut AppState,
    index: usize,
    total: usize,
    label: &str,
    phase: ItemPhase,
    detail: String,
    probe_warning: bool,
) {
    match phase {
        ItemPhase::Probing => {
            if index == 1 {
                state.set_progress(0, total);
            }
            state.push_status(
                Icon::Music,
                Severity::Info,
                format!("[{index}/{total}] Processing: {}", shorten(label, LABEL_LIMIT)),
            );
        }
        ItemPhase::Downloading => {
            if !detail.is_empty() {
                let icon = if detail.starts_with("playlist") {
                    Icon::Playlist
                } else {
                    Icon::Music
                };
                state.push_status(icon, Severity::Info, capitalize(&detail));
            }
        }
        ItemPhase::Finished => {
            state.set_transfer(None);
            if detail.starts_with("skipped") {
                state.push_status(Icon::Skip, Severity::Info, capitalize(&detail));
            } else if detail.is_empty() {
                state.push_status(
                    Icon::Success,
                    Severity::Success,
                    "Download succeeded".to_string(),
                );
            } else {
                state.push_status(
                    Icon::Success,
                    Severity::Success,
                    format!("Download succeeded: {detail}"),
                );
            }
        }
        ItemPhase::Error if probe_warning => {
            state.push_status(
                Icon::Warning,
                Severity::Warning,
                format!("Could not read metadata first: {detail}"),
            );
        }
        ItemPhase::Error => {
            state.set_transfer(None);
            state.push_status(Icon::Error, Severity::Error, format!("Error: {detail}"));
        }
    }
}

fn finish_batch(state: &mut AppState, summary: BatchSummary) {
    state.set_session(SessionState::Idle);
    state.set_transfer(None);
    state.set_summary(summary);
    if summary.cancelled {
        state.push_status(
            Icon::Cancel,
            Severity::Warning,
            format!(
                "Cancelled after {} of {} item(s). Succeeded: {}, Errors: {}",
                summary.attempted(),
                summary.total,
                summary.succeeded,
                summary.failed
            ),
        );
    } else {
        state.push_status(
            Icon::Celebrate,
            Severity::Success,
            format!(
                "Completed! Succeeded: {}, Errors: {}",
                summary.succeeded, summary.failed
            ),
        );
    }
}

/// First `limit` characters followed by "..." when the label is longer.
pub(crate) fn shorten(label: &str, limit: usize) -> String {
    if label.chars().count() <= limit {
        return label.to_string();
    }
    let head: String = label.chars().take(limit).collect();
    format!("{head}...")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_labels_are_shortened_on_char_boundaries() {
        assert_eq!(shorten("short", 50), "short");
        let label = "é".repeat(60);
        let shortened = shorten(&label, 50);
        assert_eq!(shortened.chars().count(), 53);
        assert!(shortened.ends_with("..."));
    }

    #[test]
    fn capitalize_handles_empty_text() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("video 'x'"), "Video 'x'");
    }
}
