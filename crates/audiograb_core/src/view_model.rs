use std::path::Path;

use crate::{AppState, SessionState, StatusLine};

/// Folder paths longer than this are shown with their head elided.
pub const FOLDER_LABEL_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub start_enabled: bool,
    pub cancel_enabled: bool,
    pub folder_label: Option<String>,
    /// 0.0 ..= 100.0
    pub progress_percent: f32,
    pub status_lines: Vec<StatusLine>,
    /// Bumped whenever the status log is cleared.
    pub log_generation: u64,
    pub transfer_line: Option<String>,
    pub stats_text: String,
    pub dirty: bool,
}

impl AppViewModel {
    pub(crate) fn from_state(state: &AppState) -> Self {
        let (completed, total) = state.progress();
        let progress_percent = if total == 0 {
            0.0
        } else {
            (completed as f32 / total as f32) * 100.0
        };
        let summary = state.summary().unwrap_or_default();

        Self {
            session: state.session(),
            start_enabled: state.can_start(),
            cancel_enabled: state.session() == SessionState::Running,
            folder_label: state.folder().map(folder_label),
            progress_percent,
            status_lines: state.status().to_vec(),
            log_generation: state.log_generation(),
            transfer_line: state.transfer().map(str::to_owned),
            stats_text: format!(
                "Downloads: {} | Succeeded: {} | Errors: {}",
                summary.total, summary.succeeded, summary.failed
            ),
            dirty: state.is_dirty(),
        }
    }
}

fn folder_label(folder: &Path) -> String {
    let text = folder.display().to_string();
    let len = text.chars().count();
    if len <= FOLDER_LABEL_LIMIT {
        return text;
    }
    let keep = FOLDER_LABEL_LIMIT - 3;
    let tail: String = text.chars().skip(len - keep).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_folders_are_shown_whole() {
        assert_eq!(folder_label(Path::new("/music")), "/music");
    }

    #[test]
    fn long_folders_keep_their_tail() {
        let long = format!("/{}", "a".repeat(80));
        let label = folder_label(Path::new(&long));
        assert_eq!(label.chars().count(), FOLDER_LABEL_LIMIT);
        assert!(label.starts_with("..."));
        assert!(long.ends_with(&label[3..]));
    }
}
