use std::path::{Path, PathBuf};

use crate::{AudioFormat, MediaDescriptor, OutputNaming};

impl OutputNaming {
    /// Output template handed to yt-dlp, relative to the destination folder.
    pub fn template(self) -> &'static str {
        match self {
            OutputNaming::Indexed => "%(playlist_index)02d - %(title)s.%(ext)s",
            OutputNaming::Title => "%(title)s.%(ext)s",
            OutputNaming::IndexedIfCollection => "%(playlist_index&{:02d} - |)s%(title)s.%(ext)s",
        }
    }
}

/// Path the transcoded file of a single item will have, if it can be predicted.
///
/// Collections have one file per member and are left to the engine.
pub fn expected_output_path(
    dir: &Path,
    descriptor: &MediaDescriptor,
    format: AudioFormat,
) -> Option<PathBuf> {
    match descriptor {
        MediaDescriptor::Single { title, file_stem } => {
            let stem = match file_stem {
                Some(stem) if !stem.trim().is_empty() => stem.clone(),
                _ => sanitize_title(title),
            };
            Some(dir.join(format!("{stem}.{}", format.extension())))
        }
        MediaDescriptor::Collection { .. } => None,
    }
}

/// Best-effort file stem from a title when the engine did not report one.
pub fn sanitize_title(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let mut cleaned = cleaned.trim_matches(&[' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_stem_wins_over_title() {
        let descriptor = MediaDescriptor::Single {
            title: "A/B".into(),
            file_stem: Some("A⧸B".into()),
        };
        let path = expected_output_path(Path::new("out"), &descriptor, AudioFormat::M4a).unwrap();
        assert_eq!(path, Path::new("out").join("A⧸B.m4a"));
    }

    #[test]
    fn title_is_sanitized_without_stem() {
        let descriptor = MediaDescriptor::Single {
            title: "What? A \"song\": live".into(),
            file_stem: None,
        };
        let path = expected_output_path(Path::new("out"), &descriptor, AudioFormat::Ogg).unwrap();
        assert_eq!(path, Path::new("out").join("What_ A _song__ live.ogg"));
    }

    #[test]
    fn collections_have_no_single_path() {
        let descriptor = MediaDescriptor::Collection {
            title: "Mix".into(),
            entry_count: 4,
        };
        assert!(expected_output_path(Path::new("out"), &descriptor, AudioFormat::Mp3).is_none());
    }

    #[test]
    fn reserved_and_empty_names_are_patched() {
        assert_eq!(sanitize_title("con"), "con_");
        assert_eq!(sanitize_title(" .. "), "untitled");
    }

    #[test]
    fn templates_follow_naming_rules() {
        assert!(OutputNaming::Indexed.template().starts_with("%(playlist_index)02d - "));
        assert_eq!(OutputNaming::Title.template(), "%(title)s.%(ext)s");
    }
}
