use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use audiograb_core::{AudioFormat, Quality, Settings};
use audiograb_engine::AtomicFileWriter;
use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};

/// What survives between runs: the last folder and the download options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PersistedSettings {
    pub folder: Option<PathBuf>,
    pub quality_kbps: u32,
    pub format: String,
    pub expand_playlists: bool,
    pub skip_existing: bool,
    pub retries: u32,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self::from_settings(Settings::default(), None)
    }
}

impl PersistedSettings {
    pub(crate) fn from_settings(settings: Settings, folder: Option<PathBuf>) -> Self {
        Self {
            folder,
            quality_kbps: settings.quality.kbps(),
            format: settings.format.as_str().to_string(),
            expand_playlists: settings.expand_playlists,
            skip_existing: settings.skip_existing,
            retries: settings.retries,
        }
    }

    /// Unknown quality or format values fall back to the defaults.
    pub(crate) fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let quality = Quality::from_kbps(self.quality_kbps).unwrap_or_else(|| {
            engine_warn!("Ignoring unsupported quality {} kbps", self.quality_kbps);
            defaults.quality
        });
        let format = AudioFormat::parse(&self.format).unwrap_or_else(|| {
            engine_warn!("Ignoring unsupported format {:?}", self.format);
            defaults.format
        });
        Settings {
            quality,
            format,
            expand_playlists: self.expand_playlists,
            skip_existing: self.skip_existing,
            retries: self.retries,
        }
        .clamped()
    }
}

pub(crate) fn load_settings(path: &Path) -> PersistedSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PersistedSettings::default();
        }
        Err(err) => {
            engine_warn!("Failed to read settings from {:?}: {}", path, err);
            return PersistedSettings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            engine_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            engine_warn!("Failed to parse settings from {:?}: {}", path, err);
            PersistedSettings::default()
        }
    }
}

pub(crate) fn save_settings(path: &Path, settings: &PersistedSettings) -> anyhow::Result<()> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(settings, pretty)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("settings path {:?} has no file name", path))?;

    AtomicFileWriter::new(dir)
        .write(&filename.to_string_lossy(), content.as_bytes())
        .with_context(|| format!("writing settings to {:?}", path))?;
    engine_info!("Saved settings to {:?}", path);
    Ok(())
}
