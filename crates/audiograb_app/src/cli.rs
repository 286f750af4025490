//! Command-line arguments for the audiograb front-end.

use std::path::PathBuf;
use std::time::Duration;

use audiograb_core::{AudioFormat, Quality, Settings, MAX_RETRIES};
use clap::{Parser, ValueEnum};
use engine_logging::LogDestination;

/// Download the audio track of videos and playlists through yt-dlp.
#[derive(Debug, Parser)]
#[command(name = "audiograb", version)]
#[command(about = "Batch audio downloader driven by yt-dlp", long_about = None)]
pub struct Cli {
    /// A URL, or the path of a text file with one URL per line.
    pub input: String,

    /// Destination folder. Defaults to the last folder used, then the current directory.
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Audio bitrate in kbps.
    #[arg(short, long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Output container/codec.
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Only fetch the first entry of a playlist URL.
    #[arg(long)]
    pub no_playlist: bool,

    /// Skip items whose output file already exists.
    #[arg(long, overrides_with = "overwrite")]
    pub skip_existing: bool,

    /// Re-download and replace existing files.
    #[arg(long, overrides_with = "skip_existing")]
    pub overwrite: bool,

    /// Retry budget per item, handed to yt-dlp.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(0..=MAX_RETRIES as i64))]
    pub retries: Option<u32>,

    /// yt-dlp executable name or path.
    #[arg(long = "yt-dlp", value_name = "PATH", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Network timeout in seconds for yt-dlp.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub socket_timeout: u64,

    /// Where log output goes: file, terminal or both.
    #[arg(long, value_name = "DEST", default_value = "file", value_parser = parse_log_destination)]
    pub log_to: LogDestination,

    /// Log file path.
    #[arg(long, value_name = "PATH", default_value = engine_logging::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Settings file remembering the last folder and options.
    #[arg(long, value_name = "PATH", default_value = "./.audiograb_settings.ron")]
    pub settings: PathBuf,

    /// Plain ASCII status icons instead of emoji.
    #[arg(long)]
    pub ascii: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    #[value(name = "128")]
    Kbps128,
    #[value(name = "192")]
    Kbps192,
    #[value(name = "320")]
    Kbps320,
}

impl From<QualityArg> for Quality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::Kbps128 => Quality::Kbps128,
            QualityArg::Kbps192 => Quality::Kbps192,
            QualityArg::Kbps320 => Quality::Kbps320,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Mp3,
    M4a,
    Ogg,
}

impl From<FormatArg> for AudioFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Mp3 => AudioFormat::Mp3,
            FormatArg::M4a => AudioFormat::M4a,
            FormatArg::Ogg => AudioFormat::Ogg,
        }
    }
}

fn parse_log_destination(value: &str) -> Result<LogDestination, String> {
    LogDestination::parse(value)
        .ok_or_else(|| format!("unknown log destination '{value}' (file, terminal, both)"))
}

impl Cli {
    /// Applies the flags given on the command line on top of `base`.
    pub fn override_settings(&self, base: Settings) -> Settings {
        let mut settings = base;
        if let Some(quality) = self.quality {
            settings.quality = quality.into();
        }
        if let Some(format) = self.format {
            settings.format = format.into();
        }
        if self.no_playlist {
            settings.expand_playlists = false;
        }
        if self.skip_existing {
            settings.skip_existing = true;
        }
        if self.overwrite {
            settings.skip_existing = false;
        }
        if let Some(retries) = self.retries {
            settings.retries = retries;
        }
        settings.clamped()
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse cli")
    }

    #[test]
    fn defaults_keep_base_settings() {
        let cli = parse(&["audiograb", "https://v.example/1"]);
        assert_eq!(cli.input, "https://v.example/1");
        assert!(cli.dest.is_none());
        assert_eq!(cli.log_to, LogDestination::File);
        assert_eq!(cli.socket_timeout(), Duration::from_secs(30));
        assert_eq!(cli.override_settings(Settings::default()), Settings::default());
    }

    #[test]
    fn flags_override_base_settings() {
        let cli = parse(&[
            "audiograb",
            "urls.txt",
            "--dest",
            "/music",
            "--quality",
            "320",
            "--format",
            "ogg",
            "--no-playlist",
            "--overwrite",
            "--retries",
            "7",
        ]);
        assert_eq!(cli.dest, Some(PathBuf::from("/music")));
        let settings = cli.override_settings(Settings::default());
        assert_eq!(settings.quality, Quality::Kbps320);
        assert_eq!(settings.format, AudioFormat::Ogg);
        assert!(!settings.expand_playlists);
        assert!(!settings.skip_existing);
        assert_eq!(settings.retries, 7);
    }

    #[test]
    fn last_of_skip_and_overwrite_wins() {
        let cli = parse(&["audiograb", "u", "--overwrite", "--skip-existing"]);
        let base = Settings {
            skip_existing: false,
            ..Settings::default()
        };
        assert!(cli.override_settings(base).skip_existing);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["audiograb", "u", "--quality", "256"]).is_err());
        assert!(Cli::try_parse_from(["audiograb", "u", "--retries", "11"]).is_err());
        assert!(Cli::try_parse_from(["audiograb", "u", "--log-to", "syslog"]).is_err());
        assert!(Cli::try_parse_from(["audiograb"]).is_err());
    }
}
