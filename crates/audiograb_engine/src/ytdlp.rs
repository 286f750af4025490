use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::media::{MediaEngine, TransferObserver};
use crate::{
    DownloadReport, DownloadRequest, EngineError, MediaDescriptor, PlaylistScope, TransferUpdate,
};

const PROGRESS_MARKER: &str = "[audiograb:progress]";
const FILE_MARKER: &str = "[audiograb:file]";

#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    /// Executable name or path.
    pub program: PathBuf,
    /// Format selector for the source stream.
    pub format_selector: String,
    /// Upper bound for a metadata probe, on top of the socket timeout.
    pub probe_timeout: Duration,
}

impl Default for YtDlpSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            format_selector: "bestaudio/best".to_string(),
            probe_timeout: Duration::from_secs(120),
        }
    }
}

/// `MediaEngine` backed by the `yt-dlp` executable (which drives ffmpeg).
#[derive(Debug, Clone, Default)]
pub struct YtDlpEngine {
    settings: YtDlpSettings,
}

impl YtDlpEngine {
    pub fn new(settings: YtDlpSettings) -> Self {
        Self { settings }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.settings.program);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        configure_for_background(&mut cmd);
        cmd
    }

    fn unavailable(&self, err: std::io::Error) -> EngineError {
        EngineError::Unavailable(format!(
            "could not start {}: {err}. Install it with `pip install -U yt-dlp` or pass its path with --yt-dlp",
            self.settings.program.display()
        ))
    }
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    // Keep console windows from popping up when launched from a GUI shell.
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}

#[async_trait::async_trait]
impl MediaEngine for YtDlpEngine {
    async fn probe(
        &self,
        url: &str,
        socket_timeout: Duration,
    ) -> Result<MediaDescriptor, EngineError> {
        let mut cmd = self.command();
        cmd.args(probe_args(url, socket_timeout));
        let output = tokio::time::timeout(self.settings.probe_timeout, cmd.output())
            .await
            .map_err(|_| {
                EngineError::Probe(format!(
                    "metadata lookup timed out after {}s",
                    self.settings.probe_timeout.as_secs()
                ))
            })?
            .map_err(|err| self.unavailable(err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<String> = stderr.lines().map(str::to_owned).collect();
            return Err(EngineError::Probe(failure_message(&lines, output.status)));
        }
        parse_probe_output(&output.stdout)
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        observer: &dyn TransferObserver,
    ) -> Result<DownloadReport, EngineError> {
        let args = download_args(&self.settings, request);
        engine_debug!("{} {}", self.settings.program.display(), args.join(" "));

        let mut child = self
            .command()
            .args(&args)
            .spawn()
            .map_err(|err| self.unavailable(err))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Download("stdout pipe missing".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Download("stderr pipe missing".to_string()))?;

        // Quiet mode moves progress to stderr, so both streams are parsed alike.
        let (from_stdout, from_stderr) =
            tokio::join!(pump(stdout, observer), pump(stderr, observer));
        let status = child
            .wait()
            .await
            .map_err(|err| EngineError::Download(format!("waiting for yt-dlp failed: {err}")))?;

        let mut report = DownloadReport {
            files: from_stdout.files,
            member_errors: from_stdout.errors,
        };
        report.files.extend(from_stderr.files);
        report.member_errors.extend(from_stderr.errors);

        if status.success() {
            return Ok(report);
        }
        // With --ignore-errors a collection exits non-zero when any member failed.
        if request.playlist == PlaylistScope::Expand && !report.files.is_empty() {
            return Ok(report);
        }

        let mut lines = report.member_errors;
        if lines.is_empty() {
            lines = from_stderr.other_lines;
        }
        Err(classify_failure(failure_message(&lines, status)))
    }
}

#[derive(Debug, Default)]
struct StreamSummary {
    files: Vec<PathBuf>,
    errors: Vec<String>,
    other_lines: Vec<String>,
}

async fn pump<R>(reader: R, observer: &dyn TransferObserver) -> StreamSummary
where
    R: AsyncRead + Unpin,
{
    let mut summary = StreamSummary::default();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                engine_debug!("yt-dlp output read failed: {}", err);
                break;
            }
        }
        // Titles may arrive in a legacy code page; never stop reading on them.
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        match parse_output_line(&line) {
            OutputLine::Transfer(update) => observer.on_transfer(update),
            OutputLine::Saved(path) => summary.files.push(path),
            OutputLine::Error(message) => summary.errors.push(message),
            OutputLine::Other => {
                engine_trace!("yt-dlp: {}", line);
                if !line.trim().is_empty() {
                    summary.other_lines.push(line);
                }
            }
        }
    }
    summary
}

pub(crate) fn probe_args(url: &str, socket_timeout: Duration) -> Vec<String> {
    vec![
        "-J".to_string(),
        "--flat-playlist".to_string(),
        "--skip-download".to_string(),
        "--no-warnings".to_string(),
        "--encoding".to_string(),
        "utf-8".to_string(),
        "--socket-timeout".to_string(),
        socket_timeout.as_secs().max(1).to_string(),
        "-o".to_string(),
        "%(title)s.%(ext)s".to_string(),
        "--".to_string(),
        url.to_string(),
    ]
}

pub(crate) fn download_args(settings: &YtDlpSettings, request: &DownloadRequest) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        settings.format_selector.clone(),
        "-x".to_string(),
        "--audio-format".to_string(),
        request.format.codec().to_string(),
        "--audio-quality".to_string(),
        format!("{}K", request.quality.kbps()),
        "-P".to_string(),
        request.output_dir.to_string_lossy().into_owned(),
        "-o".to_string(),
        request.naming.template().to_string(),
        "--retries".to_string(),
        request.retries.to_string(),
        "--socket-timeout".to_string(),
        request.socket_timeout.as_secs().max(1).to_string(),
        "--ignore-errors".to_string(),
        "--encoding".to_string(),
        "utf-8".to_string(),
        "--newline".to_string(),
        "--progress".to_string(),
        "--progress-template".to_string(),
        format!(
            "download:{PROGRESS_MARKER} %(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress.filename)s"
        ),
        "--print".to_string(),
        format!("after_move:{FILE_MARKER} %(filepath)s"),
    ];

    match request.playlist {
        PlaylistScope::Expand => {}
        PlaylistScope::Single => args.push("--no-playlist".to_string()),
        PlaylistScope::FirstEntry => {
            args.push("--no-playlist".to_string());
            args.push("--playlist-items".to_string());
            args.push("1".to_string());
        }
    }

    if request.skip_existing {
        args.push("--no-overwrites".to_string());
        args.push("--no-post-overwrites".to_string());
    } else {
        args.push("--force-overwrites".to_string());
    }

    args.push("--".to_string());
    args.push(request.url.clone());
    args
}

pub(crate) fn parse_probe_output(stdout: &[u8]) -> Result<MediaDescriptor, EngineError> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|err| EngineError::Probe(format!("unreadable metadata: {err}")))?;

    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let is_playlist = value.get("_type").and_then(Value::as_str) == Some("playlist")
        || value.get("entries").is_some();
    if is_playlist {
        let entry_count = value
            .get("entries")
            .and_then(Value::as_array)
            .map(Vec::len)
            .or_else(|| {
                value
                    .get("playlist_count")
                    .and_then(Value::as_u64)
                    .map(|count| count as usize)
            })
            .unwrap_or(0);
        return Ok(MediaDescriptor::Collection {
            title: title.unwrap_or_else(|| "Unknown Playlist".to_string()),
            entry_count,
        });
    }

    let file_stem = value
        .get("_filename")
        .or_else(|| value.get("filename"))
        .and_then(Value::as_str)
        .and_then(|name| Path::new(name).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned());
    Ok(MediaDescriptor::Single {
        title: title.unwrap_or_else(|| "Unknown Video".to_string()),
        file_stem,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputLine {
    Transfer(TransferUpdate),
    Saved(PathBuf),
    Error(String),
    Other,
}

pub(crate) fn parse_output_line(line: &str) -> OutputLine {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        return parse_progress(rest.trim()).unwrap_or(OutputLine::Other);
    }
    if let Some(path) = line.strip_prefix(FILE_MARKER) {
        let path = path.trim();
        if !path.is_empty() {
            return OutputLine::Saved(PathBuf::from(path));
        }
        return OutputLine::Other;
    }
    if let Some(message) = line.strip_prefix("ERROR:") {
        return OutputLine::Error(message.trim().to_string());
    }
    OutputLine::Other
}

fn parse_progress(fields: &str) -> Option<OutputLine> {
    let mut parts = fields.splitn(4, '|');
    let status = parts.next()?.trim();
    let percent = parts.next()?.trim();
    let speed = parts.next()?.trim();
    let filename = display_name(parts.next()?.trim());

    match status {
        "downloading" => Some(OutputLine::Transfer(TransferUpdate::Downloading {
            filename,
            percent: percent.to_string(),
            speed: speed.to_string(),
        })),
        "finished" => Some(OutputLine::Transfer(TransferUpdate::Finished { filename })),
        _ => None,
    }
}

fn display_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn failure_message(lines: &[String], status: ExitStatus) -> String {
    lines
        .iter()
        .rev()
        .map(|line| line.trim())
        .map(|line| line.strip_prefix("ERROR:").unwrap_or(line).trim())
        .find(|line| !line.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"))
}

fn classify_failure(message: String) -> EngineError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("postprocessing")
        || lower.contains("ffmpeg")
        || lower.contains("ffprobe")
        || lower.contains("audio conversion failed")
    {
        EngineError::Transcode(message)
    } else {
        EngineError::Download(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioFormat, OutputNaming, Quality};
    use pretty_assertions::assert_eq;

    fn request(playlist: PlaylistScope, skip_existing: bool) -> DownloadRequest {
        DownloadRequest {
            url: "https://video.example/watch?v=1".to_string(),
            output_dir: PathBuf::from("music"),
            format: AudioFormat::Ogg,
            quality: Quality::Kbps320,
            retries: 5,
            playlist,
            naming: OutputNaming::Title,
            skip_existing,
            socket_timeout: Duration::from_secs(30),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|pos| args.get(pos + 1))
            .map(String::as_str)
    }

    #[test]
    fn download_args_carry_job_settings() {
        let args = download_args(&YtDlpSettings::default(), &request(PlaylistScope::Expand, true));
        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
        assert_eq!(value_after(&args, "--audio-format"), Some("vorbis"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("320K"));
        assert_eq!(value_after(&args, "-P"), Some("music"));
        assert_eq!(value_after(&args, "-o"), Some("%(title)s.%(ext)s"));
        assert_eq!(value_after(&args, "--retries"), Some("5"));
        assert_eq!(value_after(&args, "--socket-timeout"), Some("30"));
        assert!(args.contains(&"--ignore-errors".to_string()));
        assert_eq!(value_after(&args, "--encoding"), Some("utf-8"));
        assert!(args.contains(&"--no-overwrites".to_string()));
        assert!(!args.contains(&"--no-playlist".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "https://video.example/watch?v=1"]);
    }

    #[test]
    fn first_entry_scope_limits_playlist() {
        let args = download_args(
            &YtDlpSettings::default(),
            &request(PlaylistScope::FirstEntry, false),
        );
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(value_after(&args, "--playlist-items"), Some("1"));
        assert!(args.contains(&"--force-overwrites".to_string()));
    }

    #[test]
    fn single_scope_only_disables_playlist() {
        let args = download_args(&YtDlpSettings::default(), &request(PlaylistScope::Single, true));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(!args.contains(&"--playlist-items".to_string()));
    }

    #[test]
    fn probe_args_are_metadata_only() {
        let args = probe_args("https://video.example/list", Duration::from_secs(0));
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert_eq!(value_after(&args, "--socket-timeout"), Some("1"));
        assert_eq!(value_after(&args, "--encoding"), Some("utf-8"));
        assert_eq!(args.last().map(String::as_str), Some("https://video.example/list"));
    }

    #[test]
    fn playlist_probe_counts_entries() {
        let json = br#"{"_type":"playlist","title":"Road trip","entries":[{"id":"a"},{"id":"b"},{"id":"c"}]}"#;
        assert_eq!(
            parse_probe_output(json).unwrap(),
            MediaDescriptor::Collection {
                title: "Road trip".to_string(),
                entry_count: 3,
            }
        );
    }

    #[test]
    fn single_probe_keeps_engine_file_stem() {
        let json = br#"{"_type":"video","title":"Song: Live","_filename":"Song\uff1a Live.webm"}"#;
        assert_eq!(
            parse_probe_output(json).unwrap(),
            MediaDescriptor::Single {
                title: "Song: Live".to_string(),
                file_stem: Some("Song\u{ff1a} Live".to_string()),
            }
        );
    }

    #[test]
    fn garbage_probe_output_is_a_probe_error() {
        let err = parse_probe_output(b"not json").unwrap_err();
        assert!(matches!(err, EngineError::Probe(_)));
    }

    #[test]
    fn progress_lines_become_transfer_updates() {
        let line = "[audiograb:progress] downloading| 42.0%|1.20MiB/s|/tmp/music/Song.webm";
        assert_eq!(
            parse_output_line(line),
            OutputLine::Transfer(TransferUpdate::Downloading {
                filename: "Song.webm".to_string(),
                percent: "42.0%".to_string(),
                speed: "1.20MiB/s".to_string(),
            })
        );
        assert_eq!(
            parse_output_line("[audiograb:progress] finished|100%|NA|Song.webm"),
            OutputLine::Transfer(TransferUpdate::Finished {
                filename: "Song.webm".to_string(),
            })
        );
    }

    #[test]
    fn saved_and_error_lines_are_recognised() {
        assert_eq!(
            parse_output_line("[audiograb:file] /tmp/music/Song.mp3"),
            OutputLine::Saved(PathBuf::from("/tmp/music/Song.mp3"))
        );
        assert_eq!(
            parse_output_line("ERROR: [youtube] abc: Video unavailable"),
            OutputLine::Error("[youtube] abc: Video unavailable".to_string())
        );
        assert_eq!(parse_output_line("[youtube] Extracting URL"), OutputLine::Other);
    }

    #[test]
    fn postprocessing_failures_are_transcode_errors() {
        assert!(matches!(
            classify_failure("Postprocessing: ffprobe and ffmpeg not found".to_string()),
            EngineError::Transcode(_)
        ));
        assert!(matches!(
            classify_failure("[youtube] abc: Video unavailable".to_string()),
            EngineError::Download(_)
        ));
    }
}
