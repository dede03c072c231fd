//! `yt-dlp` subprocess adapter: `Downloader` and `ChannelService`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use vodq_core::capabilities::{ChannelService, DownloadMetadata, Downloader, ProgressCb, ResolvedChannel};
use vodq_core::error::{DownloadError, DownloadErrorKind};

pub struct YtDlpDownloader {
    storage_dir: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self { storage_dir }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        url: &str,
        format_hint: Option<&str>,
        progress_cb: &ProgressCb<'_>,
    ) -> Result<DownloadMetadata, DownloadError> {
        let format = format_hint.unwrap_or("bestvideo*+bestaudio/best");
        let outtmpl = self.storage_dir.join("%(id)s.%(ext)s");

        let mut child = Command::new("yt-dlp")
            .arg("-f")
            .arg(format)
            .arg("--no-playlist")
            .arg("--print-json")
            .arg("--newline")
            .arg("-o")
            .arg(&outtmpl)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DownloadError::new(DownloadErrorKind::Other, format!("failed to spawn yt-dlp: {e}")))?;

        // yt-dlp writes the final `--print-json` line to stdout and progress
        // to stderr; drain stdout on its own task so it doesn't back up the
        // pipe while we read progress lines from stderr in this future.
        let mut stdout = child.stdout.take().expect("piped stdout");
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });

        let stderr = child.stderr.take().expect("piped stderr");
        let mut stderr_lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = stderr_lines.next_line().await {
            if let Some(pct) = parse_progress_percent(&line) {
                progress_cb(pct);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::new(DownloadErrorKind::Other, format!("yt-dlp wait failed: {e}")))?;
        let stdout_bytes = stdout_task.await.unwrap_or_default();

        if !status.success() {
            let tail = String::from_utf8_lossy(&stdout_bytes);
            return Err(classify_ytdlp_failure(&tail));
        }

        parse_ytdlp_json(&stdout_bytes)
            .ok_or_else(|| DownloadError::new(DownloadErrorKind::Other, "could not parse yt-dlp JSON output"))
    }
}

/// yt-dlp's `--newline` progress lines look like `[download]  42.3% of ...`.
fn parse_progress_percent(line: &str) -> Option<f64> {
    let line = line.trim();
    if !line.starts_with("[download]") {
        return None;
    }
    let pct_str = line.split_whitespace().find(|tok| tok.ends_with('%'))?;
    let pct_str = pct_str.trim_end_matches('%');
    pct_str.parse::<f64>().ok().map(|p| (p / 100.0).clamp(0.0, 1.0))
}

fn classify_ytdlp_failure(output: &str) -> DownloadError {
    let haystack = output.to_lowercase();
    let kind = if haystack.contains("confirm you're not a bot") || haystack.contains("sign in to confirm") {
        DownloadErrorKind::Blocked
    } else if haystack.contains("requested format is not available") {
        DownloadErrorKind::FormatUnavailable
    } else if haystack.contains("live event will begin") || haystack.contains("premieres in") {
        DownloadErrorKind::LiveStream
    } else if haystack.contains("timed out") || haystack.contains("connection reset") || haystack.contains("temporary failure") {
        DownloadErrorKind::Retryable
    } else {
        DownloadErrorKind::Other
    };
    DownloadError::new(kind, output.lines().last().unwrap_or(output).trim().to_string())
}

fn parse_ytdlp_json(bytes: &[u8]) -> Option<DownloadMetadata> {
    // `--print-json` may be interleaved with nothing else on stdout, but be
    // defensive and take the last JSON-looking line.
    let text = std::str::from_utf8(bytes).ok()?;
    let line = text.lines().rev().find(|l| l.trim_start().starts_with('{'))?;
    let v: serde_json::Value = serde_json::from_str(line).ok()?;

    let file_path = v
        .get("requested_downloads")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("filepath"))
        .and_then(|p| p.as_str())
        .or_else(|| v.get("_filename").and_then(|p| p.as_str()))
        .unwrap_or_default()
        .to_string();

    Some(DownloadMetadata {
        id: v.get("id").and_then(|s| s.as_str()).unwrap_or_default().to_string(),
        title: v.get("title").and_then(|s| s.as_str()).unwrap_or_default().to_string(),
        duration: v.get("duration").and_then(|d| d.as_f64()),
        file_path,
        thumbnail: v.get("thumbnail").and_then(|s| s.as_str()).map(str::to_string),
        description: v.get("description").and_then(|s| s.as_str()).map(str::to_string),
        upload_date: v.get("upload_date").and_then(|s| s.as_str()).map(str::to_string),
        channel_id: v.get("channel_id").and_then(|s| s.as_str()).map(str::to_string),
        channel: v.get("channel").and_then(|s| s.as_str()).map(str::to_string),
        uploader_id: v.get("uploader_id").and_then(|s| s.as_str()).map(str::to_string),
        uploader: v.get("uploader").and_then(|s| s.as_str()).map(str::to_string),
        view_count: v.get("view_count").and_then(|n| n.as_i64()),
        like_count: v.get("like_count").and_then(|n| n.as_i64()),
        subtitle_text: None,
    })
}

pub struct YtDlpChannelService;

#[async_trait]
impl ChannelService for YtDlpChannelService {
    async fn resolve_channel(&self, url: &str) -> anyhow::Result<ResolvedChannel> {
        let output = Command::new("yt-dlp")
            .arg("--flat-playlist")
            .arg("--playlist-items")
            .arg("1")
            .arg("--print")
            .arg("%(channel_id)s\t%(channel)s")
            .arg(url)
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp channel resolution failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        let line = String::from_utf8_lossy(&output.stdout);
        let mut parts = line.lines().next().unwrap_or_default().splitn(2, '\t');
        let channel_id = parts.next().filter(|s| !s.is_empty() && *s != "NA").map(str::to_string);
        let channel_title = parts.next().filter(|s| !s.is_empty() && *s != "NA").map(str::to_string);
        Ok(ResolvedChannel { channel_id, channel_title })
    }

    async fn fetch_latest_video_urls(&self, url: &str, max: usize) -> anyhow::Result<Vec<String>> {
        let output = Command::new("yt-dlp")
            .arg("--flat-playlist")
            .arg("--playlist-end")
            .arg(max.max(1).to_string())
            .arg("--print")
            .arg("%(webpage_url)s")
            .arg(url)
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp channel listing failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_progress_percentage() {
        assert_eq!(parse_progress_percent("[download]  42.3% of 10.00MiB at 1.00MiB/s"), Some(0.423));
        assert_eq!(parse_progress_percent("[info] writing metadata"), None);
    }

    #[test]
    fn classifies_bot_check_as_blocked() {
        let err = classify_ytdlp_failure("ERROR: Sign in to confirm you're not a bot");
        assert_eq!(err.kind, DownloadErrorKind::Blocked);
    }

    #[test]
    fn classifies_format_unavailable() {
        let err = classify_ytdlp_failure("ERROR: Requested format is not available");
        assert_eq!(err.kind, DownloadErrorKind::FormatUnavailable);
    }

    #[test]
    fn parses_minimal_json_metadata() {
        let json = r#"{"id":"ABCDEFGHIJK","title":"hello","duration":12.5,"requested_downloads":[{"filepath":"/tmp/x.mp4"}]}"#;
        let meta = parse_ytdlp_json(json.as_bytes()).unwrap();
        assert_eq!(meta.id, "ABCDEFGHIJK");
        assert_eq!(meta.file_path, "/tmp/x.mp4");
        assert_eq!(meta.duration, Some(12.5));
    }
}
