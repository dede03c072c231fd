//! `ffmpeg` subprocess adapter: `AudioConverter` and `ThumbnailGenerator`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use vodq_core::capabilities::{AudioConverter, ThumbnailGenerator};

pub struct FfmpegConverter {
    pub target_sample_rate: u32,
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn convert_to_audio(&self, video_path: &str) -> anyhow::Result<String> {
        let wav_path = sibling_with_extension(video_path, "wav");
        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-ac")
            .arg("1")
            .arg("-ar")
            .arg(self.target_sample_rate.to_string())
            .arg(&wav_path)
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!("ffmpeg audio extraction failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(wav_path.to_string_lossy().into_owned())
    }
}

pub struct FfmpegThumbnailGenerator {
    pub thumbnails_dir: PathBuf,
}

#[async_trait]
impl ThumbnailGenerator for FfmpegThumbnailGenerator {
    async fn generate_thumbnail(&self, video_path: &str, video_id: &str) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.thumbnails_dir).await?;
        let out_path = self.thumbnails_dir.join(format!("{video_id}.jpg"));
        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-ss")
            .arg("00:00:01")
            .arg("-i")
            .arg(video_path)
            .arg("-frames:v")
            .arg("1")
            .arg(&out_path)
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!("ffmpeg thumbnail extraction failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(out_path.to_string_lossy().into_owned())
    }
}

fn sibling_with_extension(path: &str, ext: &str) -> PathBuf {
    let mut p = Path::new(path).to_path_buf();
    p.set_extension(ext);
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_extension_in_place() {
        assert_eq!(sibling_with_extension("/videos/ABCDEFGHIJK.mp4", "wav"), PathBuf::from("/videos/ABCDEFGHIJK.wav"));
    }
}
