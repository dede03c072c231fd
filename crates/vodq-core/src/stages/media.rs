//! On-disk layout for per-item artifacts (spec §6 "Persistent state layout").

use std::path::{Path, PathBuf};

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];

/// `<video_id>.mp4|.webm|.mkv`, whichever already exists. Used by the
/// download stage to decide whether to fast-forward past re-downloading
/// (spec §4.3, §3 invariant 3: "`downloaded_at` is set iff a media file
/// exists on local storage for the item's `source_video_id`").
pub fn find_existing_media(storage_dir: &Path, video_id: &str) -> Option<PathBuf> {
    MEDIA_EXTENSIONS.iter().map(|ext| storage_dir.join(format!("{video_id}.{ext}"))).find(|p| p.exists())
}

pub fn audio_path(storage_dir: &Path, video_id: &str) -> PathBuf {
    storage_dir.join(format!("{video_id}.wav"))
}

pub fn transcript_path(storage_dir: &Path, video_id: &str) -> PathBuf {
    storage_dir.join(format!("{video_id}.txt"))
}

pub fn segments_path(storage_dir: &Path, video_id: &str) -> PathBuf {
    storage_dir.join(format!("{video_id}_segments.json"))
}

pub fn thumbnail_path(storage_dir: &Path, video_id: &str) -> PathBuf {
    storage_dir.join("thumbnails").join(format!("{video_id}.jpg"))
}

/// The sentinel transcript text meaning "no usable transcript" — treated as
/// absent by every downstream consumer (GLOSSARY).
pub const SENTINEL_PREFIX: &str = "Transcription unavailable";

pub fn is_sentinel_transcript(text: &str) -> bool {
    text.trim_start().starts_with(SENTINEL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_existing_media_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ABCDEFGHIJK.webm"), b"x").unwrap();
        let found = find_existing_media(dir.path(), "ABCDEFGHIJK");
        assert_eq!(found, Some(dir.path().join("ABCDEFGHIJK.webm")));
    }

    #[test]
    fn no_media_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_existing_media(dir.path(), "ABCDEFGHIJK").is_none());
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_sentinel_transcript("Transcription unavailable (runner failed or timeout)"));
        assert!(!is_sentinel_transcript("hello world"));
    }
}
