//! `ffprobe` subprocess adapter: `Prober`.

use async_trait::async_trait;
use tokio::process::Command;
use vodq_core::capabilities::Prober;

pub struct FfprobeProber;

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe_duration(&self, wav_path: &str) -> Option<f64> {
        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("csv=p=0")
            .arg(wav_path)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse::<f64>().ok()
    }
}
