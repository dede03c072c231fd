//! `run_pipeline`: the pure function at the center of the audio pipeline
//! (spec §4.4). Load → resample → optionally denoise → VAD → chunk.

use super::{chunk::collect_chunks, config::AudioPipelineConfig, denoise, resample, vad, wav};
use anyhow::Result;

/// Run the full audio pipeline over a WAV file on disk. Returns the chunk
/// sample arrays and a parallel `(offset, duration)` list in seconds.
pub fn run_pipeline(
    wav_path: &str,
    cfg: &AudioPipelineConfig,
) -> Result<(Vec<Vec<f32>>, Vec<(f64, f64)>)> {
    let (mut samples, source_rate) = wav::load_wav_mono_f32(wav_path)?;
    if samples.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    if source_rate != cfg.target_sample_rate {
        samples = resample::resample_linear(&samples, source_rate, cfg.target_sample_rate);
    }

    if cfg.enable_denoise {
        denoise::denoise(&mut samples, &cfg.denoise_backend);
    }

    let segments = vad::detect_speech(&samples, cfg.target_sample_rate, &cfg.vad);
    if segments.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    Ok(collect_chunks(
        &samples,
        cfg.target_sample_rate,
        &segments,
        cfg.vad.max_speech_duration_s,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VadConfig;

    fn write_wav(path: &std::path::Path, sample_rate: u32, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn silence_produces_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(&path, 16_000, &vec![0.0; 16_000 * 2]);
        let cfg = AudioPipelineConfig::default();
        let (chunks, meta) = run_pipeline(path.to_str().unwrap(), &cfg).unwrap();
        assert!(chunks.is_empty());
        assert!(meta.is_empty());
    }

    #[test]
    fn speech_tone_produces_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        let sr = 16_000u32;
        let mut samples = vec![0.0f32; sr as usize];
        samples.extend(vec![0.8f32; sr as usize]);
        samples.extend(vec![0.0f32; sr as usize]);
        write_wav(&path, sr, &samples);

        let cfg = AudioPipelineConfig {
            target_sample_rate: sr,
            enable_denoise: false,
            denoise_backend: "none".to_string(),
            vad: VadConfig {
                threshold: 0.3,
                min_silence_duration_ms: 100,
                speech_pad_ms: 0,
                max_speech_duration_s: 30.0,
            },
        };
        let (chunks, meta) = run_pipeline(path.to_str().unwrap(), &cfg).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(meta.len(), 1);
        assert!((meta[0].0 - 1.0).abs() < 0.05);
    }

    #[test]
    fn resamples_when_source_rate_differs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech8k.wav");
        let sr = 8_000u32;
        let mut samples = vec![0.0f32; sr as usize];
        samples.extend(vec![0.8f32; sr as usize]);
        samples.extend(vec![0.0f32; sr as usize]);
        write_wav(&path, sr, &samples);

        let cfg = AudioPipelineConfig {
            target_sample_rate: 16_000,
            vad: VadConfig {
                threshold: 0.3,
                min_silence_duration_ms: 100,
                speech_pad_ms: 0,
                max_speech_duration_s: 30.0,
            },
            ..AudioPipelineConfig::default()
        };
        let (chunks, _meta) = run_pipeline(path.to_str().unwrap(), &cfg).unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
