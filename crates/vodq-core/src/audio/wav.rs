//! WAV decode: load a file into mono float32 samples plus its sample rate.

use anyhow::{Context, Result};

/// Load a WAV file and coerce it to mono float32 in `[-1.0, 1.0]`.
/// Multi-channel input is averaged down to one channel.
pub fn load_wav_mono_f32(path: &str) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("open wav file: {path}"))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .context("decode float wav samples")?,
        hound::SampleFormat::Int => {
            let max_amplitude = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_amplitude))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .context("decode integer wav samples")?
        }
    };

    if channels <= 1 {
        return Ok((samples, spec.sample_rate));
    }

    let mono: Vec<f32> = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Duration in seconds of a WAV file, without fully decoding it
/// (spec §6 `probe_duration`).
pub fn probe_wav_duration(path: &str) -> Option<f64> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &std::path::Path, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_mono_int16_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_test_wav(&path, 16_000, &[0, i16::MAX / 2, i16::MIN / 2]);
        let (samples, rate) = load_wav_mono_f32(path.to_str().unwrap()).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(samples.len(), 3);
        assert!((samples[0]).abs() < 1e-6);
        assert!(samples[1] > 0.0 && samples[1] < 1.0);
        assert!(samples[2] < 0.0 && samples[2] > -1.0);
    }

    #[test]
    fn probes_duration_without_full_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        let samples = vec![0i16; 16_000 * 2];
        write_test_wav(&path, 16_000, &samples);
        let duration = probe_wav_duration(path.to_str().unwrap()).unwrap();
        assert!((duration - 2.0).abs() < 1e-6);
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_wav_mono_f32("/nonexistent/path.wav").is_err());
    }
}
