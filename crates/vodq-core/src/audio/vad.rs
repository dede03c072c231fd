//! Voice activity detection: classify fixed-size frames by mean amplitude
//! against a threshold, then merge adjacent speech runs, bridging short
//! silences and padding segment edges (spec §4.4's VAD knobs).

const FRAME_MS: f32 = 30.0;

/// One contiguous speech span, in seconds, within the original audio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSegment {
    pub start_s: f64,
    pub end_s: f64,
}

impl SpeechSegment {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Detect speech spans in `samples` (mono float32, `sample_rate` Hz) using
/// `cfg`. Returns an empty list for empty input or if no frame ever crosses
/// the threshold (spec §4.4: "Empty input or no detected speech ⇒ ([],[])").
pub fn detect_speech(
    samples: &[f32],
    sample_rate: u32,
    cfg: &super::VadConfig,
) -> Vec<SpeechSegment> {
    if samples.is_empty() || sample_rate == 0 {
        return Vec::new();
    }

    let frame_len = ((sample_rate as f32 * FRAME_MS / 1000.0) as usize).max(1);
    let frame_is_speech: Vec<bool> = samples
        .chunks(frame_len)
        .map(|frame| {
            let energy = frame.iter().map(|s| s.abs()).sum::<f32>() / frame.len() as f32;
            energy > cfg.threshold
        })
        .collect();

    // Collapse consecutive speech frames into raw (start_frame, end_frame) runs.
    let mut raw_runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &speech) in frame_is_speech.iter().enumerate() {
        match (speech, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                raw_runs.push((start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        raw_runs.push((start, frame_is_speech.len()));
    }
    if raw_runs.is_empty() {
        return Vec::new();
    }

    let frame_duration_s = frame_len as f64 / sample_rate as f64;
    let min_silence_frames =
        ((cfg.min_silence_duration_ms as f64 / 1000.0) / frame_duration_s).ceil() as usize;

    // Bridge runs separated by a silence shorter than min_silence_duration_ms.
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for run in raw_runs {
        match merged.last_mut() {
            Some(last) if run.0 - last.1 <= min_silence_frames => {
                last.1 = run.1;
            }
            _ => merged.push(run),
        }
    }

    let pad_frames = ((cfg.speech_pad_ms as f64 / 1000.0) / frame_duration_s).ceil() as usize;
    let total_frames = frame_is_speech.len();
    merged
        .into_iter()
        .map(|(start, end)| {
            let padded_start = start.saturating_sub(pad_frames);
            let padded_end = (end + pad_frames).min(total_frames);
            SpeechSegment {
                start_s: padded_start as f64 * frame_duration_s,
                end_s: padded_end as f64 * frame_duration_s,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VadConfig;

    fn tone(duration_s: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
        vec![amplitude; (duration_s * sample_rate as f32) as usize]
    }

    #[test]
    fn empty_input_yields_no_segments() {
        let cfg = VadConfig::default();
        assert!(detect_speech(&[], 16_000, &cfg).is_empty());
    }

    #[test]
    fn silence_yields_no_segments() {
        let cfg = VadConfig::default();
        let samples = vec![0.0f32; 16_000];
        assert!(detect_speech(&samples, 16_000, &cfg).is_empty());
    }

    #[test]
    fn loud_tone_surrounded_by_silence_is_detected() {
        let cfg = VadConfig {
            threshold: 0.3,
            min_silence_duration_ms: 100,
            speech_pad_ms: 0,
            max_speech_duration_s: 30.0,
        };
        let sr = 16_000;
        let mut samples = tone(1.0, sr, 0.0);
        samples.extend(tone(1.0, sr, 0.8));
        samples.extend(tone(1.0, sr, 0.0));
        let segments = detect_speech(&samples, sr, &cfg);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].start_s - 1.0).abs() < 0.05);
        assert!((segments[0].end_s - 2.0).abs() < 0.05);
    }

    #[test]
    fn short_gap_between_speech_runs_is_bridged() {
        let cfg = VadConfig {
            threshold: 0.3,
            min_silence_duration_ms: 500,
            speech_pad_ms: 0,
            max_speech_duration_s: 30.0,
        };
        let sr = 16_000;
        let mut samples = tone(1.0, sr, 0.8);
        samples.extend(tone(0.1, sr, 0.0)); // 100ms gap, shorter than 500ms
        samples.extend(tone(1.0, sr, 0.8));
        let segments = detect_speech(&samples, sr, &cfg);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn long_gap_between_speech_runs_stays_separate() {
        let cfg = VadConfig {
            threshold: 0.3,
            min_silence_duration_ms: 100,
            speech_pad_ms: 0,
            max_speech_duration_s: 30.0,
        };
        let sr = 16_000;
        let mut samples = tone(1.0, sr, 0.8);
        samples.extend(tone(1.0, sr, 0.0)); // 1s gap, longer than 100ms
        samples.extend(tone(1.0, sr, 0.8));
        let segments = detect_speech(&samples, sr, &cfg);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn padding_extends_segment_edges() {
        let cfg = VadConfig {
            threshold: 0.3,
            min_silence_duration_ms: 100,
            speech_pad_ms: 200,
            max_speech_duration_s: 30.0,
        };
        let sr = 16_000;
        let mut samples = tone(1.0, sr, 0.0);
        samples.extend(tone(1.0, sr, 0.8));
        samples.extend(tone(1.0, sr, 0.0));
        let segments = detect_speech(&samples, sr, &cfg);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].start_s < 1.0);
        assert!(segments[0].end_s > 2.0);
    }
}
