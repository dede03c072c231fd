//! Slice detected speech segments into audio chunks, splitting any segment
//! longer than `max_speech_duration_s` (spec §4.4).

use super::vad::SpeechSegment;

/// Slice `samples` according to `segments`, splitting any segment whose
/// duration exceeds `max_speech_duration_s` into consecutive sub-chunks.
/// Returns the chunk sample arrays and a parallel `(offset, duration)` list
/// in seconds, chunk start relative to the original audio.
pub fn collect_chunks(
    samples: &[f32],
    sample_rate: u32,
    segments: &[SpeechSegment],
    max_speech_duration_s: f32,
) -> (Vec<Vec<f32>>, Vec<(f64, f64)>) {
    if samples.is_empty() || segments.is_empty() || sample_rate == 0 {
        return (Vec::new(), Vec::new());
    }

    let max_duration = max_speech_duration_s.max(0.1) as f64;
    let mut chunks = Vec::new();
    let mut meta = Vec::new();

    for segment in segments {
        let mut cursor = segment.start_s;
        while cursor < segment.end_s {
            let end = (cursor + max_duration).min(segment.end_s);
            let start_idx = (cursor * sample_rate as f64).round() as usize;
            let end_idx = ((end * sample_rate as f64).round() as usize).min(samples.len());
            if end_idx > start_idx {
                chunks.push(samples[start_idx..end_idx].to_vec());
                meta.push((cursor, end - cursor));
            }
            cursor = end;
        }
    }

    (chunks, meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_segments_yield_no_chunks() {
        let (chunks, meta) = collect_chunks(&[0.0; 100], 16_000, &[], 30.0);
        assert!(chunks.is_empty());
        assert!(meta.is_empty());
    }

    #[test]
    fn single_short_segment_is_one_chunk() {
        let sr = 16_000u32;
        let samples = vec![0.5f32; sr as usize * 2];
        let segments = vec![SpeechSegment {
            start_s: 0.0,
            end_s: 2.0,
        }];
        let (chunks, meta) = collect_chunks(&samples, sr, &segments, 30.0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0], (0.0, 2.0));
        assert_eq!(chunks[0].len(), sr as usize * 2);
    }

    #[test]
    fn long_segment_is_split_at_max_duration() {
        let sr = 16_000u32;
        let samples = vec![0.5f32; sr as usize * 70];
        let segments = vec![SpeechSegment {
            start_s: 0.0,
            end_s: 70.0,
        }];
        let (chunks, meta) = collect_chunks(&samples, sr, &segments, 30.0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(meta[0], (0.0, 30.0));
        assert_eq!(meta[1], (30.0, 30.0));
        assert!((meta[2].1 - 10.0).abs() < 1e-6);
        let total: f64 = meta.iter().map(|(_, d)| d).sum();
        assert!((total - 70.0).abs() < 1e-6);
    }

    #[test]
    fn chunk_offsets_respect_segment_start() {
        let sr = 16_000u32;
        let samples = vec![0.5f32; sr as usize * 100];
        let segments = vec![SpeechSegment {
            start_s: 50.0,
            end_s: 55.0,
        }];
        let (_, meta) = collect_chunks(&samples, sr, &segments, 30.0);
        assert_eq!(meta[0].0, 50.0);
    }
}
