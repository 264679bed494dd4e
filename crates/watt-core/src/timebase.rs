//! Musical time to device time conversion.

/// Convert a musical position to an absolute timestamp in milliseconds.
///
/// `beat` may be fractional to support sub-beat sweeps. The result is
/// `round((beats_per_measure * bar + beat) * 60000 / bpm)`.
///
/// `bpm` must be positive; callers clamp tempo adjustments (minimum 10)
/// before this is reached, so no validation happens here.
pub fn beat_to_timestamp(bpm: u32, beats_per_measure: u32, bar: u32, beat: f64) -> u64 {
    let ms_per_beat = 60_000.0 / bpm as f64;
    ((beats_per_measure as f64 * bar as f64 + beat) * ms_per_beat).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_bars_at_120() {
        // 4 beats/measure x 2 measures x 500 ms/beat
        assert_eq!(beat_to_timestamp(120, 4, 2, 0.0), 4000);
    }

    #[test]
    fn test_linear_in_beat() {
        let base = beat_to_timestamp(120, 4, 0, 0.0);
        let step = beat_to_timestamp(120, 4, 0, 1.0) - base;
        for n in 2..8 {
            assert_eq!(
                beat_to_timestamp(120, 4, 0, n as f64),
                base + n * step,
                "beat {n} not linear"
            );
        }
    }

    #[test]
    fn test_linear_in_bar() {
        let bar = beat_to_timestamp(90, 3, 1, 0.0);
        for n in 2..6 {
            assert_eq!(beat_to_timestamp(90, 3, n, 0.0), bar * n as u64);
        }
    }

    #[test]
    fn test_fractional_beat() {
        // At 120 bpm a beat is 500 ms, so an eighth of a beat is 62.5 ms
        assert_eq!(beat_to_timestamp(120, 4, 0, 0.125), 63);
        assert_eq!(beat_to_timestamp(120, 4, 0, 0.5), 250);
    }
}
