//! Audio level helpers
//!
//! Monitors never see raw audio; they consume per-frame loudness values.

use serde::{Deserialize, Serialize};

/// Loudness of one captured audio frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelFrame {
    /// Normalized RMS energy (0.0 - 1.0)
    pub rms: f32,
    /// Duration of audio this frame covers (ms)
    pub duration_ms: u32,
}

impl LevelFrame {
    pub fn new(rms: f32, duration_ms: u32) -> Self {
        Self {
            rms: normalize_level(rms),
            duration_ms,
        }
    }

    /// Build a frame from PCM samples
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        let duration_ms = if sample_rate == 0 {
            0
        } else {
            (samples.len() as u64 * 1000 / sample_rate as u64) as u32
        };
        Self::new(rms_energy(samples), duration_ms)
    }
}

/// RMS energy of audio samples
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Clamp a level into 0.0 - 1.0, mapping NaN to silence
pub fn normalize_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_energy() {
        let silence = vec![0.0f32; 100];
        assert!(rms_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(rms_energy(&loud) > 0.4);

        assert_eq!(rms_energy(&[]), 0.0);
    }

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(f32::NAN), 0.0);
        assert_eq!(normalize_level(-0.3), 0.0);
        assert_eq!(normalize_level(1.7), 1.0);
        assert_eq!(normalize_level(0.25), 0.25);
    }

    #[test]
    fn test_frame_from_samples() {
        // 20ms at 16kHz
        let frame = LevelFrame::from_samples(&vec![0.5f32; 320], 16_000);
        assert_eq!(frame.duration_ms, 20);
        assert!(frame.rms > 0.4);
    }
}
