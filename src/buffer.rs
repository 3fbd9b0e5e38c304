//! Decoded sample buffers handed to the core by the ingestion boundary.

/// A decoded, mono sample buffer.
///
/// Buffers are immutable once decoded; sources share them through an
/// `Arc` so that every rebuilt playback object reads the same samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a buffer from mono samples at the given rate.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    /// A buffer of `seconds` of silence.
    pub fn silence(seconds: f64, sample_rate: u32) -> Self {
        let frames = (seconds * sample_rate as f64).round().max(0.0) as usize;
        Self::new(vec![0.0; frames], sample_rate)
    }

    /// The samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample at `seconds` into the buffer, wrapping when `looping`.
    ///
    /// Returns 0.0 past the end of a non-looping buffer.
    pub fn sample_at(&self, seconds: f64, looping: bool) -> f32 {
        if self.samples.is_empty() || seconds < 0.0 {
            return 0.0;
        }
        let mut index = (seconds * self.sample_rate as f64) as usize;
        if looping {
            index %= self.samples.len();
        }
        self.samples.get(index).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_frames() {
        let buffer = SampleBuffer::new(vec![0.0; 480], 48);
        assert_eq!(buffer.duration(), 10.0);
        assert_eq!(buffer.frames(), 480);
    }

    #[test]
    fn sample_at_wraps_only_when_looping() {
        let buffer = SampleBuffer::new(vec![1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(buffer.sample_at(0.5, false), 3.0);
        assert_eq!(buffer.sample_at(1.25, false), 0.0);
        assert_eq!(buffer.sample_at(1.25, true), 2.0);
    }

    #[test]
    fn zero_rate_is_clamped() {
        let buffer = SampleBuffer::new(vec![0.0; 4], 0);
        assert_eq!(buffer.sample_rate(), 1);
    }
}
