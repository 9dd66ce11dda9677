use std::fmt;

use crate::{AudioCanvasError, Result};

/// Decoded, immutable audio signal.
///
/// Decoding compressed formats is the host's job; the core only needs
/// planar sample data and the sample rate. Only channel 0 is ever analysed.
/// Buffers are shared by reference (`Arc<AudioBuffer>`) between the live
/// preview and any number of in-flight exports.
#[derive(Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Builds a buffer from planar channel data. All channels must have the
    /// same length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioCanvasError::InvalidInput(
                "audio buffer requires a non-zero sample rate",
            ));
        }

        let Some(first) = channels.first() else {
            return Err(AudioCanvasError::InvalidInput(
                "audio buffer requires at least one channel",
            ));
        };

        let frames = first.len();
        if channels.iter().any(|channel| channel.len() != frames) {
            return Err(AudioCanvasError::InvalidInput(
                "all channels of an audio buffer must have the same length",
            ));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Convenience constructor for single channel material.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, vec![samples])
    }

    /// Splits interleaved samples (`L R L R ...`) into planar channels.
    pub fn from_interleaved(sample_rate: u32, channels: usize, samples: &[f32]) -> Result<Self> {
        if channels == 0 {
            return Err(AudioCanvasError::InvalidInput(
                "audio buffer requires at least one channel",
            ));
        }

        let frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (channel, sample) in planar.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::new(sample_rate, planar)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Duration in microseconds, the unit export clips are timed in.
    pub fn duration_micros(&self) -> u64 {
        (self.duration() * 1e6).round() as u64
    }

    pub fn channel_data(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    /// Copies `size` consecutive channel-0 samples starting at the position
    /// matching `time_seconds` into `out`.
    ///
    /// When the window would run past either end of the buffer `out` is
    /// zero-filled instead; this never wraps and never fails.
    pub fn extract_window(&self, time_seconds: f64, out: &mut [f32]) {
        let size = out.len();
        let samples = &self.channels[0];
        let duration = self.duration();

        let start = if duration > 0.0 && time_seconds.is_finite() && time_seconds >= 0.0 {
            let percentage = time_seconds / duration;
            Some((samples.len() as f64 * percentage).floor() as usize)
        } else {
            None
        };

        match start {
            Some(start) if start.saturating_add(size) <= samples.len() => {
                out.copy_from_slice(&samples[start..start + size]);
            }
            _ => out.fill(0.0),
        }
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels.len())
            .field("frames", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    #[test]
    fn reports_duration_from_length_and_rate() {
        let buffer = AudioBuffer::mono(100, vec![0.0; 250]).unwrap();
        assert!((buffer.duration() - 2.5).abs() < 1e-9);
        assert_eq!(buffer.duration_micros(), 2_500_000);
    }

    #[test]
    fn extracts_window_at_time_offset() {
        let buffer = AudioBuffer::mono(10, ramp(20)).unwrap();
        let mut window = [0.0; 4];
        buffer.extract_window(1.0, &mut window);
        assert_eq!(window, [10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn window_past_the_end_is_silent() {
        let buffer = AudioBuffer::mono(10, ramp(20)).unwrap();
        let mut window = [1.0; 4];
        buffer.extract_window(1.9, &mut window);
        assert_eq!(window, [0.0; 4]);

        let mut window = [1.0; 4];
        buffer.extract_window(-0.5, &mut window);
        assert_eq!(window, [0.0; 4]);
    }

    #[test]
    fn deinterleaves_channels() {
        let buffer = AudioBuffer::from_interleaved(4, 2, &[1.0, -1.0, 2.0, -2.0]).unwrap();
        assert_eq!(buffer.number_of_channels(), 2);
        assert_eq!(buffer.channel_data(0).unwrap(), &[1.0, 2.0]);
        assert_eq!(buffer.channel_data(1).unwrap(), &[-1.0, -2.0]);
    }

    #[test]
    fn rejects_mismatched_channels() {
        let err = AudioBuffer::new(10, vec![vec![0.0; 3], vec![0.0; 2]]).unwrap_err();
        assert!(format!("{err}").contains("same length"));
    }
}
