use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{AudioBuffer, AudioCanvasError, Result};

pub mod shaper;

pub use shaper::{apply_shaper, shaper_names, ShaperFn, DEFAULT_SHAPER};

/// Upper bound of every magnitude frame handed to the builders.
pub const MAGNITUDE_CEILING: f32 = 255.0;

const MIN_TRANSFORM_SIZE: usize = 2;

/// Asymmetric blend factors for the temporal smoothing stage.
///
/// Rising bins move towards the new value by `up`, falling bins by `down`,
/// which gives the fast attack / slow release of a VU meter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smoothing {
    pub up: f32,
    pub down: f32,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            up: 0.2,
            down: 0.05,
        }
    }
}

impl Smoothing {
    /// Fails unless both factors lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let in_range = |factor: f32| (0.0..=1.0).contains(&factor);
        if in_range(self.up) && in_range(self.down) {
            Ok(())
        } else {
            Err(AudioCanvasError::InvalidInput(
                "smoothing factors must lie in [0, 1]",
            ))
        }
    }

    /// Blends `raw` into `previous` in place.
    ///
    /// A `previous` of a different length (first call, or a resized
    /// transform) is replaced by `raw` outright. Factors outside `[0, 1]`
    /// are clamped so a bin never moves past its new value.
    pub fn apply(&self, previous: &mut Vec<f32>, raw: &[f32]) {
        if previous.len() != raw.len() {
            previous.clear();
            previous.extend_from_slice(raw);
            return;
        }

        let (up, down) = (clamp_factor(self.up), clamp_factor(self.down));
        for (retained, &value) in previous.iter_mut().zip(raw) {
            let factor = if value < *retained { down } else { up };
            *retained = value * factor + *retained * (1.0 - factor);
        }
    }
}

/// NaN counts as "do not move".
fn clamp_factor(factor: f32) -> f32 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Turns windows of time-domain samples into smoothed, shaped and
/// normalised magnitude frames.
///
/// One analyser belongs to exactly one builder; the retained smoothing
/// state is never shared.
pub struct FrequencyAnalyzer {
    transform_size: usize,
    smoothing: Smoothing,
    previous_frame: Vec<f32>,
    fft_planner: RealFftPlanner<f32>,
    fft: FftResources,
}

impl FrequencyAnalyzer {
    /// Creates an analyser with the default smoothing factors.
    pub fn new(transform_size: usize) -> Self {
        Self::with_smoothing(transform_size, Smoothing::default())
    }

    pub fn with_smoothing(transform_size: usize, smoothing: Smoothing) -> Self {
        let transform_size = transform_size.max(MIN_TRANSFORM_SIZE);
        let mut fft_planner = RealFftPlanner::new();
        let fft = FftResources::plan(&mut fft_planner, transform_size);

        Self {
            transform_size,
            smoothing,
            previous_frame: Vec::new(),
            fft_planner,
            fft,
        }
    }

    /// Window length in samples.
    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    /// Length of every frame returned by [`FrequencyAnalyzer::analyze`].
    pub fn bin_count(&self) -> usize {
        self.transform_size / 2 + 1
    }

    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    /// Smoothed (pre-shaping) state retained from the previous call.
    pub fn previous_frame(&self) -> &[f32] {
        &self.previous_frame
    }

    /// Replaces the transform. Retained smoothing state is discarded, not
    /// resampled.
    pub fn update_transform_size(&mut self, transform_size: usize) {
        let transform_size = transform_size.max(MIN_TRANSFORM_SIZE);
        if transform_size != self.transform_size {
            self.fft = FftResources::plan(&mut self.fft_planner, transform_size);
            self.transform_size = transform_size;
        }
        self.previous_frame.clear();
    }

    /// Produces the magnitude frame for `time_seconds` of `buffer`.
    ///
    /// The result always holds [`FrequencyAnalyzer::bin_count`] values in
    /// `[0, 255]`. Silence, out-of-range times and transform failures yield
    /// a flat frame rather than an error.
    pub fn analyze(&mut self, buffer: &AudioBuffer, time_seconds: f64, shaper: &str) -> Vec<f32> {
        let raw = self.compute_frequency(buffer, time_seconds);
        self.smoothing.apply(&mut self.previous_frame, &raw);

        let shaped = apply_shaper(shaper, &self.previous_frame);
        normalize(&shaped, 0.0, MAGNITUDE_CEILING)
    }

    fn compute_frequency(&mut self, buffer: &AudioBuffer, time_seconds: f64) -> Vec<f32> {
        let size = self.transform_size;
        let bins = self.bin_count();
        let fft = &mut self.fft;

        buffer.extract_window(time_seconds, &mut fft.input);
        for (index, value) in fft.input.iter_mut().enumerate() {
            *value *= hann_value(index, size);
        }

        if let Err(err) = fft
            .plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)
        {
            tracing::warn!(%err, size, "spectrum transform failed, emitting a silent frame");
            return vec![0.0; bins];
        }

        fft.spectrum
            .iter()
            .map(|bin| {
                let magnitude = bin.norm() / size as f32;
                let log_magnitude = 20.0 * magnitude.log10();
                if log_magnitude.is_finite() {
                    log_magnitude
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl Clone for FrequencyAnalyzer {
    /// Re-plans the transform for the copy; only the smoothing state is
    /// carried over.
    fn clone(&self) -> Self {
        let mut copy = Self::with_smoothing(self.transform_size, self.smoothing);
        copy.previous_frame = self.previous_frame.clone();
        copy
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn plan(planner: &mut RealFftPlanner<f32>, size: usize) -> Self {
        let plan = planner.plan_fft_forward(size);
        let scratch = plan.make_scratch_vec();
        let spectrum = plan.make_output_vec();
        let input = plan.make_input_vec();
        Self {
            size,
            plan,
            scratch,
            spectrum,
            input,
        }
    }
}

impl fmt::Debug for FrequencyAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyAnalyzer")
            .field("transform_size", &self.transform_size)
            .field("smoothing", &self.smoothing)
            .field("previous_frame", &self.previous_frame.len())
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

/// Linearly rescales `values` into `[min, max]` using their own extremes.
/// A flat input maps every value to `min`.
pub fn normalize(values: &[f32], min: f32, max: f32) -> Vec<f32> {
    let (low, high) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), &v| {
            (low.min(v), high.max(v))
        });

    if values.is_empty() || high <= low {
        return vec![min; values.len()];
    }

    values
        .iter()
        .map(|&value| (value - low) / (high - low) * (max - min) + min)
        .collect()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
