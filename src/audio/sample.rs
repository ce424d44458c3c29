//! Native samples, sample buffers and level metering

use crate::ffi::types::{sox_sample_t, SOX_SAMPLE_MAX, SOX_SAMPLE_MIN};

/// libsox's native 32-bit fixed-point sample
pub type Sample = sox_sample_t;

pub const SAMPLE_MAX: Sample = SOX_SAMPLE_MAX;
pub const SAMPLE_MIN: Sample = SOX_SAMPLE_MIN;

/// Default buffer capacity, in samples
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Calibration constant of the level needle
const LEVEL_SCALE: f64 = 35.0;

const FULL_SCALE: f64 = 1.0 / (SAMPLE_MAX as f64 + 1.0);

/// Convert to a 32-bit float in [-1, 1], counting clips.
///
/// Values too large to round into the f32 mantissa saturate to 1.0 and
/// increment `clips`.
pub fn sample_to_f32(sample: Sample, clips: &mut u64) -> f32 {
    if sample > SAMPLE_MAX - 64 {
        *clips += 1;
        1.0
    } else {
        (((sample + 64) & !127) as f64 * FULL_SCALE) as f32
    }
}

/// Convert to a 64-bit float in [-1, 1).
pub fn sample_to_f64(sample: Sample) -> f64 {
    sample as f64 * FULL_SCALE
}

/// Native sample from a signed 16-bit value
pub fn sample_from_i16(value: i16) -> Sample {
    (value as Sample) << 16
}

/// VU-style needle positions for an interleaved stereo block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub left: f64,
    pub right: f64,
}

impl Levels {
    /// Needle position for silence
    pub const SILENT: f64 = LEVEL_SCALE + 0.5;

    pub fn from_peaks(left_peak: f64, right_peak: f64) -> Self {
        Self {
            left: needle(left_peak),
            right: needle(right_peak),
        }
    }

    /// `(right, left)`, the order the levels were historically returned in
    pub fn as_legacy_tuple(&self) -> (f64, f64) {
        (self.right, self.left)
    }
}

fn needle(peak: f64) -> f64 {
    (1.0 - peak) * LEVEL_SCALE + 0.5
}

/// Peak levels of the first `block_size` samples.
///
/// Even indices are the left channel, odd indices the right one.
pub fn peak_levels(samples: &[Sample], block_size: usize) -> Levels {
    let mut left: f64 = 0.0;
    let mut right: f64 = 0.0;

    for (i, &sample) in samples.iter().take(block_size).enumerate() {
        let value = sample_to_f64(sample).abs();
        if i & 1 == 1 {
            right = right.max(value);
        } else {
            left = left.max(value);
        }
    }

    Levels::from_peaks(left, right)
}

/// Fixed-capacity staging buffer for read/write calls
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Vec<Sample>,
    len: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
        }
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let len = samples.len();
        Self { data: samples, len }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid samples
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Valid samples
    pub fn as_slice(&self) -> &[Sample] {
        &self.data[..self.len]
    }

    /// Whole backing storage, for filling
    pub(crate) fn storage_mut(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len.min(self.data.len());
    }

    pub fn sample_to_f32(&self, index: usize, clips: &mut u64) -> Option<f32> {
        self.as_slice().get(index).map(|&s| sample_to_f32(s, clips))
    }

    pub fn sample_to_f64(&self, index: usize) -> Option<f64> {
        self.as_slice().get(index).map(|&s| sample_to_f64(s))
    }

    pub fn peak_levels(&self, block_size: usize) -> Levels {
        peak_levels(self.as_slice(), block_size)
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}
