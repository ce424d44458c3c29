//! Audio Data Module
//!
//! Signal/encoding descriptors, native samples and the float and level
//! helpers that operate on them. Nothing here touches libsox state.

pub mod sample;
pub mod signal;

pub use sample::{
    peak_levels, sample_from_i16, sample_to_f32, sample_to_f64, Levels, Sample,
    SampleBuffer, DEFAULT_BUFFER_SIZE, SAMPLE_MAX, SAMPLE_MIN,
};
pub use signal::{EncodingInfo, EncodingKind, SignalInfo};
