//! Effects-chain runs and metering built on the typed libsox handles

pub mod meter;
pub mod pipeline;

pub use meter::{BlockLevels, LevelMeter};
pub use pipeline::{adaptation_effects, ChainSummary, FlowReport, Pipeline};
