//! soxchain - Typed Effects-Chain Orchestration over libsox
//!
//! Opens audio streams, builds effects chains and flows samples through
//! them with every libsox resource tied to a Rust owner.

pub mod audio;
pub mod config;
pub mod error;
pub mod ffi;
pub mod processing;
pub mod sox;

pub use audio::{EncodingInfo, EncodingKind, Levels, Sample, SampleBuffer, SignalInfo};
pub use config::{Args, Config};
pub use error::{Result, SoxError};
pub use processing::{FlowReport, LevelMeter, Pipeline};
pub use sox::{
    Effect, EffectHandler, EffectSpec, EffectsChain, FlowControl, FlowOutcome, InputStream, OutputStream,
    ReadOptions, Sox, WriteOptions,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn init_logging(verbose: bool) {
    let default_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_env("RUST_LOG")
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        libsox_version: None,
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Set once libsox has been loaded
    pub libsox_version: Option<String>,
}

impl LibraryInfo {
    pub fn with_libsox(mut self, sox: &Sox) -> Self {
        self.libsox_version = Some(sox.version());
        self
    }
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)?;
        if let Some(libsox) = &self.libsox_version {
            write!(f, " (libsox {})", libsox)?;
        }
        Ok(())
    }
}
