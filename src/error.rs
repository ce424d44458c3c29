//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum SoxError {
    /// libsox could not be loaded, or a required symbol is missing
    #[error("Library error: {message}")]
    Library { message: String },

    #[error("libsox is already initialised in this process")]
    AlreadyInitialized,

    #[error("Effect not found: {name}")]
    EffectNotFound { name: String },

    #[error("Open error: {message}")]
    Open { message: String },

    #[error("Short write: {written} of {requested} samples written")]
    ShortWrite { requested: usize, written: usize },

    #[error("Effect `{effect}` rejected options (status {code})")]
    EffectOptions { effect: String, code: i32 },

    #[error("Operation failed: {message}")]
    Operation { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl SoxError {
    pub fn library<S: Into<String>>(msg: S) -> Self { Self::Library { message: msg.into() } }
    pub fn open<S: Into<String>>(msg: S) -> Self { Self::Open { message: msg.into() } }
    pub fn operation<S: Into<String>>(msg: S) -> Self { Self::Operation { message: msg.into() } }
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self { Self::InvalidArgument { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }

    pub fn effect_not_found<S: Into<String>>(name: S) -> Self {
        Self::EffectNotFound { name: name.into() }
    }
}

pub type Result<T> = std::result::Result<T, SoxError>;

impl From<std::io::Error> for SoxError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<libloading::Error> for SoxError {
    fn from(err: libloading::Error) -> Self { Self::library(err.to_string()) }
}

impl From<std::ffi::NulError> for SoxError {
    fn from(err: std::ffi::NulError) -> Self {
        Self::invalid_argument(format!("string contains an interior NUL byte at {}", err.nul_position()))
    }
}
