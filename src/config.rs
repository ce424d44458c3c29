//! Configuration management for effects-chain runs

use crate::audio::{EncodingInfo, EncodingKind, SignalInfo, DEFAULT_BUFFER_SIZE};
use crate::error::{Result, SoxError};
use crate::sox::{EffectSpec, ReadOptions, WriteOptions};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
}

/// Loading and global tuning of libsox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Explicit path to the shared library; searched for when absent
    pub path: Option<PathBuf>,
    /// libsox message verbosity, 0 (silent) to 6 (debug)
    pub verbosity: u32,
    /// libsox internal buffer size, in samples
    pub buffer_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub filetype: Option<String>,
    /// Required for headerless input such as `raw`
    pub signal: Option<SignalInfo>,
    pub encoding: Option<EncodingInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub filetype: Option<String>,
    /// Overrides of the input's signal; unset fields copy the input
    pub rate: Option<u32>,
    pub channels: Option<u32>,
    pub precision: Option<u32>,
    pub encoding: Option<EncodingInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Insert `rate`/`channels` when the output geometry differs
    pub auto_adapt: bool,
    /// Samples per block when metering levels
    pub block_size: usize,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
            effects: Vec::new(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: None,
            verbosity: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("input.wav"),
            filetype: None,
            signal: None,
            encoding: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output.wav"),
            filetype: None,
            rate: None,
            channels: None,
            precision: None,
            encoding: None,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            auto_adapt: true,
            block_size: DEFAULT_BUFFER_SIZE,
            verbose: false,
        }
    }
}

impl LibraryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.verbosity > 6 {
            return Err(SoxError::config("Verbosity must be in range [0, 6]"));
        }
        if self.buffer_size == 0 {
            return Err(SoxError::config("Buffer size must be greater than 0"));
        }
        Ok(())
    }
}

impl InputConfig {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            signal: self.signal,
            encoding: self.encoding,
            filetype: self.filetype.clone(),
        }
    }
}

impl OutputConfig {
    /// Output parameters derived from the input signal and the overrides
    pub fn write_options(&self, input: &SignalInfo) -> WriteOptions {
        let mut signal = SignalInfo { length: 0, ..*input };
        if let Some(rate) = self.rate {
            signal.rate = rate as f64;
        }
        if let Some(channels) = self.channels {
            signal.channels = channels;
        }
        if let Some(precision) = self.precision {
            signal.precision = precision;
        }
        WriteOptions {
            signal,
            encoding: self.encoding,
            filetype: self.filetype.clone(),
        }
    }
}

impl Config {
    /// Get verbose mode (convenience method)
    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }

    /// Get meter block size (convenience method)
    pub fn block_size(&self) -> usize {
        self.processing.block_size
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "soxchain", about = "Run libsox effects chains", version, author)]
pub struct Args {
    #[arg(short = 'i', long = "input", help = "Input audio file path")]
    pub input: Option<PathBuf>,

    #[arg(short = 'o', long = "output", help = "Output audio file path")]
    pub output: Option<PathBuf>,

    #[arg(long = "input-type", help = "Input file type (e.g. raw), auto-detected by default")]
    pub input_type: Option<String>,

    #[arg(long = "input-rate", help = "Input sample rate (Hz), for headerless input")]
    pub input_rate: Option<u32>,

    #[arg(long = "input-channels", help = "Input channel count, for headerless input")]
    pub input_channels: Option<u32>,

    #[arg(long = "input-bits", help = "Input bits per sample, for headerless input")]
    pub input_bits: Option<u32>,

    #[arg(long = "input-encoding", help = "Input encoding, e.g. signed-integer, for headerless input")]
    pub input_encoding: Option<EncodingKind>,

    #[arg(short = 't', long = "type", help = "Output file type, derived from the extension by default")]
    pub output_type: Option<String>,

    #[arg(short = 'r', long = "rate", help = "Output sample rate (Hz)")]
    pub rate: Option<u32>,

    #[arg(long = "channels", help = "Output channel count")]
    pub channels: Option<u32>,

    #[arg(short = 'b', long = "precision", help = "Output precision (bits per sample)")]
    pub precision: Option<u32>,

    #[arg(short = 'e', long = "effect", help = "Effect with options, e.g. \"vol 0.5\" (repeatable)")]
    pub effects: Vec<String>,

    #[arg(long = "no-auto-adapt", help = "Do not insert rate/channels effects automatically")]
    pub no_auto_adapt: bool,

    #[arg(long = "buffer-size", help = "libsox buffer size (samples)")]
    pub buffer_size: Option<usize>,

    #[arg(long = "block-size", help = "Samples per block for --levels")]
    pub block_size: Option<usize>,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(long = "library", help = "libsox shared library path")]
    pub library: Option<PathBuf>,

    #[arg(long = "list-effects", help = "List the effects libsox provides and exit")]
    pub list_effects: bool,

    #[arg(long = "levels", help = "Print per-block stereo levels of the input instead of processing")]
    pub levels: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_args_and_config(args)
    }

    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        if let Some(input) = args.input {
            config.input.path = input;
        }
        if let Some(output) = args.output {
            config.output.path = output;
        }
        if args.input_type.is_some() {
            config.input.filetype = args.input_type;
        }
        if args.output_type.is_some() {
            config.output.filetype = args.output_type;
        }
        if args.input_rate.is_some() || args.input_channels.is_some() || args.input_bits.is_some() {
            // an unset rate fails validation below
            let signal = config.input.signal.get_or_insert(SignalInfo::new(0, 1, 16));
            if let Some(rate) = args.input_rate {
                signal.rate = rate as f64;
            }
            if let Some(channels) = args.input_channels {
                signal.channels = channels;
            }
            if let Some(bits) = args.input_bits {
                signal.precision = bits;
            }
        }
        if args.input_encoding.is_some() || args.input_bits.is_some() {
            let encoding = config.input.encoding.get_or_insert_with(EncodingInfo::default);
            if let Some(kind) = args.input_encoding {
                encoding.kind = kind;
            }
            if let Some(bits) = args.input_bits {
                encoding.bits_per_sample = bits;
            }
        }
        if args.rate.is_some() {
            config.output.rate = args.rate;
        }
        if args.channels.is_some() {
            config.output.channels = args.channels;
        }
        if args.precision.is_some() {
            config.output.precision = args.precision;
        }
        if !args.effects.is_empty() {
            config.effects = args
                .effects
                .iter()
                .map(|e| EffectSpec::parse(e))
                .collect::<Result<Vec<_>>>()?;
        }
        if args.no_auto_adapt {
            config.processing.auto_adapt = false;
        }
        if let Some(buffer_size) = args.buffer_size {
            config.library.buffer_size = buffer_size;
        }
        if let Some(block_size) = args.block_size {
            config.processing.block_size = block_size;
        }
        if args.library.is_some() {
            config.library.path = args.library;
        }
        config.processing.verbose |= args.verbose;

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SoxError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SoxError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        self.library.validate()?;

        if let Some(signal) = &self.input.signal {
            signal
                .validate()
                .map_err(|e| SoxError::config(format!("Input signal: {}", e)))?;
        }

        if self.output.rate == Some(0) {
            return Err(SoxError::config("Output rate must be greater than 0"));
        }
        if self.output.channels == Some(0) {
            return Err(SoxError::config("Output channel count must be greater than 0"));
        }
        if self.output.precision == Some(0) {
            return Err(SoxError::config("Output precision must be greater than 0"));
        }

        if self.processing.block_size == 0 {
            return Err(SoxError::config("Block size must be greater than 0"));
        }

        if let Some(effect) = self.effects.iter().find(|e| e.name.trim().is_empty()) {
            return Err(SoxError::config(format!("Effect with empty name (args: {:?})", effect.args)));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SoxError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SoxError::config(format!("Failed to write config file: {}", e)))
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["soxchain"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.library.buffer_size, 8192);
        assert_eq!(config.library.verbosity, 1);
        assert!(config.processing.auto_adapt);
        assert!(config.effects.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.library.buffer_size = 0;
        assert!(config.validate().is_err());
        config.library.buffer_size = 8192;

        config.library.verbosity = 7;
        assert!(config.validate().is_err());
        config.library.verbosity = 2;

        config.output.rate = Some(0);
        assert!(config.validate().is_err());
        config.output.rate = Some(22050);

        config.input.signal = Some(SignalInfo::new(44100, 0, 16));
        assert!(config.validate().is_err());
        config.input.signal = None;

        config.effects.push(EffectSpec::new(" "));
        assert!(config.validate().is_err());
        config.effects.clear();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.output.rate = Some(22050);
        config.effects.push(EffectSpec::new("vol").with_args(["0.5"]));
        config.effects.push(EffectSpec::new("reverse"));

        assert!(config.save_to_file(&config_path).is_ok());
        assert!(config_path.exists());

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        std::fs::write(
            &config_path,
            r#"
[input]
path = "in.raw"
filetype = "raw"
signal = { rate = 8000, channels = 1, precision = 16 }

[[effects]]
name = "rate"
args = ["16000"]
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.input.path, PathBuf::from("in.raw"));
        assert_eq!(config.input.signal, Some(SignalInfo::new(8000, 1, 16)));
        assert_eq!(config.output.path, PathBuf::from("output.wav"));
        assert_eq!(config.effects, vec![EffectSpec::new("rate").with_args(["16000"])]);
        assert_eq!(config.library.buffer_size, 8192);
    }

    #[test]
    fn test_invalid_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        std::fs::write(&config_path, "[library\nverbosity = ").unwrap();
        assert!(matches!(Config::from_file(&config_path), Err(SoxError::Config { .. })));
        assert!(matches!(Config::from_file(temp_dir.path().join("missing.toml")), Err(SoxError::Config { .. })));
    }

    #[test]
    fn test_args_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let mut file_config = Config::default();
        file_config.output.rate = Some(8000);
        file_config.effects.push(EffectSpec::new("reverse"));
        file_config.save_to_file(&config_path).unwrap();

        let config = Config::from_args_and_config(args(&[
            "-c", config_path.to_str().unwrap(),
            "-i", "a.wav",
            "-r", "48000",
            "-e", "vol 0.5",
            "-e", "rate 44100",
            "--no-auto-adapt",
        ]))
        .unwrap();

        assert_eq!(config.input.path, PathBuf::from("a.wav"));
        assert_eq!(config.output.rate, Some(48000));
        assert!(!config.processing.auto_adapt);
        assert_eq!(
            config.effects,
            vec![
                EffectSpec::new("vol").with_args(["0.5"]),
                EffectSpec::new("rate").with_args(["44100"]),
            ]
        );
    }

    #[test]
    fn test_args_describe_raw_input() {
        let config = Config::from_args_and_config(args(&[
            "-i", "in.raw",
            "--input-type", "raw",
            "--input-rate", "8000",
            "--input-channels", "1",
            "--input-bits", "16",
            "--input-encoding", "signed-integer",
        ]))
        .unwrap();

        let options = config.input.read_options();
        assert_eq!(options.filetype.as_deref(), Some("raw"));
        assert_eq!(options.signal, Some(SignalInfo::new(8000, 1, 16)));
        assert_eq!(options.encoding, Some(EncodingInfo::new(EncodingKind::SignedInteger, 16)));

        // channels without a rate cannot describe a stream
        assert!(Config::from_args_and_config(args(&["--input-channels", "2"])).is_err());
        assert!(Args::try_parse_from(["soxchain", "--input-encoding", "pcm"]).is_err());
    }

    #[test]
    fn test_input_encoding_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("raw.toml");
        std::fs::write(
            &config_path,
            r#"
[input]
filetype = "raw"
signal = { rate = 8000, channels = 1, precision = 8 }
encoding = { kind = "u-law", bits_per_sample = 8 }
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.input.encoding, Some(EncodingInfo::new(EncodingKind::ULaw, 8)));
        assert_eq!(config.input.read_options().encoding, config.input.encoding);
    }

    #[test]
    fn test_args_keep_file_effects_when_none_given() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let mut file_config = Config::default();
        file_config.effects.push(EffectSpec::new("reverse"));
        file_config.save_to_file(&config_path).unwrap();

        let config = Config::from_args_and_config(args(&["--config", config_path.to_str().unwrap()])).unwrap();
        assert_eq!(config.effects, vec![EffectSpec::new("reverse")]);
    }

    #[test]
    fn test_write_options_copy_input_signal() {
        let mut input = SignalInfo::new(44100, 2, 16);
        input.length = 1000;

        let output = OutputConfig::default();
        let options = output.write_options(&input);
        assert_eq!(options.signal, SignalInfo::new(44100, 2, 16));

        let output = OutputConfig {
            rate: Some(22050),
            channels: Some(1),
            filetype: Some("wav".into()),
            ..Default::default()
        };
        let options = output.write_options(&input);
        assert_eq!(options.signal, SignalInfo::new(22050, 1, 16));
        assert_eq!(options.filetype.as_deref(), Some("wav"));
    }
}
