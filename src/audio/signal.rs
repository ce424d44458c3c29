//! Signal and encoding descriptors

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoxError};
use crate::ffi::types::{sox_encodinginfo_t, sox_signalinfo_t};

/// Raw audio geometry of a stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInfo {
    /// Samples per second per channel
    pub rate: f64,
    pub channels: u32,
    /// Bits of precision per sample
    pub precision: u32,
    /// Total samples across all channels, 0 if unknown
    #[serde(default)]
    pub length: u64,
}

impl SignalInfo {
    pub fn new(rate: u32, channels: u32, precision: u32) -> Self {
        Self {
            rate: rate as f64,
            channels,
            precision,
            length: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(SoxError::invalid_argument("Sample rate must be greater than 0"));
        }
        if self.channels == 0 {
            return Err(SoxError::invalid_argument("Channel count must be greater than 0"));
        }
        if self.precision == 0 {
            return Err(SoxError::invalid_argument("Precision must be greater than 0"));
        }
        Ok(())
    }

    /// Number of whole frames described by `length`
    pub fn frames(&self) -> u64 {
        if self.channels == 0 {
            0
        } else {
            self.length / self.channels as u64
        }
    }

    /// Duration in seconds, 0.0 if the length is unknown
    pub fn duration(&self) -> f64 {
        if self.rate > 0.0 {
            self.frames() as f64 / self.rate
        } else {
            0.0
        }
    }

    /// Same geometry as far as an effects chain is concerned
    pub fn same_geometry(&self, other: &SignalInfo) -> bool {
        self.rate == other.rate && self.channels == other.channels
    }

    pub(crate) fn to_raw(self) -> sox_signalinfo_t {
        sox_signalinfo_t {
            rate: self.rate,
            channels: self.channels,
            precision: self.precision,
            length: self.length,
            mult: std::ptr::null_mut(),
        }
    }

    pub(crate) fn from_raw(raw: &sox_signalinfo_t) -> Self {
        Self {
            rate: raw.rate,
            channels: raw.channels,
            precision: raw.precision,
            length: raw.length,
        }
    }
}

impl std::fmt::Display for SignalInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz, {}ch, {}-bit", self.rate, self.channels, self.precision)
    }
}

/// Sample encoding kinds known to libsox (`sox_encoding_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingKind {
    Unknown,
    SignedInteger,
    UnsignedInteger,
    Float,
    FloatText,
    Flac,
    Hcom,
    Wavpack,
    WavpackFloat,
    ULaw,
    ALaw,
    G721,
    G723,
    ClAdpcm,
    ClAdpcm16,
    MsAdpcm,
    ImaAdpcm,
    OkiAdpcm,
    Dpcm,
    Dwvw,
    Dwvwn,
    Gsm,
    Mp3,
    Vorbis,
    AmrWb,
    AmrNb,
    Cvsd,
    Lpc10,
    Opus,
    #[serde(skip)]
    Other(u32),
}

const ENCODING_TABLE: &[EncodingKind] = &[
    EncodingKind::Unknown,
    EncodingKind::SignedInteger,
    EncodingKind::UnsignedInteger,
    EncodingKind::Float,
    EncodingKind::FloatText,
    EncodingKind::Flac,
    EncodingKind::Hcom,
    EncodingKind::Wavpack,
    EncodingKind::WavpackFloat,
    EncodingKind::ULaw,
    EncodingKind::ALaw,
    EncodingKind::G721,
    EncodingKind::G723,
    EncodingKind::ClAdpcm,
    EncodingKind::ClAdpcm16,
    EncodingKind::MsAdpcm,
    EncodingKind::ImaAdpcm,
    EncodingKind::OkiAdpcm,
    EncodingKind::Dpcm,
    EncodingKind::Dwvw,
    EncodingKind::Dwvwn,
    EncodingKind::Gsm,
    EncodingKind::Mp3,
    EncodingKind::Vorbis,
    EncodingKind::AmrWb,
    EncodingKind::AmrNb,
    EncodingKind::Cvsd,
    EncodingKind::Lpc10,
    EncodingKind::Opus,
];

impl EncodingKind {
    pub fn from_raw(value: u32) -> Self {
        ENCODING_TABLE
            .get(value as usize)
            .copied()
            .unwrap_or(EncodingKind::Other(value))
    }

    pub fn to_raw(self) -> u32 {
        match self {
            EncodingKind::Other(value) => value,
            kind => ENCODING_TABLE
                .iter()
                .position(|k| *k == kind)
                .unwrap_or(0) as u32,
        }
    }

    /// Lossless PCM-style encodings
    pub fn is_lossless(&self) -> bool {
        matches!(
            self,
            EncodingKind::SignedInteger
                | EncodingKind::UnsignedInteger
                | EncodingKind::Float
                | EncodingKind::Flac
                | EncodingKind::Wavpack
                | EncodingKind::WavpackFloat
        )
    }
}

/// Parses the kebab-case names used in config files, e.g. `signed-integer`
impl std::str::FromStr for EncodingKind {
    type Err = SoxError;

    fn from_str(name: &str) -> Result<Self> {
        use serde::de::IntoDeserializer;
        use serde::de::value::{Error as ValueError, StrDeserializer};

        let deserializer: StrDeserializer<'_, ValueError> = name.into_deserializer();
        EncodingKind::deserialize(deserializer)
            .map_err(|_| SoxError::invalid_argument(format!("Unknown encoding `{}`", name)))
    }
}

/// How samples are serialised by a stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodingInfo {
    pub kind: EncodingKind,
    /// 0 lets the format choose
    #[serde(default)]
    pub bits_per_sample: u32,
    /// Compression factor, where applicable
    #[serde(default)]
    pub compression: f64,
    #[serde(default)]
    pub opposite_endian: bool,
}

/// `sox_option_default` for the reverse_* fields
const SOX_OPTION_DEFAULT: i32 = 2;

impl EncodingInfo {
    pub fn new(kind: EncodingKind, bits_per_sample: u32) -> Self {
        Self {
            kind,
            bits_per_sample,
            compression: 0.0,
            opposite_endian: false,
        }
    }

    pub(crate) fn to_raw(self) -> sox_encodinginfo_t {
        sox_encodinginfo_t {
            encoding: self.kind.to_raw(),
            bits_per_sample: self.bits_per_sample,
            compression: self.compression,
            reverse_bytes: SOX_OPTION_DEFAULT,
            reverse_nibbles: SOX_OPTION_DEFAULT,
            reverse_bits: SOX_OPTION_DEFAULT,
            opposite_endian: self.opposite_endian as i32,
        }
    }

    pub(crate) fn from_raw(raw: &sox_encodinginfo_t) -> Self {
        Self {
            kind: EncodingKind::from_raw(raw.encoding),
            bits_per_sample: raw.bits_per_sample,
            compression: raw.compression,
            opposite_endian: raw.opposite_endian != 0,
        }
    }
}

impl Default for EncodingInfo {
    fn default() -> Self {
        Self::new(EncodingKind::Unknown, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_validation() {
        assert!(SignalInfo::new(44100, 2, 16).validate().is_ok());
        assert!(SignalInfo::new(0, 2, 16).validate().is_err());
        assert!(SignalInfo::new(44100, 0, 16).validate().is_err());
        assert!(SignalInfo::new(44100, 2, 0).validate().is_err());

        let mut signal = SignalInfo::new(44100, 2, 16);
        signal.rate = f64::NAN;
        assert!(signal.validate().is_err());
    }

    #[test]
    fn test_signal_duration() {
        let mut signal = SignalInfo::new(8000, 2, 16);
        signal.length = 16000;
        assert_eq!(signal.frames(), 8000);
        assert_eq!(signal.duration(), 1.0);
    }

    #[test]
    fn test_signal_raw_conversion() {
        let mut signal = SignalInfo::new(48000, 1, 24);
        signal.length = 99;
        let raw = signal.to_raw();
        assert!(raw.mult.is_null());
        assert_eq!(SignalInfo::from_raw(&raw), signal);
    }

    #[test]
    fn test_encoding_kind_codes() {
        assert_eq!(EncodingKind::from_raw(1), EncodingKind::SignedInteger);
        assert_eq!(EncodingKind::from_raw(3), EncodingKind::Float);
        assert_eq!(EncodingKind::SignedInteger.to_raw(), 1);
        assert_eq!(EncodingKind::Opus.to_raw(), 28);
        assert_eq!(EncodingKind::from_raw(500), EncodingKind::Other(500));
        assert_eq!(EncodingKind::Other(500).to_raw(), 500);
    }

    #[test]
    fn test_encoding_kind_from_name() {
        assert_eq!("signed-integer".parse::<EncodingKind>().unwrap(), EncodingKind::SignedInteger);
        assert_eq!("u-law".parse::<EncodingKind>().unwrap(), EncodingKind::ULaw);
        assert_eq!("float".parse::<EncodingKind>().unwrap(), EncodingKind::Float);
        assert!(matches!(
            "SignedInteger".parse::<EncodingKind>(),
            Err(SoxError::InvalidArgument { .. })
        ));
        assert!("".parse::<EncodingKind>().is_err());
    }

    #[test]
    fn test_encoding_raw_conversion() {
        let encoding = EncodingInfo {
            kind: EncodingKind::SignedInteger,
            bits_per_sample: 16,
            compression: 0.0,
            opposite_endian: true,
        };
        let raw = encoding.to_raw();
        assert_eq!(raw.opposite_endian, 1);
        assert_eq!(raw.reverse_bytes, SOX_OPTION_DEFAULT);
        assert_eq!(EncodingInfo::from_raw(&raw), encoding);
    }
}
