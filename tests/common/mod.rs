//! Shared fixtures for tests that need libsox
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soxchain::config::LibraryConfig;
use soxchain::Sox;

// Only one Sox bracket may be open per process
static LIBSOX: Mutex<()> = Mutex::new(());

/// An initialised library, held under the process-wide test lock
pub struct Session {
    pub sox: Sox,
    _guard: MutexGuard<'static, ()>,
}

/// Set to make a missing libsox fail the tests that need it
pub const REQUIRE_LIBSOX: &str = "SOXCHAIN_REQUIRE_LIBSOX";

/// Initialise libsox, or print why the calling test is skipped.
///
/// Panics instead of skipping when `SOXCHAIN_REQUIRE_LIBSOX` is set.
pub fn session() -> Option<Session> {
    let guard = LIBSOX.lock().unwrap_or_else(|e| e.into_inner());
    match Sox::init(&LibraryConfig::default()) {
        Ok(sox) => Some(Session { sox, _guard: guard }),
        Err(e) if std::env::var_os(REQUIRE_LIBSOX).is_some() => {
            panic!("libsox is required ({} is set) but failed to load: {}", REQUIRE_LIBSOX, e)
        }
        Err(e) => {
            eprintln!("skipping: libsox is not available ({})", e);
            None
        }
    }
}

pub fn libsox_available() -> bool {
    session().is_some()
}

pub fn random_samples(count: usize, seed: u64) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(-20000..=20000)).collect()
}

/// Write interleaved 16-bit PCM
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Write headerless native-endian 16-bit PCM
pub fn write_raw(path: &Path, samples: &[i16]) {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
}

pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
