mod common;

use soxchain::audio::{sample_from_i16, Sample};
use soxchain::{EncodingInfo, EncodingKind, ReadOptions, SignalInfo, SoxError, WriteOptions};
use tempfile::TempDir;

fn native(samples: &[i16]) -> Vec<Sample> {
    samples.iter().map(|&s| sample_from_i16(s)).collect()
}

#[test]
fn test_write_then_close_without_samples_gives_empty_container() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();

    for (rate, channels) in [(8000, 1), (44100, 2), (48000, 6)] {
        let path = temp_dir.path().join(format!("empty_{}_{}.wav", rate, channels));
        let output = sox
            .open_write(&path, &WriteOptions::new(SignalInfo::new(rate, channels, 16)))
            .unwrap();
        output.close().unwrap();

        let mut input = sox.open_read(&path, &ReadOptions::default()).unwrap();
        let signal = input.signal();
        assert_eq!(signal.rate, rate as f64);
        assert_eq!(signal.channels, channels);
        assert_eq!(signal.length, 0);

        let mut buf = vec![0; 64];
        assert_eq!(input.read(&mut buf), 0);
        input.close().unwrap();
    }
}

#[test]
fn test_lossless_round_trip() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("round_trip.wav");
    let samples = common::random_samples(10_000, 7);

    let mut output = sox
        .open_write(&path, &WriteOptions::new(SignalInfo::new(16000, 1, 16)))
        .unwrap();
    output.write_all(&native(&samples)).unwrap();
    output.close().unwrap();

    let (spec, on_disk) = common::read_wav(&path);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(on_disk, samples);

    let mut input = sox.open_read(&path, &ReadOptions::default()).unwrap();
    assert_eq!(input.signal().length, samples.len() as u64);
    let mut decoded = vec![0; samples.len()];
    assert_eq!(input.read(&mut decoded), samples.len());
    assert_eq!(decoded, native(&samples));
}

#[test]
fn test_read_at_end_of_stream_keeps_returning_zero() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("short.wav");
    common::write_wav(&path, 2, 44100, &common::random_samples(300, 1));

    let mut input = sox.open_read(&path, &ReadOptions::default()).unwrap();
    let mut buffer = soxchain::SampleBuffer::new(128);
    let mut total = 0;
    while input.read_into(&mut buffer) > 0 {
        total += buffer.len();
    }
    assert_eq!(total, 300);
    for _ in 0..3 {
        assert_eq!(input.read_into(&mut buffer), 0);
        assert!(buffer.is_empty());
    }
}

#[test]
fn test_seek_to_sample_offset() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("seek.wav");
    let samples = common::random_samples(1000, 3);
    common::write_wav(&path, 1, 8000, &samples);

    let mut input = sox.open_read(&path, &ReadOptions::default()).unwrap();
    input.seek(400).unwrap();
    let mut buf = vec![0; 10];
    assert_eq!(input.read(&mut buf), 10);
    assert_eq!(buf, native(&samples[400..410]));
}

#[test]
fn test_memory_read_matches_file_read() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("memory.wav");
    let samples = common::random_samples(2048, 11);
    common::write_wav(&path, 2, 22050, &samples);

    let bytes = std::fs::read(&path).unwrap();
    let mut input = sox.open_mem_read(bytes, &ReadOptions::default()).unwrap();
    assert_eq!(input.label(), "<memory>");
    assert_eq!(input.signal().channels, 2);

    let mut decoded = vec![0; samples.len() + 16];
    assert_eq!(input.read(&mut decoded), samples.len());
    assert_eq!(&decoded[..samples.len()], native(&samples).as_slice());
}

#[test]
fn test_memory_read_rejects_empty_buffer() {
    let Some(session) = common::session() else { return };
    let err = session.sox.open_mem_read(Vec::new(), &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, SoxError::InvalidArgument { .. }));
}

#[test]
fn test_memstream_write_produces_decodable_bytes() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let samples = common::random_samples(4000, 5);

    let options = WriteOptions::new(SignalInfo::new(8000, 1, 16)).with_filetype("wav");
    let mut output = sox.open_memstream_write(&options).unwrap();
    output.write_all(&native(&samples)).unwrap();
    let bytes = output.into_bytes().unwrap();
    assert_eq!(&bytes[..4], b"RIFF");

    let mut input = sox.open_mem_read(bytes, &ReadOptions::default()).unwrap();
    let mut decoded = vec![0; samples.len()];
    assert_eq!(input.read(&mut decoded), samples.len());
    assert_eq!(decoded, native(&samples));
}

#[test]
fn test_memstream_write_needs_filetype() {
    let Some(session) = common::session() else { return };
    let options = WriteOptions::new(SignalInfo::new(8000, 1, 16));
    let err = session.sox.open_memstream_write(&options).unwrap_err();
    assert!(matches!(err, SoxError::InvalidArgument { .. }));
}

#[test]
fn test_open_failures() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();

    let missing = sox.open_read(temp_dir.path().join("missing.wav"), &ReadOptions::default());
    assert!(matches!(missing, Err(SoxError::Open { .. })));

    let garbage = temp_dir.path().join("garbage.wav");
    std::fs::write(&garbage, b"definitely not audio").unwrap();
    assert!(sox.open_read(&garbage, &ReadOptions::default()).is_err());

    // rejected before libsox sees it
    let bad_signal = WriteOptions::new(SignalInfo::new(44100, 0, 16));
    let err = sox.open_write(temp_dir.path().join("out.wav"), &bad_signal).unwrap_err();
    assert!(matches!(err, SoxError::InvalidArgument { .. }));
}

#[test]
fn test_write_options_like_input() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("source.wav");
    common::write_wav(&path, 2, 44100, &common::random_samples(100, 2));

    let input = sox.open_read(&path, &ReadOptions::default()).unwrap();
    let options = WriteOptions::like(&input);
    assert!(options.signal.same_geometry(&input.signal()));
    assert_eq!(input.encoding().bits_per_sample, 16);
}

#[test]
fn test_raw_input_with_described_signal() {
    let Some(session) = common::session() else { return };
    let sox = &session.sox;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pcm.raw");
    let samples = common::random_samples(8000, 33);
    common::write_raw(&path, &samples);

    let options = ReadOptions::default()
        .with_filetype("raw")
        .with_signal(SignalInfo::new(8000, 1, 16))
        .with_encoding(EncodingInfo::new(EncodingKind::SignedInteger, 16));
    let mut input = sox.open_read(&path, &options).unwrap();
    assert_eq!(input.signal().rate, 8000.0);
    assert_eq!(input.signal().channels, 1);
    assert_eq!(input.encoding().kind, EncodingKind::SignedInteger);

    let mut decoded = vec![0; samples.len() + 16];
    assert_eq!(input.read(&mut decoded), samples.len());
    assert_eq!(&decoded[..samples.len()], native(&samples).as_slice());
    input.close().unwrap();
}
