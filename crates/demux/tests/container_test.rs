//! End-to-end container tests over synthesized in-memory recordings.

use mcraw_common::{ContainerError, Timestamp};
use mcraw_demux::record::RecordType;
use mcraw_demux::{McrawReader, CONTAINER_ID, CONTAINER_VERSION, INDEX_MAGIC_NUMBER};
use std::io::Cursor;

// ─── Container builder ──────────────────────────────────────────────

/// Assembles a well-formed recording in memory: file header, container
/// metadata, frame and audio records, audio index, offsets table, and the
/// trailing buffer index.
struct ContainerBuilder {
    data: Vec<u8>,
    frame_offsets: Vec<(i64, i64)>,
    audio_offsets: Vec<(i64, i64)>,
}

impl ContainerBuilder {
    fn new(container_json: &str) -> Self {
        let mut data = CONTAINER_ID.to_vec();
        data.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
        let mut builder = ContainerBuilder {
            data,
            frame_offsets: Vec::new(),
            audio_offsets: Vec::new(),
        };
        builder.push_record(RecordType::Metadata.code(), container_json.as_bytes());
        builder
    }

    /// Append a record; returns the byte position of its header.
    fn push_record(&mut self, code: u32, payload: &[u8]) -> i64 {
        let at = self.data.len() as i64;
        self.data.extend_from_slice(&code.to_le_bytes());
        self.data.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        self.data.extend_from_slice(payload);
        at
    }

    fn push_frame(&mut self, timestamp: i64, payload: &[u8], frame_json: &str) {
        let at = self.push_record(RecordType::Buffer.code(), payload);
        self.push_record(RecordType::Metadata.code(), frame_json.as_bytes());
        self.frame_offsets.push((timestamp, at));
    }

    /// A frame record whose declared size reaches past the end of the
    /// finished file.
    fn push_truncated_frame(&mut self, timestamp: i64) {
        let at = self.data.len() as i64;
        self.data
            .extend_from_slice(&RecordType::Buffer.code().to_le_bytes());
        self.data.extend_from_slice(&(1u64 << 20).to_le_bytes());
        self.data.extend_from_slice(&[0u8; 8]);
        self.frame_offsets.push((timestamp, at));
    }

    fn push_audio(&mut self, timestamp: Option<i64>, samples: &[i16]) {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let at = self.push_record(RecordType::AudioData.code(), &bytes);
        if let Some(ts) = timestamp {
            self.push_record(RecordType::AudioDataMetadata.code(), &ts.to_le_bytes());
        }
        self.audio_offsets.push((timestamp.unwrap_or(-1), at));
    }

    fn finish(mut self) -> Cursor<Vec<u8>> {
        if !self.audio_offsets.is_empty() {
            let mut payload = (self.audio_offsets.len() as u64).to_le_bytes().to_vec();
            for &(ts, off) in &self.audio_offsets {
                payload.extend_from_slice(&ts.to_le_bytes());
                payload.extend_from_slice(&off.to_le_bytes());
            }
            self.push_record(RecordType::AudioIndex.code(), &payload);
        }

        let table_at = self.data.len() as i64;
        for &(ts, off) in &self.frame_offsets {
            self.data.extend_from_slice(&ts.to_le_bytes());
            self.data.extend_from_slice(&off.to_le_bytes());
        }

        let mut index = INDEX_MAGIC_NUMBER.to_le_bytes().to_vec();
        index.extend_from_slice(&table_at.to_le_bytes());
        index.extend_from_slice(&(self.frame_offsets.len() as u64).to_le_bytes());
        self.push_record(RecordType::BufferIndex.code(), &index);

        Cursor::new(self.data)
    }
}

// ─── Frame payload builders ─────────────────────────────────────────

/// Sidechannel stream of `count` constant values, encoded as zero-width
/// groups carrying the value as their reference.
fn constant_stream(count: u32, value: u16) -> Vec<u8> {
    let mut data = count.to_le_bytes().to_vec();
    for _ in 0..count.div_ceil(64) {
        data.push((value >> 8) as u8);
        data.push((value & 0xFF) as u8);
    }
    data
}

/// A frame payload of one 64x4 tile: four 8-bit blocks holding bytes
/// `0x00..0x3F`, zero references.
fn ramp_frame_payload() -> Vec<u8> {
    let pixel: Vec<u8> = (0..4).flat_map(|_| 0u8..64).collect();
    let bits = constant_stream(4, 8);
    let refs = constant_stream(4, 0);

    let bits_offset = (16 + pixel.len()) as u32;
    let refs_offset = bits_offset + bits.len() as u32;

    let mut payload = Vec::new();
    payload.extend_from_slice(&64u32.to_le_bytes());
    payload.extend_from_slice(&4u32.to_le_bytes());
    payload.extend_from_slice(&bits_offset.to_le_bytes());
    payload.extend_from_slice(&refs_offset.to_le_bytes());
    payload.extend_from_slice(&pixel);
    payload.extend_from_slice(&bits);
    payload.extend_from_slice(&refs);
    payload
}

/// A frame payload whose every block is zero-width with reference `value`.
fn constant_frame_payload(encoded_width: u32, encoded_height: u32, value: u16) -> Vec<u8> {
    let entries = (encoded_width / 64) * (encoded_height / 4) * 4;
    let bits = constant_stream(entries, 0);
    let refs = constant_stream(entries, value);

    let bits_offset = 16u32;
    let refs_offset = bits_offset + bits.len() as u32;

    let mut payload = Vec::new();
    payload.extend_from_slice(&encoded_width.to_le_bytes());
    payload.extend_from_slice(&encoded_height.to_le_bytes());
    payload.extend_from_slice(&bits_offset.to_le_bytes());
    payload.extend_from_slice(&refs_offset.to_le_bytes());
    payload.extend_from_slice(&bits);
    payload.extend_from_slice(&refs);
    payload
}

fn frame_json(width: u32, height: u32, compression_type: u32) -> String {
    format!(
        r#"{{ "width": {width}, "height": {height}, "compressionType": {compression_type}, "asShotNeutral": [0.5, 1.0, 0.5] }}"#
    )
}

const CAMERA_JSON: &str = r#"{
    "blackLevel": [64, 64, 64, 64],
    "whiteLevel": 1023,
    "sensorArrangment": "bggr",
    "extraData": { "audioSampleRate": 48000, "audioChannels": 2 }
}"#;

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn empty_container_has_no_frames() {
    let cursor = ContainerBuilder::new("{}").finish();
    let mut reader = McrawReader::from_reader(cursor).unwrap();

    assert!(reader.frames().is_empty());
    assert!(matches!(
        reader.load_frame(Timestamp(42), &mut Vec::new()),
        Err(ContainerError::NotFound {
            timestamp: Timestamp(42)
        })
    ));
}

#[test]
fn single_ramp_frame_decodes() {
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(1_000, &ramp_frame_payload(), &frame_json(64, 4, 7));
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    assert_eq!(reader.frames(), &[Timestamp(1_000)]);

    let mut pixels = Vec::new();
    let meta = reader.load_frame(Timestamp(1_000), &mut pixels).unwrap();
    assert_eq!(meta.width, 64);
    assert_eq!(meta.height, 4);
    assert_eq!(pixels.len(), 64 * 4);

    // Blocks 0/1 interleave into rows 0 and 2, blocks 2/3 into rows 1 and
    // 3; with identical ramp blocks every row pairs up the same values.
    for r in 0..4 {
        for c in 0..64 {
            let expected = (c / 2 + if r >= 2 { 32 } else { 0 }) as u16;
            assert_eq!(pixels[r * 64 + c], expected, "row {r} col {c}");
        }
    }
}

#[test]
fn load_frame_is_idempotent() {
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(500, &ramp_frame_payload(), &frame_json(64, 4, 7));
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    let mut first = Vec::new();
    let mut second = Vec::new();
    reader.load_frame(Timestamp(500), &mut first).unwrap();
    reader.load_frame(Timestamp(500), &mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn frames_are_sorted_by_timestamp() {
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    // Written out of order; the index is re-sorted at open.
    for ts in [300i64, 100, 200] {
        builder.push_frame(ts, &constant_frame_payload(64, 4, 9), &frame_json(64, 4, 7));
    }
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    assert_eq!(
        reader.frames(),
        &[Timestamp(100), Timestamp(200), Timestamp(300)]
    );
    assert!(reader.frames().windows(2).all(|w| w[0] < w[1]));

    let mut pixels = Vec::new();
    reader.load_frame(Timestamp(200), &mut pixels).unwrap();
    assert!(pixels.iter().all(|&v| v == 9));
}

#[test]
fn version_mismatch_is_invalid_format() {
    let mut data = CONTAINER_ID.to_vec();
    data.extend_from_slice(&(CONTAINER_VERSION + 1).to_le_bytes());

    assert!(matches!(
        McrawReader::from_reader(Cursor::new(data)),
        Err(ContainerError::InvalidFormat(_))
    ));
}

#[test]
fn index_magic_mismatch_is_corrupted() {
    let mut data = {
        let mut builder = ContainerBuilder::new(CAMERA_JSON);
        builder.push_frame(1, &constant_frame_payload(64, 4, 0), &frame_json(64, 4, 7));
        builder.finish().into_inner()
    };
    // The index magic is the first 8 bytes of the trailing 24-byte payload.
    let at = data.len() - 24;
    data[at..at + 8].copy_from_slice(&0xDEAD_BEEFu64.to_le_bytes());

    assert!(matches!(
        McrawReader::from_reader(Cursor::new(data)),
        Err(ContainerError::Corrupted { .. })
    ));
}

#[test]
fn bad_compression_type_leaves_reader_usable() {
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(100, &constant_frame_payload(64, 4, 5), &frame_json(64, 4, 7));
    builder.push_frame(200, &constant_frame_payload(64, 4, 5), &frame_json(64, 4, 5));
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    let mut pixels = Vec::new();
    assert!(matches!(
        reader.load_frame(Timestamp(200), &mut pixels),
        Err(ContainerError::InvalidCompression {
            found: 5,
            expected: 7
        })
    ));

    // The good frame still loads after the failure.
    reader.load_frame(Timestamp(100), &mut pixels).unwrap();
    assert_eq!(pixels.len(), 64 * 4);
    assert!(pixels.iter().all(|&v| v == 5));
}

#[test]
fn truncated_buffer_record_is_io_error() {
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_truncated_frame(700);
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    assert!(matches!(
        reader.load_frame(Timestamp(700), &mut Vec::new()),
        Err(ContainerError::Io(_))
    ));
}

#[test]
fn audio_roundtrip_preserves_order_and_samples() {
    let first: Vec<i16> = (0..1024).map(|i| i as i16).collect();
    let second: Vec<i16> = (0..1024).map(|i| -(i as i16)).collect();

    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(50, &constant_frame_payload(64, 4, 1), &frame_json(64, 4, 7));
    builder.push_audio(Some(1_000_000), &first);
    builder.push_audio(Some(2_000_000), &second);
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    assert_eq!(reader.audio_sample_rate_hz(), Some(48000));
    assert_eq!(reader.num_audio_channels(), Some(2));

    let chunks = reader.load_audio().unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].timestamp, Timestamp(1_000_000));
    assert_eq!(chunks[0].samples, first);
    assert_eq!(chunks[1].timestamp, Timestamp(2_000_000));
    assert_eq!(chunks[1].samples, second);
}

#[test]
fn audio_without_metadata_record_has_no_timestamp() {
    let samples: Vec<i16> = vec![7; 256];

    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(50, &constant_frame_payload(64, 4, 1), &frame_json(64, 4, 7));
    builder.push_audio(None, &samples);
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    let chunks = reader.load_audio().unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].timestamp, Timestamp::NONE);
    assert_eq!(chunks[0].samples, samples);
}

#[test]
fn container_metadata_is_exposed() {
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(1, &constant_frame_payload(64, 4, 0), &frame_json(64, 4, 7));
    let reader = McrawReader::from_reader(builder.finish()).unwrap();

    let meta = reader.container_metadata();
    assert_eq!(meta.black_level, vec![64.0; 4]);
    assert_eq!(meta.white_level, Some(1023.0));
    assert_eq!(meta.sensor_arrangement().as_str(), "bggr");
}

#[test]
fn cropped_frame_decodes_to_declared_size() {
    // 128x8 encoded area, 100x6 declared output.
    let mut builder = ContainerBuilder::new(CAMERA_JSON);
    builder.push_frame(
        10,
        &constant_frame_payload(128, 8, 0x123),
        &frame_json(100, 6, 7),
    );
    let mut reader = McrawReader::from_reader(builder.finish()).unwrap();

    let mut pixels = Vec::new();
    let meta = reader.load_frame(Timestamp(10), &mut pixels).unwrap();
    assert_eq!(meta.resolution().pixel_count(), 600);
    assert_eq!(pixels.len(), 600);
    assert!(pixels.iter().all(|&v| v == 0x123));
}
