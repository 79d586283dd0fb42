//! The container reader — opens a recording, indexes its frames from the
//! trailing buffer index, and loads frame and audio payloads on demand.

use byteorder::{LittleEndian, ReadBytesExt};
use mcraw_common::{AudioChunk, BufferOffset, ContainerError, Timestamp};
use mcraw_decoder::FrameDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info, trace};

use crate::metadata::{ContainerMetadata, FrameMetadata};
use crate::record::{
    self, RecordType, BUFFER_INDEX_LEN, INDEX_MAGIC_NUMBER, RAW_COMPRESSION_TYPE,
    RECORD_HEADER_LEN,
};

/// Reader for one `.mcraw` recording.
///
/// Owns the underlying stream, the frame/audio offset tables, and the
/// decode scratch buffers. A reader is not safe to share across threads;
/// open independent readers for concurrent access to the same file.
pub struct McrawReader<R: Read + Seek> {
    reader: R,
    metadata: ContainerMetadata,
    offsets: Vec<BufferOffset>,
    frame_list: Vec<Timestamp>,
    frame_offsets: HashMap<Timestamp, BufferOffset>,
    audio_offsets: Vec<BufferOffset>,
    decoder: FrameDecoder,
    scratch: Vec<u8>,
}

impl McrawReader<BufReader<File>> {
    /// Open a recording from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        info!("Opening mcraw file: {}", path.display());
        let file = File::open(path).map_err(ContainerError::Io)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> McrawReader<R> {
    /// Build a reader over any seekable stream positioned at byte 0.
    pub fn from_reader(mut reader: R) -> Result<Self, ContainerError> {
        record::read_file_header(&mut reader)?;

        // The first record is always the container metadata document.
        let header = record::expect_record(&mut reader, RecordType::Metadata)?;
        let mut json = vec![0u8; header.size as usize];
        reader.read_exact(&mut json).map_err(ContainerError::Io)?;
        let metadata: ContainerMetadata = serde_json::from_slice(&json)
            .map_err(|e| ContainerError::InvalidFormat(format!("bad container metadata: {e}")))?;

        let mut this = McrawReader {
            reader,
            metadata,
            offsets: Vec::new(),
            frame_list: Vec::new(),
            frame_offsets: HashMap::new(),
            audio_offsets: Vec::new(),
            decoder: FrameDecoder::new(),
            scratch: Vec::new(),
        };

        this.read_index()?;
        this.reindex_offsets();
        this.read_extra()?;

        info!(
            "mcraw: {} frames, {} audio chunks indexed",
            this.frame_list.len(),
            this.audio_offsets.len()
        );

        Ok(this)
    }

    /// Timestamps of every indexed frame, in ascending order.
    pub fn frames(&self) -> &[Timestamp] {
        &self.frame_list
    }

    /// The camera/device metadata stored at the front of the container.
    pub fn container_metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    /// Audio sample rate from the container metadata, if recorded.
    pub fn audio_sample_rate_hz(&self) -> Option<u32> {
        self.metadata.audio_sample_rate_hz()
    }

    /// Audio channel count from the container metadata, if recorded.
    pub fn num_audio_channels(&self) -> Option<u16> {
        self.metadata.num_audio_channels()
    }

    /// Locate and read the frame offsets table via the trailing index
    /// record.
    fn read_index(&mut self) -> Result<(), ContainerError> {
        let tail = (RECORD_HEADER_LEN + BUFFER_INDEX_LEN) as i64;
        let index_pos = self
            .reader
            .seek(SeekFrom::End(-tail))
            .map_err(ContainerError::Io)?;

        let header = record::read_record_header(&mut self.reader)?.ok_or_else(|| {
            ContainerError::InvalidFormat("missing trailing buffer index record".into())
        })?;
        if header.kind() != Some(RecordType::BufferIndex) {
            return Err(ContainerError::InvalidFormat(format!(
                "wanted BufferIndex record at end of file, found type {}",
                header.code
            )));
        }

        let index = record::read_buffer_index(&mut self.reader)?;
        if index.magic != INDEX_MAGIC_NUMBER {
            return Err(ContainerError::Corrupted {
                offset: index_pos,
                reason: "buffer index magic mismatch".into(),
            });
        }

        self.reader
            .seek(SeekFrom::Start(index.index_offset as u64))
            .map_err(ContainerError::Io)?;

        let mut offsets = Vec::with_capacity(index.num_offsets as usize);
        for _ in 0..index.num_offsets {
            offsets.push(record::read_buffer_offset(&mut self.reader)?);
        }

        debug!(
            "Buffer index: {} offsets, table at {}",
            offsets.len(),
            index.index_offset
        );
        self.offsets = offsets;
        Ok(())
    }

    /// Order the offsets table by timestamp and rebuild the lookup map.
    fn reindex_offsets(&mut self) {
        // Stable sort keeps duplicate timestamps in file order.
        self.offsets.sort_by_key(|o| o.timestamp);

        self.frame_list.clear();
        self.frame_offsets.clear();
        for o in &self.offsets {
            self.frame_list.push(o.timestamp);
            // First entry wins if a timestamp somehow repeats.
            self.frame_offsets.entry(o.timestamp).or_insert(*o);
        }
    }

    /// Scan the records past the last frame for the audio index.
    fn read_extra(&mut self) -> Result<(), ContainerError> {
        let Some(last) = self.offsets.last() else {
            return Ok(());
        };

        self.reader
            .seek(SeekFrom::Start(last.offset as u64))
            .map_err(ContainerError::Io)?;

        // Anything unrecognized (including the raw offsets table) ends the
        // scan; so does a clean end of file.
        while let Some(header) = record::read_record_header(&mut self.reader)? {
            match header.kind() {
                Some(
                    RecordType::Buffer
                    | RecordType::Metadata
                    | RecordType::AudioData
                    | RecordType::AudioDataMetadata,
                ) => {
                    trace!("Skipping record type {} ({} bytes)", header.code, header.size);
                    self.reader
                        .seek(SeekFrom::Current(header.size as i64))
                        .map_err(ContainerError::Io)?;
                }
                Some(RecordType::AudioIndex) => {
                    let num = self
                        .reader
                        .read_u64::<LittleEndian>()
                        .map_err(ContainerError::Io)?;
                    let mut audio = Vec::with_capacity(num as usize);
                    for _ in 0..num {
                        audio.push(record::read_buffer_offset(&mut self.reader)?);
                    }
                    debug!("Audio index: {} chunks", audio.len());
                    self.audio_offsets = audio;
                }
                Some(RecordType::BufferIndex) | None => break,
            }
        }
        Ok(())
    }

    /// Load and decode the frame captured at `timestamp`.
    ///
    /// `out` is resized to `width * height` samples in row-major order.
    /// Returns the frame's metadata document. Failures leave the reader's
    /// index tables untouched and the reader usable.
    pub fn load_frame(
        &mut self,
        timestamp: Timestamp,
        out: &mut Vec<u16>,
    ) -> Result<FrameMetadata, ContainerError> {
        let entry = *self
            .frame_offsets
            .get(&timestamp)
            .ok_or(ContainerError::NotFound { timestamp })?;

        self.reader
            .seek(SeekFrom::Start(entry.offset as u64))
            .map_err(ContainerError::Io)?;

        let buffer = record::expect_record(&mut self.reader, RecordType::Buffer)?;
        self.scratch.clear();
        self.scratch.resize(buffer.size as usize, 0);
        self.reader
            .read_exact(&mut self.scratch)
            .map_err(ContainerError::Io)?;

        let meta_header = record::expect_record(&mut self.reader, RecordType::Metadata)?;
        let mut json = vec![0u8; meta_header.size as usize];
        self.reader.read_exact(&mut json).map_err(ContainerError::Io)?;
        let metadata: FrameMetadata = serde_json::from_slice(&json)
            .map_err(|e| ContainerError::InvalidFormat(format!("bad frame metadata: {e}")))?;

        if metadata.compression_type != RAW_COMPRESSION_TYPE {
            return Err(ContainerError::InvalidCompression {
                found: metadata.compression_type,
                expected: RAW_COMPRESSION_TYPE,
            });
        }

        let res = metadata.resolution();
        let expected = res.pixel_count() as usize;
        let written =
            self.decoder
                .decode(&self.scratch, res.width as usize, res.height as usize, out)?;
        if written != expected {
            return Err(ContainerError::DecodeFailed {
                expected,
                got: written,
            });
        }

        trace!("Loaded frame {timestamp}: {res}");
        Ok(metadata)
    }

    /// Load every audio chunk in index order.
    pub fn load_audio(&mut self) -> Result<Vec<AudioChunk>, ContainerError> {
        let mut chunks = Vec::with_capacity(self.audio_offsets.len());

        for idx in 0..self.audio_offsets.len() {
            let entry = self.audio_offsets[idx];
            self.reader
                .seek(SeekFrom::Start(entry.offset as u64))
                .map_err(ContainerError::Io)?;

            let data = record::expect_record(&mut self.reader, RecordType::AudioData)?;
            self.scratch.clear();
            self.scratch.resize(data.size as usize, 0);
            self.reader
                .read_exact(&mut self.scratch)
                .map_err(ContainerError::Io)?;

            let mut samples = Vec::with_capacity(self.scratch.len().div_ceil(2));
            let mut pairs = self.scratch.chunks_exact(2);
            for pair in pairs.by_ref() {
                samples.push(i16::from_le_bytes([pair[0], pair[1]]));
            }
            if let [last] = pairs.remainder() {
                samples.push(i16::from_le_bytes([*last, 0]));
            }

            // The metadata record was added after the first release; older
            // recordings end the pair at the audio payload.
            let timestamp = match record::read_record_header(&mut self.reader)? {
                Some(h) if h.kind() == Some(RecordType::AudioDataMetadata) => Timestamp(
                    self.reader
                        .read_i64::<LittleEndian>()
                        .map_err(ContainerError::Io)?,
                ),
                _ => Timestamp::NONE,
            };

            chunks.push(AudioChunk { timestamp, samples });
        }

        debug!("Loaded {} audio chunks", chunks.len());
        Ok(chunks)
    }
}
