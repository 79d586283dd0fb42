//! Record-level parsing — file header, typed records, and the trailing
//! index structures.
//!
//! Every multibyte integer in the container is little-endian.

use byteorder::{LittleEndian, ReadBytesExt};
use mcraw_common::{BufferOffset, ContainerError, Timestamp};
use std::io::Read;

/// Identifier at byte 0 of every container.
pub const CONTAINER_ID: [u8; 8] = *b"MCRAW\0\0\0";

/// Container layout version this reader understands.
pub const CONTAINER_VERSION: u32 = 3;

/// Magic value guarding the trailing buffer index.
pub const INDEX_MAGIC_NUMBER: u64 = u64::from_le_bytes(*b"MCRAWIDX");

/// Compression type tag the block codec writes into per-frame metadata.
pub const RAW_COMPRESSION_TYPE: u32 = 7;

/// Byte length of the fixed file header.
pub const FILE_HEADER_LEN: u64 = 12;
/// Byte length of a record header.
pub const RECORD_HEADER_LEN: u64 = 12;
/// Byte length of the `BufferIndex` record payload.
pub const BUFFER_INDEX_LEN: u64 = 24;

/// Typed record kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordType {
    Metadata,
    Buffer,
    BufferIndex,
    AudioData,
    AudioIndex,
    AudioDataMetadata,
}

impl RecordType {
    /// Map an on-disk type code to a known record kind.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Metadata),
            2 => Some(Self::Buffer),
            3 => Some(Self::BufferIndex),
            4 => Some(Self::AudioData),
            5 => Some(Self::AudioIndex),
            6 => Some(Self::AudioDataMetadata),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Metadata => 1,
            Self::Buffer => 2,
            Self::BufferIndex => 3,
            Self::AudioData => 4,
            Self::AudioIndex => 5,
            Self::AudioDataMetadata => 6,
        }
    }
}

/// Header of a typed record: raw type code plus payload length.
#[derive(Copy, Clone, Debug)]
pub struct RecordHeader {
    pub code: u32,
    /// Payload byte length, excluding this 12-byte header.
    pub size: u64,
}

impl RecordHeader {
    /// The known record kind, if the code is one.
    pub fn kind(&self) -> Option<RecordType> {
        RecordType::from_code(self.code)
    }
}

/// The fixed header at the start of the container.
#[derive(Copy, Clone, Debug)]
pub struct FileHeader {
    pub ident: [u8; 8],
    pub version: u32,
}

/// Read and validate the container file header.
pub fn read_file_header<R: Read>(reader: &mut R) -> Result<FileHeader, ContainerError> {
    let mut ident = [0u8; 8];
    reader.read_exact(&mut ident).map_err(ContainerError::Io)?;
    let version = reader
        .read_u32::<LittleEndian>()
        .map_err(ContainerError::Io)?;

    if ident != CONTAINER_ID {
        return Err(ContainerError::InvalidFormat(
            "bad container identifier".into(),
        ));
    }
    if version != CONTAINER_VERSION {
        return Err(ContainerError::InvalidFormat(format!(
            "unsupported container version {version} (expected {CONTAINER_VERSION})"
        )));
    }

    Ok(FileHeader { ident, version })
}

/// Read a record header from the current position. Returns `None` at a
/// clean end of file.
pub fn read_record_header<R: Read>(
    reader: &mut R,
) -> Result<Option<RecordHeader>, ContainerError> {
    let code = match reader.read_u32::<LittleEndian>() {
        Ok(v) => v,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ContainerError::Io(e)),
    };
    let size = reader
        .read_u64::<LittleEndian>()
        .map_err(ContainerError::Io)?;
    Ok(Some(RecordHeader { code, size }))
}

/// Read a record header, requiring it to be of the given kind.
pub fn expect_record<R: Read>(
    reader: &mut R,
    kind: RecordType,
) -> Result<RecordHeader, ContainerError> {
    let header = read_record_header(reader)?.ok_or_else(|| {
        ContainerError::InvalidFormat(format!("unexpected end of file, wanted {kind:?} record"))
    })?;
    if header.kind() != Some(kind) {
        return Err(ContainerError::InvalidFormat(format!(
            "wanted {kind:?} record, found type {}",
            header.code
        )));
    }
    Ok(header)
}

/// Payload of the trailing `BUFFER_INDEX` record.
#[derive(Copy, Clone, Debug)]
pub struct BufferIndex {
    pub magic: u64,
    /// Absolute byte position of the frame offsets table.
    pub index_offset: i64,
    pub num_offsets: u64,
}

/// Read a `BufferIndex` payload from the current position.
pub fn read_buffer_index<R: Read>(reader: &mut R) -> Result<BufferIndex, ContainerError> {
    let magic = reader
        .read_u64::<LittleEndian>()
        .map_err(ContainerError::Io)?;
    let index_offset = reader
        .read_i64::<LittleEndian>()
        .map_err(ContainerError::Io)?;
    let num_offsets = reader
        .read_u64::<LittleEndian>()
        .map_err(ContainerError::Io)?;
    Ok(BufferIndex {
        magic,
        index_offset,
        num_offsets,
    })
}

/// Read one 16-byte offsets-table entry.
pub fn read_buffer_offset<R: Read>(reader: &mut R) -> Result<BufferOffset, ContainerError> {
    let timestamp = reader
        .read_i64::<LittleEndian>()
        .map_err(ContainerError::Io)?;
    let offset = reader
        .read_i64::<LittleEndian>()
        .map_err(ContainerError::Io)?;
    Ok(BufferOffset {
        timestamp: Timestamp(timestamp),
        offset,
    })
}
