//! Central error types for the reader (thiserror-based).

use thiserror::Error;

use crate::types::Timestamp;

/// Raw codec errors — anything that stops a frame payload from decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Frame payload too short: {len} bytes (header needs {need})")]
    PayloadTooShort { len: usize, need: usize },

    #[error("Sidechannel offset {offset} outside payload of {len} bytes")]
    OffsetOutOfBounds { offset: u32, len: usize },

    #[error("Encoded width {encoded_width} is not a multiple of the block length")]
    UnalignedWidth { encoded_width: u32 },

    #[error("Encoded width {encoded} narrower than declared width {declared}")]
    FrameTooNarrow { encoded: u32, declared: u32 },

    #[error("Sidechannel stream truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("Sidechannel exhausted: tile needs entry {index}, stream holds {available}")]
    MetadataExhausted { index: usize, available: usize },
}

/// Container parsing and loading errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Bad magic, unsupported version, or a record of the wrong type where
    /// a specific one is required.
    #[error("Invalid container: {0}")]
    InvalidFormat(String),

    #[error("Corrupted container at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },

    #[error("No frame with timestamp {timestamp}")]
    NotFound { timestamp: Timestamp },

    #[error("Unsupported compression type {found} (expected {expected})")]
    InvalidCompression { found: u32, expected: u32 },

    #[error("Frame decode produced {got} samples, expected {expected}")]
    DecodeFailed { expected: usize, got: usize },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
