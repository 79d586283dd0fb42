//! `mcraw-demux` — Reader for the `.mcraw` raw-video container.
//!
//! A recording is a sequentially written stream of typed records: a JSON
//! camera-metadata document, interleaved frame buffer/metadata pairs and
//! optional audio chunks, an optional audio index, and a trailing buffer
//! index that points back at the frame offsets table. [`McrawReader`]
//! parses that structure once at open and then loads frames and audio by
//! timestamp through seeks.

pub mod metadata;
pub mod reader;
pub mod record;

pub use metadata::{ContainerMetadata, ExtraData, FrameMetadata};
pub use reader::McrawReader;
pub use record::{
    RecordHeader, RecordType, CONTAINER_ID, CONTAINER_VERSION, INDEX_MAGIC_NUMBER,
    RAW_COMPRESSION_TYPE,
};
