//! `mcraw-decoder` — The raw-pixel codec for `.mcraw` recordings.
//!
//! Frames are stored as 4-row x 64-column tiles of Bayer samples. Each tile
//! is decoded from four 64-element blocks, every block packed at its own bit
//! width with an additive per-block reference value. The widths and
//! references live in two compressed sidechannels that reuse the same block
//! codec.
//!
//! ## Module Overview
//!
//! - [`block`] — unpack one 64-element block at a fixed bit width
//! - [`metadata`] — decode the self-describing sidechannel streams
//! - [`frame`] — drive the tile grid and reassemble row-major output

pub mod block;
pub mod frame;
pub mod metadata;

// Re-export primary types at crate root.
pub use block::{block_byte_len, decode_block, BLOCK_LEN};
pub use frame::{FrameDecoder, FrameHeader, FRAME_HEADER_LEN};
pub use metadata::decode_stream_into;
