//! Frame decoding — drives the block codec across a frame's tile grid and
//! reassembles row-major pixel output.

use mcraw_common::DecodeError;
use tracing::trace;

use crate::block::{self, BLOCK_LEN};
use crate::metadata;

/// Byte length of the header at the start of every frame payload.
pub const FRAME_HEADER_LEN: usize = 16;

/// Rows reconstructed per tile.
const TILE_ROWS: usize = 4;

/// The 16-byte header at the start of a frame payload.
///
/// The pixel block stream follows immediately at byte 16; the two
/// sidechannel streams sit at the recorded offsets.
#[derive(Copy, Clone, Debug)]
pub struct FrameHeader {
    /// Width of the encoded area; always a multiple of 64.
    pub encoded_width: u32,
    /// Height of the encoded area; always a multiple of 4.
    pub encoded_height: u32,
    /// Payload offset of the bit-width sidechannel.
    pub bits_offset: u32,
    /// Payload offset of the reference-value sidechannel.
    pub refs_offset: u32,
}

impl FrameHeader {
    /// Parse the header from the front of a frame payload.
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < FRAME_HEADER_LEN {
            return Err(DecodeError::PayloadTooShort {
                len: payload.len(),
                need: FRAME_HEADER_LEN,
            });
        }
        let b = payload;
        Ok(Self {
            encoded_width: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            encoded_height: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            bits_offset: u32::from_le_bytes([b[8], b[9], b[10], b[11]]),
            refs_offset: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
        })
    }
}

/// Reusable frame decoding context.
///
/// Owns the decompressed sidechannels and the four-row reconstruction
/// window so repeated decodes don't reallocate. Not meant to be shared
/// across threads; one decoder per reader.
#[derive(Default)]
pub struct FrameDecoder {
    bits: Vec<u16>,
    refs: Vec<u16>,
    rows: [Vec<u16>; TILE_ROWS],
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame payload into `out`.
    ///
    /// `out` is resized to `width * height` samples and filled row-major,
    /// cropped from the encoded dimensions to the declared ones. Returns
    /// the number of samples written, which for a well-formed payload is
    /// exactly `width * height`.
    pub fn decode(
        &mut self,
        payload: &[u8],
        width: usize,
        height: usize,
        out: &mut Vec<u16>,
    ) -> Result<usize, DecodeError> {
        let header = FrameHeader::parse(payload)?;

        let len = payload.len();
        if header.bits_offset as usize > len {
            return Err(DecodeError::OffsetOutOfBounds {
                offset: header.bits_offset,
                len,
            });
        }
        if header.refs_offset as usize > len {
            return Err(DecodeError::OffsetOutOfBounds {
                offset: header.refs_offset,
                len,
            });
        }

        let encoded_width = header.encoded_width as usize;
        let encoded_height = header.encoded_height as usize;
        if encoded_width % BLOCK_LEN != 0 {
            return Err(DecodeError::UnalignedWidth {
                encoded_width: header.encoded_width,
            });
        }
        if encoded_width < width {
            return Err(DecodeError::FrameTooNarrow {
                encoded: header.encoded_width,
                declared: width as u32,
            });
        }

        trace!(
            "Decoding frame: {}x{} declared, {}x{} encoded",
            width,
            height,
            encoded_width,
            encoded_height
        );

        metadata::decode_stream_into(payload, header.bits_offset as usize, &mut self.bits)?;
        metadata::decode_stream_into(payload, header.refs_offset as usize, &mut self.refs)?;

        for row in self.rows.iter_mut() {
            row.clear();
            row.resize(encoded_width, 0);
        }

        out.clear();
        out.resize(width * height, 0);

        // Pixel blocks start right after the payload header.
        let mut offset = FRAME_HEADER_LEN;
        let mut meta_idx = 0;
        let mut out_row = 0;
        let mut p = [[0u16; BLOCK_LEN]; 4];

        let mut y = 0;
        while y < encoded_height && out_row < height {
            for x in (0..encoded_width).step_by(BLOCK_LEN) {
                if meta_idx + 4 > self.bits.len() || meta_idx + 4 > self.refs.len() {
                    return Err(DecodeError::MetadataExhausted {
                        index: meta_idx,
                        available: self.bits.len().min(self.refs.len()),
                    });
                }
                let b = [
                    self.bits[meta_idx],
                    self.bits[meta_idx + 1],
                    self.bits[meta_idx + 2],
                    self.bits[meta_idx + 3],
                ];
                let r = [
                    self.refs[meta_idx],
                    self.refs[meta_idx + 1],
                    self.refs[meta_idx + 2],
                    self.refs[meta_idx + 3],
                ];
                meta_idx += 4;

                for (block, &bits) in p.iter_mut().zip(&b) {
                    offset += block::decode_block(block, bits, payload, offset);
                }

                // Reassemble the 4x64 tile: blocks 0/1 hold the even/odd
                // columns of rows 0 and 2, blocks 2/3 those of rows 1 and 3.
                let [row0, row1, row2, row3] = &mut self.rows;
                for i in (0..BLOCK_LEN).step_by(2) {
                    let j = i / 2;
                    row0[x + i] = p[0][j].wrapping_add(r[0]);
                    row0[x + i + 1] = p[1][j].wrapping_add(r[1]);
                    row1[x + i] = p[2][j].wrapping_add(r[2]);
                    row1[x + i + 1] = p[3][j].wrapping_add(r[3]);
                    row2[x + i] = p[0][BLOCK_LEN / 2 + j].wrapping_add(r[0]);
                    row2[x + i + 1] = p[1][BLOCK_LEN / 2 + j].wrapping_add(r[1]);
                    row3[x + i] = p[2][BLOCK_LEN / 2 + j].wrapping_add(r[2]);
                    row3[x + i + 1] = p[3][BLOCK_LEN / 2 + j].wrapping_add(r[3]);
                }
            }

            // Emit the tile's rows, cropped to the declared width. Encoded
            // rows past the declared height are vertical padding.
            for row in self.rows.iter() {
                if out_row >= height {
                    break;
                }
                out[out_row * width..(out_row + 1) * width].copy_from_slice(&row[..width]);
                out_row += 1;
            }

            y += TILE_ROWS;
        }

        Ok(out_row * width)
    }
}
