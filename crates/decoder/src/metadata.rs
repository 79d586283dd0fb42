//! Sidechannel stream decoding — per-block bit widths and reference
//! values, themselves compressed with the block codec.

use mcraw_common::DecodeError;

use crate::block::{self, BLOCK_LEN};

/// Byte length of one group header (bit width + reference value).
const GROUP_HEADER_LEN: usize = 2;

/// Decode a complete sidechannel stream starting at `offset` in `input`.
///
/// Layout: `num_values: u32` (little-endian), then for every group of 64
/// values a 2-byte header — the group's bit width in the high nibble of
/// byte 0, and a 12-bit reference in the low nibble plus byte 1 — followed
/// by one block at that width. The reference is added to every decoded
/// value of its group with wrapping u16 arithmetic.
///
/// `out` is left holding exactly `num_values` entries (a trailing partial
/// group is decoded at full width, then truncated). Returns the input
/// offset just past the last consumed byte.
pub fn decode_stream_into(
    input: &[u8],
    mut offset: usize,
    out: &mut Vec<u16>,
) -> Result<usize, DecodeError> {
    if offset + 4 > input.len() {
        return Err(DecodeError::Truncated { offset });
    }
    let num_values = u32::from_le_bytes([
        input[offset],
        input[offset + 1],
        input[offset + 2],
        input[offset + 3],
    ]) as usize;
    offset += 4;

    out.clear();
    out.resize(num_values.div_ceil(BLOCK_LEN) * BLOCK_LEN, 0);

    for group in out.chunks_exact_mut(BLOCK_LEN) {
        if offset + GROUP_HEADER_LEN > input.len() {
            return Err(DecodeError::Truncated { offset });
        }
        let bits = (input[offset] >> 4) as u16;
        let reference = (((input[offset] & 0x0F) as u16) << 8) | input[offset + 1] as u16;
        offset += GROUP_HEADER_LEN;

        offset += block::decode_block(group, bits, input, offset);

        for v in group.iter_mut() {
            *v = v.wrapping_add(reference);
        }
    }

    out.truncate(num_values);
    Ok(offset)
}
