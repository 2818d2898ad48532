//! ECMA-335 II.23.2 compressed integer encoders.

use crate::Result;

const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;

/// Appends `value` to `buffer` as a compressed unsigned integer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` exceeds `0x1FFF_FFFF`, the largest
/// value the encoding can represent.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    if value <= 0x7F {
        #[allow(clippy::cast_possible_truncation)]
        buffer.push(value as u8);
    } else if value <= 0x3FFF {
        #[allow(clippy::cast_possible_truncation)]
        buffer.extend_from_slice(&(0x8000 | value as u16).to_be_bytes());
    } else if value <= MAX_COMPRESSED_UINT {
        buffer.extend_from_slice(&(0xC000_0000 | value).to_be_bytes());
    } else {
        return Err(malformed_error!(
            "Value {:#x} cannot be encoded as a compressed uint",
            value
        ));
    }

    Ok(())
}

/// Appends `value` to `buffer` as a compressed signed integer.
///
/// The narrowest encoding whose range holds `value` is chosen: 1 byte for
/// `-2^6..2^6`, 2 bytes for `-2^13..2^13` and 4 bytes for `-2^28..2^28`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` lies outside `-2^28..2^28`.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn write_compressed_int(value: i32, buffer: &mut Vec<u8>) -> Result<()> {
    const B6: i32 = (1 << 6) - 1;
    const B13: i32 = (1 << 13) - 1;
    const B28: i32 = (1 << 28) - 1;

    // All ones for negative numbers, zero otherwise
    let sign_mask = value >> 31;

    if (value & !B6) == (sign_mask & !B6) {
        let n = ((value & B6) << 1) | (sign_mask & 1);
        buffer.push(n as u8);
    } else if (value & !B13) == (sign_mask & !B13) {
        let n = ((value & B13) << 1) | (sign_mask & 1);
        buffer.extend_from_slice(&(0x8000 | n as u16).to_be_bytes());
    } else if (value & !B28) == (sign_mask & !B28) {
        let n = ((value & B28) << 1) | (sign_mask & 1);
        buffer.extend_from_slice(&(0xC000_0000 | n as u32).to_be_bytes());
    } else {
        return Err(malformed_error!(
            "Value {} cannot be encoded as a compressed int",
            value
        ));
    }

    Ok(())
}
