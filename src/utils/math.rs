//! Mathematical utility functions.

use crate::Result;

/// Converts a `usize` to `u32` for metadata serialization, returning an error if the value
/// exceeds `u32::MAX`. All Portable PDB structures are bounded well below this limit.
///
/// # Errors
///
/// Returns an error if `value` exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed_error!("Value {value} exceeds u32::MAX"))
}
