//! The `#GUID` heap.
//!
//! A plain array of 16-byte GUIDs addressed by a 1-based index; index 0 means "no GUID".
//! Portable PDB documents reference it for their hash algorithm and language.

use crate::Result;

/// Read-only view over the `#GUID` heap of one generation.
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a `Guid` heap view from a byte slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap length is not a multiple of 16.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "Size of #GUID heap is not a multiple of 16 - {}",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// An empty heap, used when a generation carries no `#GUID` stream.
    #[must_use]
    pub fn empty() -> Guid<'static> {
        Guid { data: &[] }
    }

    /// Number of GUIDs on the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / 16
    }

    /// Returns `true` if the heap holds no GUIDs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the GUID at the 1-based `index`; index 0 yields the nil GUID.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the last GUID.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index == 0 {
            return Ok(uguid::Guid::ZERO);
        }

        if index > self.len() {
            return Err(out_of_bounds_error!());
        }

        let offset_start = (index - 1) * 16;
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[offset_start..offset_start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}
