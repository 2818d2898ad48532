//! Stream headers of the metadata root.
//!
//! Each header names one stream of the metadata blob (`#~`, `#Pdb`, `#Blob`, `#GUID`, ...)
//! and gives its offset and size relative to the start of the metadata root.

use crate::{file::io::read_le, Result};

/// Stream names a Portable PDB (baseline or delta) may carry.
pub const STREAM_NAMES: [&str; 8] = [
    "#~", "#-", "#Pdb", "#Blob", "#GUID", "#Strings", "#US", "#JTD",
];

/// A stream header, describing one stream of the metadata blob.
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream, at most 32 ASCII characters
    pub name: String,
}

impl StreamHeader {
    /// Reads a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data, or [`crate::Error::Malformed`]
    /// for a stream name that is not part of the Portable PDB format.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let mut name = String::with_capacity(32);
        for counter in 0..std::cmp::min(32, data.len() - 8) {
            let name_char = read_le::<u8>(&data[8 + counter..])?;
            if name_char == 0 {
                break;
            }

            name.push(char::from(name_char));
        }

        if !STREAM_NAMES.iter().any(|valid_name| name == *valid_name) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Number of bytes this header occupies, including the 4-byte aligned name.
    #[must_use]
    pub fn header_size(&self) -> usize {
        8 + (((self.name.len() + 1) + 3) & !3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x50, 0x64, 0x62, 0x00,
        ];

        let parsed_header = StreamHeader::from(&header_bytes).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#Pdb");
        assert_eq!(parsed_header.header_size(), 16);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x24, 0x7E, 0x00,
        ];

        assert!(StreamHeader::from(&header_bytes).is_err());
    }
}
