//! The metadata root, the entry point into a Portable PDB blob.
//!
//! The root carries the `BSJB` signature, a version string and the stream headers that
//! locate every other part of the metadata.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::{StreamHeader, STREAM_NAMES},
    Result,
};

/// Magic signature of a metadata root, `BSJB` in little-endian order
pub const METADATA_ROOT_MAGIC: u32 = 0x424A_5342;

/// The metadata root of one generation.
pub struct Root {
    /// Magic signature, always [`METADATA_ROOT_MAGIC`]
    pub signature: u32,
    /// Major version, 1
    pub major_version: u16,
    /// Minor version, 1
    pub minor_version: u16,
    /// Reserved, always 0
    pub reserved: u32,
    /// Length of the version string including padding
    pub length: u32,
    /// Version string, `PDB v1.0` for Portable PDBs
    pub version: String,
    /// Reserved flags, always 0
    pub flags: u16,
    /// Number of streams
    pub stream_number: u16,
    /// Headers of all streams
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data, or [`crate::Error::Malformed`]
    /// for a bad signature, a stream count of zero or stream ranges outside of `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != METADATA_ROOT_MAGIC {
            return Err(malformed_error!(
                "Metadata root signature does not match - 0x{:08x}",
                signature
            ));
        }

        let version_string_length = read_le_at::<u32>(data, &mut 12)? as usize;
        let Some(version_end) = version_string_length.checked_add(16) else {
            return Err(malformed_error!(
                "Version string length causing integer overflow - {}",
                version_string_length
            ));
        };
        if version_end + 4 > data.len() {
            return Err(out_of_bounds_error!());
        }

        let version = data[16..version_end]
            .iter()
            .take_while(|byte| **byte != 0)
            .map(|byte| char::from(*byte))
            .collect::<String>();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count as usize > STREAM_NAMES.len() {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut streams = Vec::with_capacity(stream_count as usize);
        let mut stream_offset = version_end + 4;
        for _ in 0..stream_count {
            if stream_offset >= data.len() {
                return Err(out_of_bounds_error!());
            }

            let new_stream = StreamHeader::from(&data[stream_offset..])?;
            match new_stream.offset.checked_add(new_stream.size) {
                Some(range) if range as usize <= data.len() => {}
                Some(_) => return Err(out_of_bounds_error!()),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        new_stream.offset,
                        new_stream.size
                    ))
                }
            }

            if streams
                .iter()
                .any(|stream: &StreamHeader| stream.name == new_stream.name)
            {
                return Err(malformed_error!("Duplicate stream - {}", new_stream.name));
            }

            stream_offset += new_stream.header_size();
            streams.push(new_stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            reserved: read_le::<u32>(&data[8..])?,
            length: u32::try_from(version_string_length)
                .map_err(|_| malformed_error!("Version string length too large"))?,
            version,
            flags,
            stream_number: stream_count,
            stream_headers: streams,
        })
    }

    /// The bytes of stream `name`, if the metadata has it.
    #[must_use]
    pub fn stream<'a>(&self, data: &'a [u8], name: &str) -> Option<&'a [u8]> {
        self.stream_headers
            .iter()
            .find(|header| header.name == name)
            .and_then(|header| {
                let start = header.offset as usize;
                data.get(start..start + header.size as usize)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            b'P', b'D', b'B', b' ', b'v', b'1', b'.', b'0',
            0x00, 0x00,
            0x02, 0x00,
            0x38, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, b'#', b'~', 0x00, 0x00,
            0x3C, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, b'#', b'B', b'l', b'o', b'b', 0x00, 0x00, 0x00,
            0xAA, 0xBB, 0xCC, 0xDD,
            0x00, 0x01, 0x02, 0x03,
        ];

        let root = Root::read(&header_bytes).unwrap();

        assert_eq!(root.signature, METADATA_ROOT_MAGIC);
        assert_eq!(root.major_version, 1);
        assert_eq!(root.version, "PDB v1.0");
        assert_eq!(root.stream_number, 2);
        assert_eq!(root.stream_headers[1].name, "#Blob");
        assert_eq!(
            root.stream(&header_bytes, "#~"),
            Some(&[0xAA, 0xBB, 0xCC, 0xDD][..])
        );
        assert_eq!(
            root.stream(&header_bytes, "#Blob"),
            Some(&[0x00, 0x01, 0x02, 0x03][..])
        );
        assert_eq!(root.stream(&header_bytes, "#GUID"), None);
    }

    #[test]
    fn bad_signature() {
        let mut data = [0u8; 32];
        data[0] = 0x42;
        assert!(matches!(
            Root::read(&data),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn stream_out_of_range() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42, 0x01, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            b'v', b'1', 0x00, 0x00,
            0x00, 0x00, 0x01, 0x00,
            0x20, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, b'#', b'~', 0x00, 0x00,
        ];

        assert!(matches!(
            Root::read(&header_bytes),
            Err(crate::Error::OutOfBounds { .. })
        ));
    }
}
