//! Document table (0x30) of the Portable PDB format.
//!
//! Each row describes one source document: its path, the hash of its content and the
//! language it is written in. Paths are not stored as strings but as a blob of path parts
//! joined by a separator, which lets compilers share common directory prefixes.
//!
//! # Reference
//! - [Portable PDB Format - Document Table](https://github.com/dotnet/runtime/blob/main/docs/design/specs/PortablePdb-Metadata.md#document-table-0x30)

use crate::{
    file::{io::read_le_at_dyn, parser::Parser},
    metadata::{
        streams::{Blob, Guid},
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Hash algorithm GUID of SHA-1 document checksums
pub const HASH_SHA1: uguid::Guid = uguid::guid!("ff1816ec-aa5e-4d10-87f7-6f4963833460");
/// Hash algorithm GUID of SHA-256 document checksums
pub const HASH_SHA256: uguid::Guid = uguid::guid!("8829d00f-11b8-4213-878b-770e8597ac16");
/// Language GUID of C# documents
pub const LANGUAGE_CSHARP: uguid::Guid = uguid::guid!("3f5162f8-07c6-11d3-9053-00c04fa302a1");
/// Language GUID of Visual Basic documents
pub const LANGUAGE_VISUAL_BASIC: uguid::Guid =
    uguid::guid!("3a12d0b8-c26c-11d0-b442-00a0244a1dd2");
/// Language GUID of F# documents
pub const LANGUAGE_FSHARP: uguid::Guid = uguid::guid!("ab4f38c9-b6e6-43ba-be3b-58080b2ccce3");

/// Raw Document row with unresolved heap indices.
#[derive(Clone, Debug)]
pub struct DocumentRaw {
    /// 1-based row id
    pub rid: u32,
    /// Token of this row (`0x30xxxxxx`)
    pub token: Token,
    /// Byte offset of the row within the `#~` stream
    pub offset: usize,
    /// `#Blob` index of the document name blob
    pub name: u32,
    /// `#GUID` index of the hash algorithm
    pub hash_algorithm: u32,
    /// `#Blob` index of the hash
    pub hash: u32,
    /// `#GUID` index of the language
    pub language: u32,
}

impl DocumentRaw {
    /// Resolve the heap indices of this row into an owned [`Document`].
    ///
    /// # Errors
    /// Returns an error if a heap index is out of range or the name blob is malformed.
    pub fn to_owned(&self, blobs: &Blob, guids: &Guid) -> Result<Document> {
        Ok(Document {
            rid: self.rid,
            token: self.token,
            name: decode_document_name(blobs, self.name)?,
            hash_algorithm: guids.get(self.hash_algorithm as usize)?,
            hash: blobs.get(self.hash as usize)?.to_vec(),
            language: guids.get(self.language as usize)?,
        })
    }
}

impl RowReadable for DocumentRaw {
    const TABLE_ID: TableId = TableId::Document;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(DocumentRaw {
            rid,
            token: Token::from_parts(TableId::Document, rid),
            offset: *offset,
            name: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            hash_algorithm: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            hash: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            language: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfo) -> u32 {
        u32::from(
            sizes.blob_bytes() +  // name
            sizes.guid_bytes() +  // hash_algorithm
            sizes.blob_bytes() +  // hash
            sizes.guid_bytes()    // language
        )
    }
}

/// A source document of one generation, with all heap data resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// 1-based row id within the generation that declared it
    pub rid: u32,
    /// Token of the row (`0x30xxxxxx`)
    pub token: Token,
    /// Full document path, as emitted by the compiler
    pub name: String,
    /// GUID of the checksum algorithm, nil if the document has no checksum
    pub hash_algorithm: uguid::Guid,
    /// Checksum of the document content
    pub hash: Vec<u8>,
    /// GUID of the source language
    pub language: uguid::Guid,
}

impl Document {
    /// A C# document named `name` without a checksum.
    #[must_use]
    pub fn new(rid: u32, name: impl Into<String>) -> Self {
        Document {
            rid,
            token: Token::from_parts(TableId::Document, rid),
            name: name.into(),
            hash_algorithm: uguid::Guid::ZERO,
            hash: Vec::new(),
            language: LANGUAGE_CSHARP,
        }
    }
}

/// Decode a Portable PDB document name blob.
///
/// The blob starts with a separator character followed by compressed `#Blob` indices of
/// UTF-8 encoded parts. A separator of 0 joins the parts without a separator, a part index
/// of 0 is an empty part.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a non-ASCII separator or a part that is not
/// valid UTF-8.
pub fn decode_document_name(blobs: &Blob, index: u32) -> Result<String> {
    let data = blobs.get(index as usize)?;
    if data.is_empty() {
        return Ok(String::new());
    }

    let mut parser = Parser::new(data);
    let separator = parser.read_le::<u8>()?;
    if !separator.is_ascii() {
        return Err(malformed_error!(
            "Document name separator is not ASCII - {}",
            separator
        ));
    }

    let mut name = String::new();
    let mut first = true;
    while parser.has_more_data() {
        if !first && separator != 0 {
            name.push(char::from(separator));
        }
        first = false;

        let part_index = parser.read_compressed_uint()?;
        if part_index == 0 {
            continue;
        }

        let part = blobs.get(part_index as usize)?;
        match std::str::from_utf8(part) {
            Ok(part) => name.push_str(part),
            Err(_) => {
                return Err(malformed_error!(
                    "Document name part {} is not valid UTF-8",
                    part_index
                ))
            }
        }
    }

    Ok(name)
}
