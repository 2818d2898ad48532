//! MethodDebugInformation table (0x31) of the Portable PDB format.
//!
//! Row `n` of a baseline describes `MethodDef` row `n` of the module. In an EnC delta the
//! rows only cover redefined methods and the `EncMap` table says which method each row
//! belongs to.
//!
//! # Reference
//! - [Portable PDB Format - MethodDebugInformation Table](https://github.com/dotnet/runtime/blob/main/docs/design/specs/PortablePdb-Metadata.md#methoddebuginformation-table-0x31)

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        sequencepoints::{SequencePoints, SequencePointsIter},
        streams::Blob,
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Raw MethodDebugInformation row with unresolved heap indices.
#[derive(Clone, Debug)]
pub struct MethodDebugInformationRaw {
    /// 1-based row id
    pub rid: u32,
    /// Token of this row (`0x31xxxxxx`)
    pub token: Token,
    /// Byte offset of the row within the `#~` stream
    pub offset: usize,
    /// Document row, 0 if the method spans several documents or has none
    pub document: u32,
    /// `#Blob` index of the sequence points, 0 if the method has none
    pub sequence_points: u32,
}

impl MethodDebugInformationRaw {
    /// Resolve the sequence point blob of this row into an owned [`MethodDebugInformation`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob index is past the heap.
    pub fn to_owned(&self, blobs: &Blob) -> Result<MethodDebugInformation> {
        let sequence_points = if self.sequence_points == 0 {
            None
        } else {
            Some(blobs.get(self.sequence_points as usize)?.to_vec())
        };

        Ok(MethodDebugInformation {
            rid: self.rid,
            token: self.token,
            document: self.document,
            sequence_points,
        })
    }
}

impl RowReadable for MethodDebugInformationRaw {
    const TABLE_ID: TableId = TableId::MethodDebugInformation;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDebugInformationRaw {
            rid,
            token: Token::from_parts(TableId::MethodDebugInformation, rid),
            offset: *offset,
            document: read_le_at_dyn(data, offset, sizes.is_large(TableId::Document))?,
            sequence_points: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfo) -> u32 {
        u32::from(
            sizes.table_index_bytes(TableId::Document) + // document
            sizes.blob_bytes()                           // sequence_points
        )
    }
}

/// Debug information of one method version, with the sequence point blob resolved.
///
/// The blob is kept encoded. Sequence points are decoded on demand, which keeps a
/// generation's footprint close to the size of its metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDebugInformation {
    /// 1-based row id within the generation that declared it
    pub rid: u32,
    /// Token of the row (`0x31xxxxxx`)
    pub token: Token,
    /// Document row of the generation, 0 if the blob names its initial document
    pub document: u32,
    /// Encoded sequence points, `None` if the method has none
    pub sequence_points: Option<Vec<u8>>,
}

impl MethodDebugInformation {
    /// Debug information for `rid` with an encoded sequence point blob.
    #[must_use]
    pub fn new(rid: u32, document: u32, sequence_points: Option<Vec<u8>>) -> Self {
        MethodDebugInformation {
            rid,
            token: Token::from_parts(TableId::MethodDebugInformation, rid),
            document,
            sequence_points,
        }
    }

    /// The document column as an `Option`, `None` when the column is nil.
    #[must_use]
    pub fn single_document(&self) -> Option<u32> {
        (self.document != 0).then_some(self.document)
    }

    /// Decode the sequence points of this method.
    ///
    /// Returns an empty set if the method has no sequence point blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob is damaged.
    pub fn sequence_points(&self) -> Result<SequencePoints> {
        match &self.sequence_points {
            Some(blob) => SequencePointsIter::new(blob, self.single_document())?.collect(),
            None => Ok(SequencePoints(Vec::new())),
        }
    }

    /// The `StandAloneSig` token of the method's local signature, if it has one.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob header is damaged.
    pub fn local_signature(&self) -> Result<Option<Token>> {
        let Some(blob) = &self.sequence_points else {
            return Ok(None);
        };

        let row = SequencePointsIter::new(blob, self.single_document())?.local_signature();
        Ok((row != 0).then(|| Token::from_parts(TableId::StandAloneSig, row)))
    }
}
