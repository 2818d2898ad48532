//! Portable PDB metadata tables consumed by the symbol store.
//!
//! Only the tables that carry document and method debug identity are materialized:
//!
//! - [`Document`] (0x30) - source documents with name, hash and language
//! - [`MethodDebugInformation`] (0x31) - per-method sequence point blobs
//! - [`EncMapRaw`] (0x1F) - the ordered list of rows an Edit-and-Continue delta redefines
//!
//! Every table follows the dual-representation pattern: a `*Raw` row with unresolved heap
//! indices read by [`RowReadable`], and an owned variant with resolved heap data.
//!
//! # References
//!
//! - [Portable PDB Format](https://github.com/dotnet/runtime/blob/main/docs/design/specs/PortablePdb-Metadata.md)
//! - ECMA-335, Partition II, Section 22

mod document;
mod encmap;
mod methoddebuginformation;

pub use document::*;
pub use encmap::*;
pub use methoddebuginformation::*;

use crate::Result;

/// Identifiers of the metadata tables this crate knows about.
///
/// The discriminant is the ECMA-335 / Portable PDB table number, which is also the high byte
/// of a [`crate::metadata::token::Token`] referencing the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TableId {
    /// `MethodDef` (0x06), referenced by method debug tokens in the type-system metadata
    MethodDef = 0x06,
    /// `StandAloneSig` (0x11), referenced by the local signature of a sequence points blob
    StandAloneSig = 0x11,
    /// `EncLog` (0x1E)
    EncLog = 0x1E,
    /// `EncMap` (0x1F)
    EncMap = 0x1F,
    /// `Document` (0x30)
    Document = 0x30,
    /// `MethodDebugInformation` (0x31)
    MethodDebugInformation = 0x31,
}

/// Heap index widths and table row counts of one `#~` stream.
///
/// Row sizes of every table depend on whether heap indices and table indices need 2 or 4
/// bytes. `TableInfo` answers those questions for the row readers.
#[derive(Clone, Debug)]
pub struct TableInfo {
    rows: [u32; 64],
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
    force_large: bool,
}

impl TableInfo {
    /// Creates a new `TableInfo` from the heap-size flags and row counts of a `#~` stream.
    ///
    /// # Arguments
    /// * `heap_sizes` - The `HeapSizes` byte of the tables header
    /// * `rows` - Row counts indexed by table number (absent tables have 0 rows)
    /// * `force_large` - Minimal EnC deltas (`#JTD` present) use 4-byte indices throughout
    #[must_use]
    pub fn new(heap_sizes: u8, rows: [u32; 64], force_large: bool) -> Self {
        TableInfo {
            rows,
            is_large_index_str: force_large || heap_sizes & 0x01 == 0x01,
            is_large_index_guid: force_large || heap_sizes & 0x02 == 0x02,
            is_large_index_blob: force_large || heap_sizes & 0x04 == 0x04,
            force_large,
        }
    }

    /// Number of rows of table `id`.
    #[must_use]
    pub fn rows(&self, id: TableId) -> u32 {
        self.rows[id as usize]
    }

    /// Returns `true` if an index into table `id` needs 4 bytes.
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.force_large || self.rows[id as usize] > u32::from(u16::MAX)
    }

    /// Returns `true` if `#Strings` indices need 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Returns `true` if `#GUID` indices need 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Returns `true` if `#Blob` indices need 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width in bytes of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width in bytes of an index into table `id`.
    #[must_use]
    pub fn table_index_bytes(&self, id: TableId) -> u8 {
        if self.is_large(id) {
            4
        } else {
            2
        }
    }
}

impl Default for TableInfo {
    fn default() -> Self {
        TableInfo::new(0, [0u32; 64], false)
    }
}

/// A table row that can be read from the `#~` stream.
pub trait RowReadable: Sized {
    /// The table this row type belongs to.
    const TABLE_ID: TableId;

    /// Reads one row at `offset`, advancing it past the row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row is truncated.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self>;

    /// Size in bytes of one row.
    fn row_size(sizes: &TableInfo) -> u32;
}

/// Reads `count` consecutive rows starting at `offset`, advancing it past the table.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the table is truncated.
pub fn read_rows<T: RowReadable>(
    data: &[u8],
    offset: &mut usize,
    count: u32,
    sizes: &TableInfo,
) -> Result<Vec<T>> {
    let mut rows = Vec::with_capacity(count as usize);
    for rid in 1..=count {
        rows.push(T::row_read(data, offset, rid, sizes)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_widths() {
        let mut rows = [0u32; 64];
        rows[TableId::Document as usize] = 0x1_0000;
        rows[TableId::MethodDebugInformation as usize] = 3;

        let sizes = TableInfo::new(0x04, rows, false);
        assert!(sizes.is_large(TableId::Document));
        assert!(!sizes.is_large(TableId::MethodDebugInformation));
        assert!(sizes.is_large_blob());
        assert!(!sizes.is_large_guid());
        assert!(!sizes.is_large_str());
        assert_eq!(sizes.blob_bytes(), 4);
        assert_eq!(sizes.guid_bytes(), 2);
        assert_eq!(sizes.rows(TableId::MethodDebugInformation), 3);

        let forced = TableInfo::new(0, [0u32; 64], true);
        assert_eq!(forced.table_index_bytes(TableId::Document), 4);
        assert_eq!(forced.guid_bytes(), 4);
    }
}
