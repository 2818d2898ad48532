//! The `#~` (compressed metadata tables) stream.
//!
//! The header lists which tables are present and how many rows each has, followed by the
//! tables themselves laid out back to back in table-number order. Row sizes depend on the
//! heap-size flags and on row counts, so offsets can only be computed for tables whose
//! schema is known.
//!
//! A Portable PDB normally carries only debug tables (0x30 and above), plus `EncLog` and
//! `EncMap` in deltas. Type-system tables in front of them cannot be skipped without their
//! full schema and are reported as [`crate::Error::NotSupported`]. Tables after
//! `MethodDebugInformation` are never read, so their presence is harmless.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{
        read_rows, DocumentRaw, EncMapRaw, MethodDebugInformationRaw, RowReadable, TableId,
        TableInfo, ENC_LOG_ROW_SIZE,
    },
    Error, Result,
};

/// Heap-size flag announcing an additional 4 bytes after the row counts.
const EXTRA_DATA: u8 = 0x40;

/// Parsed `#~` stream header with the offsets of the tables this crate reads.
pub struct TablesHeader<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Heap index width flags
    pub heap_sizes: u8,
    /// Bitmask of present tables
    pub valid: u64,
    /// Bitmask of sorted tables
    pub sorted: u64,
    /// Index widths and row counts
    pub info: TableInfo,
    data: &'a [u8],
    offsets: [usize; 64],
}

impl<'a> TablesHeader<'a> {
    /// Parse the `#~` stream header and locate the supported tables.
    ///
    /// # Arguments
    /// * `data` - The `#~` stream
    /// * `force_large` - `true` if the metadata has a `#JTD` stream, which makes every
    ///   heap and table index 4 bytes wide
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a truncated stream, or
    /// [`crate::Error::NotSupported`] if a type-system table precedes the debug tables.
    pub fn from(data: &'a [u8], force_large: bool) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        let mut offset = 24_usize;
        let mut rows = [0u32; 64];
        for (table, count) in rows.iter_mut().enumerate() {
            if valid & (1 << table) != 0 {
                *count = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes & EXTRA_DATA != 0 {
            read_le_at::<u32>(data, &mut offset)?;
        }

        let info = TableInfo::new(heap_sizes, rows, force_large);
        let mut offsets = [0usize; 64];
        for (table, table_offset) in offsets.iter_mut().enumerate() {
            if valid & (1 << table) == 0 {
                continue;
            }

            #[allow(clippy::cast_possible_truncation)]
            let row_size = match table as u8 {
                0x1E => ENC_LOG_ROW_SIZE,
                0x1F => EncMapRaw::row_size(&info),
                0x30 => DocumentRaw::row_size(&info),
                0x31 => MethodDebugInformationRaw::row_size(&info),
                id if id > 0x31 => break,
                id => {
                    return Err(Error::NotSupported(format!(
                        "metadata table 0x{:02x} in a Portable PDB",
                        id
                    )))
                }
            };

            *table_offset = offset;
            let table_size = (row_size as usize)
                .checked_mul(rows[table] as usize)
                .ok_or_else(|| malformed_error!("Table 0x{:02x} size overflows", table))?;
            offset = offset
                .checked_add(table_size)
                .ok_or_else(|| malformed_error!("Table 0x{:02x} size overflows", table))?;
            if offset > data.len() {
                return Err(out_of_bounds_error!());
            }
        }

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            heap_sizes,
            valid,
            sorted,
            info,
            data,
            offsets,
        })
    }

    /// Number of tables present in the stream.
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Returns `true` if table `id` is present.
    #[must_use]
    pub fn has_table(&self, id: TableId) -> bool {
        self.valid & (1 << id as u64) != 0
    }

    /// Read all rows of the table `T` belongs to; an absent table yields no rows.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the table is truncated.
    pub fn table<T: RowReadable>(&self) -> Result<Vec<T>> {
        if !self.has_table(T::TABLE_ID) {
            return Ok(Vec::new());
        }

        let mut offset = self.offsets[T::TABLE_ID as usize];
        read_rows(self.data, &mut offset, self.info.rows(T::TABLE_ID), &self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x00, 0x00,                         // reserved
            0x02, 0x00,                                     // version 2.0
            0x00, 0x01,                                     // heap sizes, reserved
            0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x03, 0x00, // valid: EncMap, Document, MethodDebugInformation
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // sorted
            0x01, 0x00, 0x00, 0x00,                         // EncMap rows
            0x01, 0x00, 0x00, 0x00,                         // Document rows
            0x02, 0x00, 0x00, 0x00,                         // MethodDebugInformation rows
            0x02, 0x00, 0x00, 0x31,                         // EncMap
            0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, // Document
            0x01, 0x00, 0x05, 0x00,                         // MethodDebugInformation 1
            0x00, 0x00, 0x00, 0x00,                         // MethodDebugInformation 2
        ];

        let header = TablesHeader::from(&data, false).unwrap();
        assert_eq!(header.major_version, 2);
        assert_eq!(header.table_count(), 3);
        assert!(header.has_table(TableId::Document));
        assert!(!header.has_table(TableId::EncLog));

        let map = header.table::<EncMapRaw>().unwrap();
        assert_eq!(map[0].original_token.value(), 0x3100_0002);

        let documents = header.table::<DocumentRaw>().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].language, 2);

        let methods = header.table::<MethodDebugInformationRaw>().unwrap();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].document, 1);
        assert_eq!(methods[0].sequence_points, 5);
        assert_eq!(methods[1].sequence_points, 0);
    }

    #[test]
    fn type_system_tables_not_supported() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // valid: Module
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            TablesHeader::from(&data, false),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn truncated_table() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, // valid: EncMap
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,                         // 2 rows
            0x01, 0x00, 0x00, 0x31,                         // only one present
        ];

        assert!(matches!(
            TablesHeader::from(&data, false),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
