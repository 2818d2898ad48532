//! The `#Pdb` stream of a Portable PDB.
//!
//! Carries the PDB id that ties the symbol file to its module, the entry point, and the row
//! counts of the type-system tables that live in the module's own metadata. Only baselines
//! carry this stream; EnC deltas omit it.

use crate::{
    file::io::read_le_at,
    metadata::{tables::TableId, token::Token},
    Result,
};

/// Parsed `#Pdb` stream header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdbStream {
    /// 20-byte PDB id (GUID followed by a timestamp)
    pub id: [u8; 20],
    /// `MethodDef` token of the entry point, or the null token
    pub entry_point: Token,
    /// Bitmask of type-system tables present in the module metadata
    pub referenced_type_system_tables: u64,
    /// Row counts of the referenced type-system tables, indexed by table number
    pub type_system_table_rows: [u32; 64],
}

impl PdbStream {
    /// Parse the `#Pdb` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream is truncated, or
    /// [`crate::Error::Malformed`] for an entry point that is not a `MethodDef` token.
    pub fn from(data: &[u8]) -> Result<PdbStream> {
        if data.len() < 32 {
            return Err(out_of_bounds_error!());
        }

        let mut id = [0u8; 20];
        id.copy_from_slice(&data[..20]);

        let mut offset = 20;
        let entry_point = Token::new(read_le_at::<u32>(data, &mut offset)?);
        if !entry_point.is_null() && !entry_point.is_table(TableId::MethodDef) {
            return Err(malformed_error!(
                "#Pdb entry point is not a MethodDef token - {}",
                entry_point
            ));
        }

        let referenced_type_system_tables = read_le_at::<u64>(data, &mut offset)?;
        let mut type_system_table_rows = [0u32; 64];
        for (table, rows) in type_system_table_rows.iter_mut().enumerate() {
            if referenced_type_system_tables & (1 << table) != 0 {
                *rows = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        Ok(PdbStream {
            id,
            entry_point,
            referenced_type_system_tables,
            type_system_table_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A,
            0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, // id
            0x02, 0x00, 0x00, 0x06,                                     // entry point
            0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,             // MethodDef referenced
            0x07, 0x00, 0x00, 0x00,                                     // 7 MethodDef rows
        ];

        let pdb = PdbStream::from(&data).unwrap();
        assert_eq!(pdb.id[0], 0x01);
        assert_eq!(pdb.id[19], 0x14);
        assert_eq!(pdb.entry_point, Token::new(0x0600_0002));
        assert_eq!(pdb.type_system_table_rows[TableId::MethodDef as usize], 7);
    }

    #[test]
    fn invalid_entry_point() {
        let mut data = [0u8; 32];
        data[23] = 0x30;
        assert!(matches!(
            PdbStream::from(&data),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn truncated_row_counts() {
        let mut data = [0u8; 32];
        data[24] = 0x01;
        assert!(matches!(
            PdbStream::from(&data),
            Err(crate::Error::OutOfBounds { .. })
        ));
    }
}
