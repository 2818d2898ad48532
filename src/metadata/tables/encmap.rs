//! EncMap table (0x1F) of Edit-and-Continue deltas.
//!
//! Each row holds the token of a row the delta adds or redefines, in the order the delta's
//! own rows appear. For the MethodDebugInformation table, entry `i` of the map names the
//! method that local row `i` belongs to.
//!
//! # Reference
//! - ECMA-335, Partition II, Section 22 (EncMap is reserved for Edit-and-Continue)

use crate::{
    file::io::read_le_at,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// One EncMap row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncMapRaw {
    /// 1-based row id
    pub rid: u32,
    /// Byte offset of the row within the `#~` stream
    pub offset: usize,
    /// Token of the row the delta defines
    pub original_token: Token,
}

impl RowReadable for EncMapRaw {
    const TABLE_ID: TableId = TableId::EncMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, _sizes: &TableInfo) -> Result<Self> {
        Ok(EncMapRaw {
            rid,
            offset: *offset,
            original_token: Token::new(read_le_at::<u32>(data, offset)?),
        })
    }

    fn row_size(_sizes: &TableInfo) -> u32 {
        4
    }
}

/// Size of one EncLog row: a token followed by a function code.
pub const ENC_LOG_ROW_SIZE: u32 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = vec![
            0x05, 0x00, 0x00, 0x31, // MethodDebugInformation row 5
            0x01, 0x00, 0x00, 0x30, // Document row 1
        ];

        let sizes = TableInfo::default();
        let rows = crate::metadata::tables::read_rows::<EncMapRaw>(&data, &mut 0, 2, &sizes)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].original_token, Token::new(0x3100_0005));
        assert_eq!(rows[1].rid, 2);
        assert_eq!(rows[1].offset, 4);
        assert_eq!(rows[1].original_token.row(), 1);

        assert!(crate::metadata::tables::read_rows::<EncMapRaw>(&data, &mut 0, 3, &sizes).is_err());
    }
}
