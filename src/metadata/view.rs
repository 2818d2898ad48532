//! The per-generation metadata view.
//!
//! [`GenerationMetadata`] is everything the EnC session needs from one baseline or delta:
//! its documents, its method debug records and, for deltas, the ordered tokens of the
//! MethodDebugInformation rows it redefines. How the view is produced is left to a
//! [`MetadataReader`]; [`crate::metadata::reader::PortablePdbReader`] reads it from a
//! Portable PDB blob.

use crate::{
    metadata::{
        streams::PdbStream,
        tables::{Document, MethodDebugInformation, TableId},
        token::Token,
    },
    Result,
};

/// Owned metadata of one generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationMetadata {
    /// The `#Pdb` stream, present in baselines only
    pub pdb: Option<PdbStream>,
    /// Document rows, row `n` at index `n - 1`
    pub documents: Vec<Document>,
    /// MethodDebugInformation rows, row `n` at index `n - 1`
    pub method_debug_information: Vec<MethodDebugInformation>,
    /// EncMap tokens, in table order; empty for a baseline
    pub enc_map: Vec<Token>,
}

impl GenerationMetadata {
    /// Document row `rid`.
    #[must_use]
    pub fn document(&self, rid: u32) -> Option<&Document> {
        rid.checked_sub(1)
            .and_then(|index| self.documents.get(index as usize))
    }

    /// MethodDebugInformation row `rid`.
    #[must_use]
    pub fn method_debug(&self, rid: u32) -> Option<&MethodDebugInformation> {
        rid.checked_sub(1)
            .and_then(|index| self.method_debug_information.get(index as usize))
    }

    /// The EncMap entries that refer to MethodDebugInformation rows, in map order.
    ///
    /// Entry `i` names the method that local MethodDebugInformation row `i + 1` belongs to.
    pub fn method_debug_tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.enc_map
            .iter()
            .copied()
            .filter(|token| token.is_table(TableId::MethodDebugInformation))
    }
}

/// Produces the metadata view of one generation from its serialized form.
///
/// The session only depends on this trait, so tests and hosts that already have parsed
/// metadata can plug in their own source.
pub trait MetadataReader {
    /// Parse `data` into the view of one generation.
    ///
    /// # Errors
    /// Returns an error if `data` is not valid metadata.
    fn read(&self, data: &[u8]) -> Result<GenerationMetadata>;
}

impl<F> MetadataReader for F
where
    F: Fn(&[u8]) -> Result<GenerationMetadata>,
{
    fn read(&self, data: &[u8]) -> Result<GenerationMetadata> {
        self(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_one_based() {
        let view = GenerationMetadata {
            documents: vec![Document::new(1, "/src/A.cs"), Document::new(2, "/src/B.cs")],
            method_debug_information: vec![MethodDebugInformation::new(1, 1, None)],
            ..Default::default()
        };

        assert_eq!(view.document(0), None);
        assert_eq!(view.document(2).map(|d| d.name.as_str()), Some("/src/B.cs"));
        assert_eq!(view.document(3), None);
        assert_eq!(view.method_debug(1).map(|m| m.rid), Some(1));
        assert_eq!(view.method_debug(2), None);
    }

    #[test]
    fn method_debug_tokens_filter_enc_map() {
        let view = GenerationMetadata {
            enc_map: vec![
                Token::new(0x0600_0004),
                Token::new(0x3000_0001),
                Token::new(0x3100_0004),
                Token::new(0x3100_0009),
            ],
            ..Default::default()
        };

        let tokens: Vec<u32> = view.method_debug_tokens().map(|t| t.row()).collect();
        assert_eq!(tokens, vec![4, 9]);
    }

    #[test]
    fn closures_are_readers() {
        let reader = |_: &[u8]| -> Result<GenerationMetadata> { Ok(GenerationMetadata::default()) };
        assert_eq!(reader.read(&[]).unwrap(), GenerationMetadata::default());
    }
}
