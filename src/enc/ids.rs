//! Durable identities of documents and methods.
//!
//! Row numbers of a single generation are only meaningful inside that generation: a delta
//! numbers its Document and MethodDebugInformation rows from 1 again. The ids here are
//! assigned once per session and keep their meaning across every later generation.

use std::fmt;

use crate::metadata::{tables::TableId, token::Token};

/// Session-wide identity of a source document, assigned from 1 in order of first appearance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(u32);

impl DocumentId {
    /// Creates a document id from its 1-based value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        DocumentId(value)
    }

    /// The 1-based value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document #{}", self.0)
    }
}

/// Session-wide identity of a method: its `MethodDef` row in the module.
///
/// The baseline's MethodDebugInformation row `n` belongs to `MethodDef` row `n`; deltas name
/// the method of each of their rows through the EncMap. Either way the id is the same row
/// number for the lifetime of the session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(u32);

impl MethodId {
    /// Creates a method id from its `MethodDef` row.
    #[must_use]
    pub const fn new(row: u32) -> Self {
        MethodId(row)
    }

    /// The `MethodDef` row.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// The `MethodDef` token of this method.
    #[must_use]
    pub fn token(self) -> Token {
        Token::from_parts(TableId::MethodDef, self.0)
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({})", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method {}", self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_token() {
        let method = MethodId::new(0x2A);
        assert_eq!(method.token().value(), 0x0600_002A);
        assert_eq!(method.to_string(), "method 0x0600002a");
        assert_eq!(format!("{:?}", method), "MethodId(42)");
    }

    #[test]
    fn document_index() {
        assert_eq!(DocumentId::new(1).index(), 0);
        assert_eq!(DocumentId::new(7).value(), 7);
        assert_eq!(DocumentId::new(3).to_string(), "document #3");
        assert!(DocumentId::new(1) < DocumentId::new(2));
    }
}
