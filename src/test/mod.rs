//! Builders for the metadata used across unit tests.

use crate::metadata::{
    sequencepoints::{SequencePoint, SequencePointsBlob},
    tables::Document,
    view::GenerationMetadata,
};

/// A generation declaring only `paths`, as Document rows 1..n.
pub fn documents_only(paths: &[&str]) -> GenerationMetadata {
    GenerationMetadata {
        documents: paths
            .iter()
            .zip(1..)
            .map(|(path, rid)| Document::new(rid, *path))
            .collect(),
        ..Default::default()
    }
}

/// A sequence point blob for a row whose document column is `document`.
///
/// Each entry is `(il_offset, start_line, end_line)`.
pub fn line_blob(document: u32, lines: &[(u32, u32, u32)]) -> Vec<u8> {
    let points = lines
        .iter()
        .map(|&(il_offset, start_line, end_line)| SequencePoint {
            il_offset,
            document,
            start_line,
            start_col: 5,
            end_line,
            end_col: 10,
            is_hidden: false,
        })
        .collect();

    SequencePointsBlob {
        local_signature: 0,
        initial_document: document,
        document_in_header: false,
        points,
    }
    .encode()
    .unwrap()
}

/// A blob spanning two documents, with the initial document in the header.
pub fn two_document_blob(first: u32, second: u32) -> Vec<u8> {
    let point = |il_offset, document, line| SequencePoint {
        il_offset,
        document,
        start_line: line,
        start_col: 1,
        end_line: line,
        end_col: 20,
        is_hidden: false,
    };

    SequencePointsBlob {
        local_signature: 0,
        initial_document: first,
        document_in_header: true,
        points: vec![
            point(0, first, 10),
            point(6, second, 3),
            SequencePoint::hidden(12, second),
            point(14, first, 11),
        ]
        .into_iter()
        .collect(),
    }
    .encode()
    .unwrap()
}
