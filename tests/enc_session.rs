//! Edit-and-Continue sessions driven end to end through serialized Portable PDB metadata.

use pdbscope::{metadata::tables::TableId, prelude::*};

/// A sequence point blob for a row whose document column is `document`.
fn blob(document: u32, lines: &[(u32, u32, u32)]) -> Vec<u8> {
    let points = lines
        .iter()
        .map(|&(il_offset, start_line, end_line)| SequencePoint {
            il_offset,
            document,
            start_line,
            start_col: 9,
            end_line,
            end_col: 30,
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

fn baseline(documents: &[&str], methods: &[(u32, Option<Vec<u8>>)]) -> Vec<u8> {
    let view = GenerationMetadata {
        pdb: None,
        documents: documents
            .iter()
            .zip(1..)
            .map(|(path, rid)| Document::new(rid, *path))
            .collect(),
        method_debug_information: methods
            .iter()
            .zip(1..)
            .map(|((document, points), rid)| {
                MethodDebugInformation::new(rid, *document, points.clone())
            })
            .collect(),
        enc_map: Vec::new(),
    };

    write_metadata(&view).unwrap()
}

/// A delta redefining `methods`, given as `(method, document row, blob)`.
fn delta(documents: &[&str], methods: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut enc_map: Vec<Token> = (1..=documents.len() as u32)
        .map(|rid| Token::from_parts(TableId::Document, rid))
        .collect();
    enc_map.extend(
        methods
            .iter()
            .map(|(method, _, _)| Token::from_parts(TableId::MethodDebugInformation, *method)),
    );

    let view = GenerationMetadata {
        pdb: None,
        documents: documents
            .iter()
            .zip(1..)
            .map(|(path, rid)| Document::new(rid, *path))
            .collect(),
        method_debug_information: methods
            .iter()
            .zip(1..)
            .map(|((_, document, points), rid)| {
                MethodDebugInformation::new(rid, *document, Some(points.clone()))
            })
            .collect(),
        enc_map,
    };

    write_metadata(&view).unwrap()
}

fn empty_delta() -> Vec<u8> {
    write_metadata(&GenerationMetadata::default()).unwrap()
}

const M1: MethodId = MethodId::new(1);
const M2: MethodId = MethodId::new(2);
const M3: MethodId = MethodId::new(3);

#[test]
fn redefined_method_and_new_lambda() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(&["/src/A.cs"], &[(1, Some(blob(1, &[(0, 1, 1), (6, 10, 10)])))]),
        Vec::new(),
    )?;
    session.apply_delta(
        &delta(
            &["/src/A.cs"],
            &[
                (1, 1, blob(1, &[(0, 1, 1), (6, 12, 12)])),
                (2, 1, blob(1, &[(0, 5, 6)])),
            ],
        ),
        Vec::new(),
    )?;

    let current = session.current().unwrap();
    let a = current.resolve_document("/src/A.cs").unwrap();
    assert_eq!(current.methods_containing(a, 6), vec![(M1, 2), (M2, 2)]);
    assert_eq!(current.method_containing(a, 6), Some((M1, 2)));
    assert_eq!(current.source_extent(M1, a), Some((1, 12)));

    let baseline = session.at(1).unwrap();
    assert_eq!(baseline.methods_containing(a, 6), vec![(M1, 1)]);
    assert_eq!(baseline.source_extent(M1, a), Some((1, 10)));
    assert!(baseline.method(M2).is_none());
    Ok(())
}

#[test]
fn line_delta_then_redefinition() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(&["/src/A.cs"], &[(1, Some(blob(1, &[(0, 1, 1), (6, 10, 10)])))]),
        Vec::new(),
    )?;
    session.apply_delta(&empty_delta(), vec![(M1, MethodLineDeltas::scalar(10))])?;

    let moved = session.current().unwrap();
    let a = moved.resolve_document("A.cs").unwrap();
    for line in 1..=10 {
        assert!(moved.methods_containing(a, line).is_empty(), "line {line}");
    }
    for line in 11..=20 {
        assert_eq!(moved.methods_containing(a, line), vec![(M1, 1)], "line {line}");
    }
    assert_eq!(moved.line_deltas(M1), Some(&MethodLineDeltas::scalar(10)));
    assert_eq!(moved.closest_line(a, 2), Some(11));

    session.apply_delta(
        &delta(&["/src/A.cs"], &[(1, 1, blob(1, &[(0, 1, 1), (6, 10, 10)]))]),
        Vec::new(),
    )?;

    let redefined = session.current().unwrap();
    assert!(redefined.line_deltas(M1).is_none());
    assert_eq!(redefined.methods_containing(a, 5), vec![(M1, 3)]);
    assert!(redefined.methods_containing(a, 15).is_empty());
    Ok(())
}

#[test]
fn nested_methods() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(
            &["/src/Query.cs"],
            &[
                (1, Some(blob(1, &[(0, 1, 1), (8, 50, 50)]))),
                (1, Some(blob(1, &[(0, 10, 12)]))),
            ],
        ),
        Vec::new(),
    )?;

    let snapshot = session.current().unwrap();
    let document = DocumentId::new(1);
    assert_eq!(snapshot.methods_containing(document, 11), vec![(M1, 1), (M2, 1)]);
    assert_eq!(snapshot.method_containing(document, 11), Some((M1, 1)));
    assert_eq!(snapshot.il_offsets_at(document, 11), vec![(M2, 0)]);
    assert_eq!(snapshot.methods_containing(document, 30), vec![(M1, 1)]);
    Ok(())
}

#[test]
fn document_identity_is_stable() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(&baseline(&["/src/A.cs", "/src/B.cs"], &[]), Vec::new())?;
    session.apply_delta(&delta(&["/src/B.cs", "/src/C.cs"], &[]), Vec::new())?;
    session.apply_delta(&delta(&["/src/A.cs"], &[]), Vec::new())?;

    for version in 1..=3 {
        let snapshot = session.at(version).unwrap();
        assert_eq!(snapshot.resolve_document("/src/A.cs"), Some(DocumentId::new(1)));
        assert_eq!(snapshot.resolve_document("/src/B.cs"), Some(DocumentId::new(2)));
    }

    assert_eq!(session.at(1).unwrap().resolve_document("/src/C.cs"), None);
    assert_eq!(
        session.current().unwrap().resolve_document("/src/C.cs"),
        Some(DocumentId::new(3))
    );

    let generation = session.generation(2)?;
    assert_eq!(generation.previous_document_count(), 2);
    assert_eq!(generation.document_id(1), Some(DocumentId::new(2)));
    assert_eq!(generation.document_id(2), Some(DocumentId::new(3)));
    assert_eq!(session.generation(3)?.document_id(1), Some(DocumentId::new(1)));
    Ok(())
}

#[test]
fn delta_rows_are_generation_local() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(
            &["/src/A.cs", "/src/B.cs"],
            &[
                (1, Some(blob(1, &[(0, 3, 4)]))),
                (2, Some(blob(2, &[(0, 8, 9)]))),
                (2, Some(blob(2, &[(0, 20, 25)]))),
            ],
        ),
        Vec::new(),
    )?;

    // Row 1 of the delta is B.cs, row 1 of the MethodDebugInformation table is method 3
    session.apply_delta(
        &delta(&["/src/B.cs"], &[(3, 1, blob(1, &[(0, 20, 27)]))]),
        Vec::new(),
    )?;

    let snapshot = session.current().unwrap();
    let b = DocumentId::new(2);
    assert_eq!(snapshot.documents_of(M3), &[b]);
    assert_eq!(snapshot.source_extent(M3, b), Some((20, 27)));
    assert_eq!(snapshot.method(M3).map(|handle| handle.row), Some(1));
    assert_eq!(snapshot.methods_containing(DocumentId::new(1), 3), vec![(M1, 1)]);

    let points = snapshot.sequence_points(M3).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].0, b);
    Ok(())
}

#[test]
fn method_spanning_documents() -> Result<()> {
    let points = SequencePointsBlob {
        local_signature: 0,
        initial_document: 1,
        document_in_header: true,
        points: vec![
            SequencePoint {
                il_offset: 0,
                document: 1,
                start_line: 4,
                start_col: 1,
                end_line: 4,
                end_col: 2,
                is_hidden: false,
            },
            SequencePoint::hidden(2, 2),
            SequencePoint {
                il_offset: 4,
                document: 2,
                start_line: 40,
                start_col: 1,
                end_line: 42,
                end_col: 2,
                is_hidden: false,
            },
        ]
        .into_iter()
        .collect(),
    }
    .encode()?;

    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(&["/src/A.cs", "/src/A.g.cs"], &[(0, Some(points))]),
        Vec::new(),
    )?;

    let snapshot = session.current().unwrap();
    let (a, generated) = (DocumentId::new(1), DocumentId::new(2));
    assert_eq!(snapshot.documents_of(M1), &[a, generated]);
    assert_eq!(snapshot.source_extent(M1, a), Some((4, 4)));
    assert_eq!(snapshot.source_extent(M1, generated), Some((40, 42)));
    assert_eq!(snapshot.closest_line(generated, 1), Some(40));
    assert_eq!(snapshot.il_offsets_at(generated, 41), vec![(M1, 4)]);

    let decoded = snapshot.sequence_points(M1).unwrap();
    assert_eq!(decoded.len(), 3);
    assert!(decoded[1].1.is_hidden);
    assert_eq!(decoded[1].0, generated);
    Ok(())
}

#[test]
fn closest_line() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(
            &["/src/A.cs"],
            &[
                (1, Some(blob(1, &[(0, 3, 3), (4, 7, 7)]))),
                (1, Some(blob(1, &[(0, 20, 22)]))),
                (1, None),
            ],
        ),
        Vec::new(),
    )?;

    let snapshot = session.current().unwrap();
    let a = DocumentId::new(1);
    assert_eq!(snapshot.closest_line(a, 1), Some(3));
    assert_eq!(snapshot.closest_line(a, 3), Some(3));
    assert_eq!(snapshot.closest_line(a, 5), Some(7));
    assert_eq!(snapshot.closest_line(a, 8), Some(20));
    assert_eq!(snapshot.closest_line(a, 21), Some(21));
    assert_eq!(snapshot.closest_line(a, 23), None);
    assert_eq!(snapshot.closest_line(DocumentId::new(9), 1), None);
    Ok(())
}

/// Ten blocks of 20 lines, each an outer method with a lambda and a nested lambda inside.
fn nested_blocks() -> Vec<u8> {
    let methods: Vec<(u32, Option<Vec<u8>>)> = (0..10u32)
        .flat_map(|block| {
            let first = block * 20 + 1;
            [
                (first, first + 17),
                (first + 4, first + 7),
                (first + 5, first + 5),
            ]
        })
        .map(|(start, end)| (1, Some(blob(1, &[(0, start, start), (4, end, end)]))))
        .collect();

    baseline(&["/src/Blocks.cs"], &methods)
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn concurrent_readers_agree() -> Result<()> {
    assert_send_sync::<Snapshot<'static>>();
    assert_send_sync::<EncSession>();

    let answers = |snapshot: Snapshot<'_>| -> Vec<(Vec<(MethodId, u32)>, Option<u32>)> {
        (0..=205)
            .map(|line| {
                (
                    snapshot.methods_containing(DocumentId::new(1), line),
                    snapshot.closest_line(DocumentId::new(1), line),
                )
            })
            .collect()
    };

    let mut reference = EncSession::default();
    reference.apply_delta(&nested_blocks(), Vec::new())?;
    let expected = answers(reference.current().unwrap());
    assert_eq!(expected[6].0, vec![(M1, 1), (M2, 1), (M3, 1)]);

    // A fresh session, so every thread races on an empty partition cache
    let mut session = EncSession::default();
    session.apply_delta(&nested_blocks(), Vec::new())?;
    let snapshot = session.current().unwrap();

    let results: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || answers(snapshot)))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .collect()
    });

    for result in results {
        assert_eq!(result, expected);
    }
    Ok(())
}

#[test]
fn rejected_updates_leave_session_unchanged() -> Result<()> {
    let mut session = EncSession::default();
    session.apply_delta(
        &baseline(&["/src/A.cs"], &[(1, Some(blob(1, &[(0, 1, 5)])))]),
        Vec::new(),
    )?;

    let garbage = session.apply_delta(&[0xFF; 40], Vec::new());
    assert!(garbage.unwrap_err().is_malformed_input());

    let replay = delta(&["/src/A.cs", "/src/A.cs"], &[]);
    assert!(matches!(
        session.apply_delta(&replay, Vec::new()),
        Err(Error::IdentityConflict(_))
    ));

    let mismatch = session.apply_delta(
        &empty_delta(),
        vec![(M1, MethodLineDeltas::new(0, vec![1, 2]))],
    );
    assert!(matches!(mismatch, Err(Error::LineDeltaMismatch { .. })));

    assert_eq!(session.version(), 1);
    assert_eq!(session.phase(), SessionPhase::Baseline);
    let snapshot = session.current().unwrap();
    assert_eq!(snapshot.document_count(), 1);
    assert_eq!(snapshot.source_extent(M1, DocumentId::new(1)), Some((1, 5)));
    Ok(())
}
