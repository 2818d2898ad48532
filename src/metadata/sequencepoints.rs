//!
//! Sequence Points decoding and encoding for PortablePDB MethodDebugInformation.
//!
//! This module provides types and functions to decode and encode sequence points in the
//! PortablePDB format, mapping IL offsets to source code locations for debugging purposes.
//!
//! # Architecture
//!
//! Sequence points are stored in the [`crate::metadata::tables::MethodDebugInformation`] table
//! as a compressed blob. Decoding is exposed both as a lazy iterator
//! ([`SequencePointsIter`]) and as an owned round-trippable value ([`SequencePointsBlob`]).
//! Nothing is cached: every decode starts from the stored bytes, so decoding the same blob
//! twice always yields the same points.
//!
//! # Key Components
//!
//! - [`SequencePoint`] - A single mapping from IL offset to a source range in one document.
//! - [`SequencePoints`] - Collection of sequence points for a method.
//! - [`SequencePointsIter`] - Lazy decoder over a blob.
//! - [`SequencePointsBlob`] - Header plus points, with [`SequencePointsBlob::encode`] as the
//!   exact inverse of [`SequencePointsBlob::decode`].
//!
//! # Usage Examples
//!
//! ```rust
//! use pdbscope::metadata::sequencepoints::{parse_sequence_points, SequencePointsBlob};
//!
//! // local signature 0, IL 0, one line, 4 columns wide, line 10 column 5
//! let blob: &[u8] = &[0x00, 0x00, 0x00, 0x04, 0x0A, 0x05];
//! let points = parse_sequence_points(blob, Some(1))?;
//! assert_eq!(points.len(), 1);
//! assert_eq!(points[0].start_line, 10);
//! assert_eq!(points[0].end_col, 9);
//!
//! let decoded = SequencePointsBlob::decode(blob, Some(1))?;
//! assert_eq!(decoded.encode()?, blob);
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! # Sequence Points Blob Format
//!
//! ## Header
//! - **LocalSignature**: compressed unsigned `StandAloneSig` row id (0 when the method has no locals)
//! - **InitialDocument**: compressed unsigned `Document` row id, present only when the owning
//!   `MethodDebugInformation` row has a nil document column (multi-document methods)
//!
//! ## Records
//! - **Document record**: `δILOffset = 0` (never the first record) followed by a compressed
//!   unsigned `Document` row id. All following points belong to that document.
//! - **Sequence point record**:
//!   - `δILOffset` - compressed unsigned; absolute for the first record, otherwise a
//!     positive delta from the previous record
//!   - `ΔLines` - compressed unsigned, `EndLine - StartLine`
//!   - `ΔColumns` - `EndColumn - StartColumn`; compressed unsigned when `ΔLines == 0`,
//!     compressed signed otherwise
//!   - `δStartLine`, `δStartColumn` - compressed unsigned for the first non-hidden point of
//!     the blob, compressed signed deltas from the previous non-hidden point afterwards
//! - **Hidden sequence point record**: `δILOffset`, then `ΔLines = 0` and `ΔColumns = 0`
//!   (the two-byte zero marker); no start position follows.
//!
//! Hidden points report the conventional line `0xFEEFEE` and column 0.
//!
//! ## References
//!
//! - [PortablePDB Spec](https://github.com/dotnet/runtime/blob/main/docs/design/specs/PortablePdb-Metadata.md#sequence-points-blob)

use std::ops::Deref;

use crate::{
    file::parser::Parser,
    metadata::{tables::TableId, token::Token},
    utils::{write_compressed_int, write_compressed_uint},
    Result,
};

/// Line number reported for hidden sequence points.
pub const HIDDEN_LINE: u32 = 0x00FE_EFEE;

/// Exclusive upper bound for IL offsets and line numbers.
const MAX_VALUE: u32 = 0x2000_0000;

/// Represents a single sequence point mapping IL offset to source code location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePoint {
    /// Offset in the method's IL stream.
    pub il_offset: u32,
    /// Row of the `Document` table (of the generation the blob belongs to).
    pub document: u32,
    /// Starting line in the source file.
    pub start_line: u32,
    /// Starting column in the source file.
    pub start_col: u16,
    /// Ending line in the source file.
    pub end_line: u32,
    /// Ending column in the source file.
    pub end_col: u16,
    /// True if this is a hidden sequence point (start_line == 0xFEEFEE).
    pub is_hidden: bool,
}

impl SequencePoint {
    /// Creates a hidden sequence point at `il_offset`.
    #[must_use]
    pub fn hidden(il_offset: u32, document: u32) -> Self {
        SequencePoint {
            il_offset,
            document,
            start_line: HIDDEN_LINE,
            start_col: 0,
            end_line: HIDDEN_LINE,
            end_col: 0,
            is_hidden: true,
        }
    }

    /// The generation-local token of the document this point belongs to.
    #[must_use]
    pub fn document_token(&self) -> Token {
        Token::from_parts(TableId::Document, self.document)
    }

    /// Returns `true` if this point is visible and its line range covers `line`.
    #[must_use]
    pub fn contains_line(&self, line: u32) -> bool {
        !self.is_hidden && self.start_line <= line && line <= self.end_line
    }
}

/// Collection of sequence points for a method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequencePoints(pub Vec<SequencePoint>);

impl SequencePoints {
    /// Returns the sequence point for a given IL offset, if any.
    #[must_use]
    pub fn find_by_il_offset(&self, il_offset: u32) -> Option<&SequencePoint> {
        self.0.iter().find(|sp| sp.il_offset == il_offset)
    }

    /// Iterates over the points that are not hidden.
    pub fn visible(&self) -> impl Iterator<Item = &SequencePoint> {
        self.0.iter().filter(|sp| !sp.is_hidden)
    }

    /// Returns the distinct document rows referenced, in order of first appearance.
    #[must_use]
    pub fn documents(&self) -> Vec<u32> {
        let mut documents: Vec<u32> = Vec::new();
        for point in &self.0 {
            if !documents.contains(&point.document) {
                documents.push(point.document);
            }
        }
        documents
    }
}

impl Deref for SequencePoints {
    type Target = [SequencePoint];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<SequencePoint> for SequencePoints {
    fn from_iter<I: IntoIterator<Item = SequencePoint>>(iter: I) -> Self {
        SequencePoints(iter.into_iter().collect())
    }
}

/// Lazy decoder over a sequence points blob.
///
/// Yields one `Result<SequencePoint>` per sequence point record. After the first error the
/// iterator is exhausted. The decoder holds no state beyond its cursor, so creating a new
/// iterator over the same bytes restarts decoding from scratch.
pub struct SequencePointsIter<'a> {
    parser: Parser<'a>,
    local_signature: u32,
    document: u32,
    document_in_header: bool,
    previous_il: Option<u32>,
    previous_visible: Option<(u32, u16)>,
    failed: bool,
}

impl<'a> SequencePointsIter<'a> {
    /// Reads the blob header and positions the decoder on the first record.
    ///
    /// # Arguments
    /// * `blob` - The raw sequence points blob from MethodDebugInformation.
    /// * `document` - The row's document column, `None` when it is nil and the initial
    ///   document is stored in the blob header instead.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] if the header is
    /// truncated or names document row 0.
    pub fn new(blob: &'a [u8], document: Option<u32>) -> Result<Self> {
        let mut parser = Parser::new(blob);
        let local_signature = read_uint(&mut parser)?;

        let (document, document_in_header) = match document {
            Some(0) => return Err(malformed_error!("Document column references row 0")),
            Some(document) => (document, false),
            None => {
                let initial = read_uint(&mut parser)?;
                if initial == 0 {
                    return Err(malformed_error!("Initial document references row 0"));
                }
                (initial, true)
            }
        };

        Ok(SequencePointsIter {
            parser,
            local_signature,
            document,
            document_in_header,
            previous_il: None,
            previous_visible: None,
            failed: false,
        })
    }

    /// The `StandAloneSig` row of the method's local signature, 0 if none.
    #[must_use]
    pub fn local_signature(&self) -> u32 {
        self.local_signature
    }

    fn read_point(&mut self) -> Result<SequencePoint> {
        let il_offset = match self.previous_il {
            None => read_uint(&mut self.parser)?,
            Some(previous) => {
                let mut delta = read_uint(&mut self.parser)?;
                if delta == 0 {
                    let document = read_uint(&mut self.parser)?;
                    if document == 0 {
                        return Err(malformed_error!("Document record references row 0"));
                    }
                    if document == self.document {
                        return Err(malformed_error!(
                            "Document record re-selects the current document {}",
                            document
                        ));
                    }
                    self.document = document;

                    delta = read_uint(&mut self.parser)?;
                    if delta == 0 {
                        return Err(malformed_error!("Document record follows a document record"));
                    }
                }
                previous
                    .checked_add(delta)
                    .ok_or_else(|| malformed_error!("IL offset overflow"))?
            }
        };
        if il_offset >= MAX_VALUE {
            return Err(malformed_error!("IL offset out of range - {}", il_offset));
        }
        self.previous_il = Some(il_offset);

        let delta_lines = read_uint(&mut self.parser)?;
        let delta_columns = if delta_lines == 0 {
            i64::from(read_uint(&mut self.parser)?)
        } else {
            i64::from(read_int(&mut self.parser)?)
        };

        if delta_lines == 0 && delta_columns == 0 {
            return Ok(SequencePoint::hidden(il_offset, self.document));
        }

        let (start_line, start_col) = match self.previous_visible {
            None => (
                i64::from(read_uint(&mut self.parser)?),
                i64::from(read_uint(&mut self.parser)?),
            ),
            Some((line, col)) => (
                i64::from(line) + i64::from(read_int(&mut self.parser)?),
                i64::from(col) + i64::from(read_int(&mut self.parser)?),
            ),
        };

        let end_line = start_line + i64::from(delta_lines);
        let end_col = start_col + delta_columns;

        let start_line = line_in_range(start_line)?;
        let end_line = line_in_range(end_line)?;
        let start_col = column_in_range(start_col)?;
        let end_col = column_in_range(end_col)?;
        self.previous_visible = Some((start_line, start_col));

        Ok(SequencePoint {
            il_offset,
            document: self.document,
            start_line,
            start_col,
            end_line,
            end_col,
            is_hidden: false,
        })
    }
}

impl Iterator for SequencePointsIter<'_> {
    type Item = Result<SequencePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.parser.has_more_data() {
            return None;
        }

        let point = self.read_point();
        if point.is_err() {
            self.failed = true;
        }
        Some(point)
    }
}

/// Reads a compressed unsigned integer, rejecting encodings wider than necessary.
fn read_uint(parser: &mut Parser) -> Result<u32> {
    let start = parser.pos();
    let value = parser.read_compressed_uint()?;

    let mut canonical = Vec::with_capacity(4);
    write_compressed_uint(value, &mut canonical)?;
    if parser.pos() - start != canonical.len() {
        return Err(malformed_error!("Non-minimal compressed uint {:#x}", value));
    }
    Ok(value)
}

/// Reads a compressed signed integer, rejecting encodings wider than necessary.
fn read_int(parser: &mut Parser) -> Result<i32> {
    let start = parser.pos();
    let value = parser.read_compressed_int()?;

    let mut canonical = Vec::with_capacity(4);
    write_compressed_int(value, &mut canonical)?;
    if parser.pos() - start != canonical.len() {
        return Err(malformed_error!("Non-minimal compressed int {}", value));
    }
    Ok(value)
}

/// Returns `true` if `line` can be the line of a visible sequence point.
pub(crate) fn is_visible_line(line: i64) -> bool {
    (1..i64::from(MAX_VALUE)).contains(&line) && line != i64::from(HIDDEN_LINE)
}

fn line_in_range(line: i64) -> Result<u32> {
    match u32::try_from(line) {
        Ok(line) if line < MAX_VALUE && line != HIDDEN_LINE => Ok(line),
        _ => Err(malformed_error!("Line number out of range - {}", line)),
    }
}

fn column_in_range(column: i64) -> Result<u16> {
    u16::try_from(column).map_err(|_| malformed_error!("Column out of range - {}", column))
}

/// Parses a PortablePDB sequence points blob into a SequencePoints collection.
///
/// # Arguments
/// * `blob` - The raw sequence points blob from MethodDebugInformation.
/// * `document` - The row's document column, `None` when it is nil.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the blob is invalid.
pub fn parse_sequence_points(blob: &[u8], document: Option<u32>) -> Result<SequencePoints> {
    SequencePointsIter::new(blob, document)?.collect()
}

/// A decoded sequence points blob, including the header fields needed to re-encode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePointsBlob {
    /// `StandAloneSig` row of the local signature, 0 if none.
    pub local_signature: u32,
    /// Document the first record belongs to.
    pub initial_document: u32,
    /// `true` when `initial_document` is stored in the blob header rather than in the
    /// document column of the owning row.
    pub document_in_header: bool,
    /// The decoded points.
    pub points: SequencePoints,
}

impl SequencePointsBlob {
    /// Decodes a complete blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the blob is invalid.
    pub fn decode(blob: &[u8], document: Option<u32>) -> Result<Self> {
        let iter = SequencePointsIter::new(blob, document)?;
        let local_signature = iter.local_signature;
        let initial_document = iter.document;
        let document_in_header = iter.document_in_header;

        Ok(SequencePointsBlob {
            local_signature,
            initial_document,
            document_in_header,
            points: iter.collect::<Result<SequencePoints>>()?,
        })
    }

    /// Encodes the blob. For every value produced by [`SequencePointsBlob::decode`] the
    /// output is byte-for-byte identical to the decoded input.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the points cannot be represented: IL offsets not
    /// strictly increasing, a first point outside the initial document, an end position
    /// before its start, or values outside the encodable ranges.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        write_compressed_uint(self.local_signature, &mut buffer)?;
        if self.document_in_header {
            write_compressed_uint(self.initial_document, &mut buffer)?;
        }

        let mut document = self.initial_document;
        let mut previous_il: Option<u32> = None;
        let mut previous_visible: Option<(u32, u16)> = None;

        for point in self.points.iter() {
            match previous_il {
                None => {
                    if point.document != document {
                        return Err(malformed_error!(
                            "First sequence point must belong to the initial document"
                        ));
                    }
                    write_compressed_uint(point.il_offset, &mut buffer)?;
                }
                Some(previous) => {
                    if point.document != document {
                        if point.document == 0 {
                            return Err(malformed_error!("Sequence point references row 0"));
                        }
                        buffer.push(0);
                        write_compressed_uint(point.document, &mut buffer)?;
                        document = point.document;
                    }
                    match point.il_offset.checked_sub(previous) {
                        Some(delta) if delta > 0 => write_compressed_uint(delta, &mut buffer)?,
                        _ => {
                            return Err(malformed_error!(
                                "IL offsets must be strictly increasing - {} after {}",
                                point.il_offset,
                                previous
                            ))
                        }
                    }
                }
            }
            previous_il = Some(point.il_offset);

            if point.is_hidden {
                buffer.extend_from_slice(&[0, 0]);
                continue;
            }

            let delta_lines = point.end_line.checked_sub(point.start_line).ok_or_else(|| {
                malformed_error!("End line {} before start line", point.end_line)
            })?;
            let delta_columns = i32::from(point.end_col) - i32::from(point.start_col);
            write_compressed_uint(delta_lines, &mut buffer)?;
            if delta_lines == 0 {
                match u32::try_from(delta_columns) {
                    Ok(delta) if delta > 0 => write_compressed_uint(delta, &mut buffer)?,
                    _ => {
                        return Err(malformed_error!(
                            "Single-line sequence point needs a positive width"
                        ))
                    }
                }
            } else {
                write_compressed_int(delta_columns, &mut buffer)?;
            }

            match previous_visible {
                None => {
                    write_compressed_uint(point.start_line, &mut buffer)?;
                    write_compressed_uint(u32::from(point.start_col), &mut buffer)?;
                }
                Some((line, col)) => {
                    let delta_line = i64::from(point.start_line) - i64::from(line);
                    let delta_line = i32::try_from(delta_line)
                        .map_err(|_| malformed_error!("Line delta out of range"))?;
                    write_compressed_int(delta_line, &mut buffer)?;
                    write_compressed_int(
                        i32::from(point.start_col) - i32::from(col),
                        &mut buffer,
                    )?;
                }
            }
            previous_visible = Some((point.start_line, point.start_col));
        }

        Ok(buffer)
    }
}
