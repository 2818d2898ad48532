//! Per-document index of method line ranges.
//!
//! Every method version contributes one [`MethodExtent`] per document its visible sequence
//! points touch. Extents of one document may overlap: a lambda or query expression lies
//! inside the lines of its enclosing method. To still answer "which methods contain line L"
//! with binary search, the extents of a document are partitioned into runs of
//! non-overlapping extents sorted by their first line. The number of runs equals the
//! deepest nesting of overlapping methods, which in practice is small.
//!
//! Partitions are computed lazily on the first query of a document and cached. The cache
//! is the only state that changes after a generation is published; computing a partition
//! is pure, so concurrent readers racing to fill it store identical values.

use std::{cmp::Reverse, collections::BinaryHeap, sync::Arc};

use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::{
    enc::ids::{DocumentId, MethodId},
    metadata::{sequencepoints::SequencePoint, view::GenerationMetadata},
    Result,
};

/// The line range one method version covers in one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodExtent {
    /// The method
    pub method: MethodId,
    /// Generation that declared the method version the extent was computed from
    pub version: u32,
    /// Smallest start line of the method's visible points in the document
    pub min_line: u32,
    /// Largest end line of the method's visible points in the document
    pub max_line: u32,
}

impl MethodExtent {
    /// Returns `true` if `line` lies within the extent.
    #[must_use]
    pub fn contains(&self, line: u32) -> bool {
        self.min_line <= line && line <= self.max_line
    }

    fn shifted(self, delta: i32) -> MethodExtent {
        MethodExtent {
            min_line: self.min_line.saturating_add_signed(delta),
            max_line: self.max_line.saturating_add_signed(delta),
            ..self
        }
    }
}

/// The line range of a method in one document, before it is attached to the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentSpan {
    /// Document the range lies in
    pub document: DocumentId,
    /// First line
    pub min_line: u32,
    /// Last line
    pub max_line: u32,
}

/// All spans of one method version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodExtents {
    /// The method
    pub method: MethodId,
    /// Generation of the method version
    pub version: u32,
    /// One span per touched document, ordered by document
    pub spans: Vec<DocumentSpan>,
}

/// Runs of non-overlapping extents of one document, each sorted by `min_line`.
pub type Runs = Arc<Vec<Vec<MethodExtent>>>;

/// Compute the per-document spans of a method from its sequence points.
///
/// Hidden points are ignored; `documents` maps the generation-local document rows of the
/// points to document ids.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a point references a document row `documents`
/// does not know.
pub fn spans_of<F>(points: &[SequencePoint], documents: F) -> Result<Vec<DocumentSpan>>
where
    F: Fn(u32) -> Option<DocumentId>,
{
    let mut spans: Vec<DocumentSpan> = Vec::new();
    for point in points.iter().filter(|point| !point.is_hidden) {
        let Some(document) = documents(point.document) else {
            return Err(malformed_error!(
                "Sequence point references unknown document row {}",
                point.document
            ));
        };

        match spans.iter_mut().find(|span| span.document == document) {
            Some(span) => {
                span.min_line = span.min_line.min(point.start_line);
                span.max_line = span.max_line.max(point.end_line);
            }
            None => spans.push(DocumentSpan {
                document,
                min_line: point.start_line,
                max_line: point.end_line,
            }),
        }
    }

    spans.sort_by_key(|span| span.document);
    Ok(spans)
}

/// Partition extents into runs of non-overlapping extents.
///
/// Extents are visited by ascending `min_line` (wider extents first on ties) and each is
/// appended to the run that ends earliest, provided it ends before the extent starts;
/// otherwise a new run is opened. Runs are kept in a min-heap on their last `max_line`, so
/// partitioning `n` extents into `k` runs takes O(n log k) after sorting. Every extent
/// ends up in exactly one run and no smaller number of runs exists.
#[must_use]
pub fn partition(extents: &[MethodExtent]) -> Vec<Vec<MethodExtent>> {
    let mut sorted = extents.to_vec();
    sorted.sort_by(|a, b| {
        a.min_line
            .cmp(&b.min_line)
            .then(b.max_line.cmp(&a.max_line))
            .then(a.method.cmp(&b.method))
    });

    let mut runs: Vec<Vec<MethodExtent>> = Vec::new();
    // (last max_line, run index), earliest ending run on top
    let mut ends: BinaryHeap<Reverse<(u32, usize)>> = BinaryHeap::new();
    for extent in sorted {
        if let Some(mut top) = ends.peek_mut() {
            let Reverse((end, index)) = *top;
            if end < extent.min_line {
                runs[index].push(extent);
                *top = Reverse((extent.max_line, index));
                continue;
            }
        }

        ends.push(Reverse((extent.max_line, runs.len())));
        runs.push(vec![extent]);
    }

    runs
}

/// Method extents of one session state, grouped by document.
#[derive(Debug, Default)]
pub struct MethodExtentIndex {
    documents: imbl::HashMap<DocumentId, Arc<Vec<MethodExtent>>>,
    methods: imbl::HashMap<MethodId, Vec<DocumentId>>,
    runs: DashMap<DocumentId, Runs>,
}

impl Clone for MethodExtentIndex {
    fn clone(&self) -> Self {
        MethodExtentIndex {
            documents: self.documents.clone(),
            methods: self.methods.clone(),
            runs: self
                .runs
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }
}

impl MethodExtentIndex {
    /// Decode the sequence points of every method debug record of a generation and compute
    /// their spans.
    ///
    /// Records are decoded in parallel. Records without sequence points yield an empty span
    /// list, which removes older extents of a redefined method when merged.
    ///
    /// # Errors
    /// Returns the first decoding error, or [`crate::Error::Malformed`] for a point that
    /// references a document row of the generation that does not exist.
    pub fn build(
        view: &GenerationMetadata,
        generation: u32,
        documents: &FxHashMap<u32, DocumentId>,
        methods: &FxHashMap<u32, MethodId>,
    ) -> Result<Vec<MethodExtents>> {
        view.method_debug_information
            .par_iter()
            .map(|record| {
                let Some(method) = methods.get(&record.rid) else {
                    return Err(malformed_error!(
                        "MethodDebugInformation row {} has no method",
                        record.rid
                    ));
                };

                let points = record.sequence_points()?;
                Ok(MethodExtents {
                    method: *method,
                    version: generation,
                    spans: spans_of(&points, |row| documents.get(&row).copied())?,
                })
            })
            .collect()
    }

    /// Merge method versions computed by [`MethodExtentIndex::build`].
    ///
    /// A method that is already indexed has all of its extents replaced.
    pub fn merge(&mut self, methods: Vec<MethodExtents>) {
        for extents in methods {
            self.update_full_body(extents.method, extents.version, &extents.spans);
        }
    }

    /// Replace all extents of `method` with `spans`.
    pub fn update_full_body(&mut self, method: MethodId, version: u32, spans: &[DocumentSpan]) {
        if let Some(documents) = self.methods.remove(&method) {
            for document in documents {
                let Some(extents) = self.documents.get(&document) else {
                    continue;
                };

                let remaining: Vec<MethodExtent> = extents
                    .iter()
                    .filter(|extent| extent.method != method)
                    .copied()
                    .collect();
                if remaining.is_empty() {
                    self.documents.remove(&document);
                } else {
                    self.documents.insert(document, Arc::new(remaining));
                }
                self.runs.remove(&document);
            }
        }

        if spans.is_empty() {
            return;
        }

        let mut touched = Vec::with_capacity(spans.len());
        for span in spans {
            let mut extents = self
                .documents
                .get(&span.document)
                .map(|extents| extents.as_ref().clone())
                .unwrap_or_default();
            extents.push(MethodExtent {
                method,
                version,
                min_line: span.min_line,
                max_line: span.max_line,
            });

            self.documents.insert(span.document, Arc::new(extents));
            self.runs.remove(&span.document);
            if !touched.contains(&span.document) {
                touched.push(span.document);
            }
        }

        touched.sort();
        self.methods.insert(method, touched);
    }

    /// Shift the extents of methods moved without a body update.
    ///
    /// For every document in `deltas`, each extent of a listed method is moved by the given
    /// number of lines. Extents of other methods are left alone.
    pub fn update_by_line_delta(&mut self, deltas: &FxHashMap<DocumentId, Vec<(MethodId, i32)>>) {
        for (document, methods) in deltas {
            let Some(extents) = self.documents.get(document) else {
                continue;
            };

            let shifted: Vec<MethodExtent> = extents
                .iter()
                .map(|extent| {
                    methods
                        .iter()
                        .filter(|(method, _)| *method == extent.method)
                        .fold(*extent, |extent, (_, delta)| extent.shifted(*delta))
                })
                .collect();

            self.documents.insert(*document, Arc::new(shifted));
            self.runs.remove(document);
        }
    }

    /// All extents of `document`, in insertion order.
    #[must_use]
    pub fn extents(&self, document: DocumentId) -> &[MethodExtent] {
        self.documents
            .get(&document)
            .map(|extents| extents.as_slice())
            .unwrap_or(&[])
    }

    /// The documents `method` has extents in, ordered by id.
    #[must_use]
    pub fn documents_of(&self, method: MethodId) -> &[DocumentId] {
        self.methods
            .get(&method)
            .map(|documents| documents.as_slice())
            .unwrap_or(&[])
    }

    /// The `(min_line, max_line)` range of `method` in `document`.
    #[must_use]
    pub fn source_extent(&self, method: MethodId, document: DocumentId) -> Option<(u32, u32)> {
        self.extents(document)
            .iter()
            .find(|extent| extent.method == method)
            .map(|extent| (extent.min_line, extent.max_line))
    }

    /// The partition of `document` into runs of non-overlapping extents.
    pub fn runs(&self, document: DocumentId) -> Runs {
        if let Some(runs) = self.runs.get(&document) {
            return runs.value().clone();
        }

        let runs: Runs = Arc::new(partition(self.extents(document)));
        self.runs.insert(document, runs.clone());
        runs
    }

    /// Methods whose extent in `document` contains `line`, ordered by method id.
    ///
    /// At most one method per run matches, so nested methods (a lambda inside its
    /// enclosing method) are all reported.
    #[must_use]
    pub fn query(&self, document: DocumentId, line: u32) -> Vec<(MethodId, u32)> {
        let mut hits: Vec<(MethodId, u32)> = self
            .runs(document)
            .iter()
            .filter_map(|run| {
                let index = run.partition_point(|extent| extent.min_line <= line);
                let candidate = run.get(index.checked_sub(1)?)?;
                candidate
                    .contains(line)
                    .then_some((candidate.method, candidate.version))
            })
            .collect();

        hits.sort_unstable();
        hits
    }

    /// The single best method containing `line`: the smallest method id.
    #[must_use]
    pub fn best_match(&self, document: DocumentId, line: u32) -> Option<(MethodId, u32)> {
        self.query(document, line).into_iter().next()
    }

    /// For each run, the extent containing `line` or else the next extent after it.
    ///
    /// Results are ordered by `min_line`.
    #[must_use]
    pub fn closest_following(&self, document: DocumentId, line: u32) -> Vec<MethodExtent> {
        let mut candidates: Vec<MethodExtent> = self
            .runs(document)
            .iter()
            .filter_map(|run| {
                let index = run.partition_point(|extent| extent.min_line <= line);
                index
                    .checked_sub(1)
                    .and_then(|previous| run.get(previous))
                    .filter(|extent| extent.contains(line))
                    .or_else(|| run.get(index))
                    .copied()
            })
            .collect();

        candidates.sort_by_key(|extent| (extent.min_line, extent.method));
        candidates
    }
}
