//! Published generations and read-only views over them.
//!
//! A [`Generation`] owns the metadata of one baseline or delta together with the complete
//! session state as of that generation. Because the state is built from persistent
//! collections, every generation can keep its own copy at little cost, and a [`Snapshot`]
//! over any version answers queries exactly as the session did when that version was
//! current.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    enc::{
        documents::DocumentIdentityMap,
        extents::MethodExtentIndex,
        ids::{DocumentId, MethodId},
        linedeltas::MethodLineDeltas,
        methods::{MethodHandle, MethodIdentityMap},
    },
    metadata::{
        sequencepoints::SequencePoint,
        tables::{Document, MethodDebugInformation},
        view::GenerationMetadata,
    },
};

/// The identity maps, extent index and line-delta overlays of one session version.
#[derive(Clone, Debug, Default)]
pub(crate) struct EncState {
    pub(crate) documents: DocumentIdentityMap,
    pub(crate) methods: MethodIdentityMap,
    pub(crate) extents: MethodExtentIndex,
    pub(crate) deltas: imbl::HashMap<MethodId, MethodLineDeltas>,
}

/// One applied baseline or delta.
#[derive(Debug)]
pub struct Generation {
    pub(crate) number: u32,
    pub(crate) metadata: Arc<GenerationMetadata>,
    pub(crate) previous_document_count: usize,
    pub(crate) document_handles: FxHashMap<u32, DocumentId>,
    pub(crate) method_handles: FxHashMap<u32, MethodId>,
    pub(crate) state: EncState,
}

impl Generation {
    /// The generation number; 1 is the baseline.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns `true` for the baseline.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.number == 1
    }

    /// The metadata this generation was built from.
    #[must_use]
    pub fn metadata(&self) -> &Arc<GenerationMetadata> {
        &self.metadata
    }

    /// Number of documents known before this generation was applied.
    #[must_use]
    pub fn previous_document_count(&self) -> usize {
        self.previous_document_count
    }

    /// The id assigned to Document row `row` of this generation.
    #[must_use]
    pub fn document_id(&self, row: u32) -> Option<DocumentId> {
        self.document_handles.get(&row).copied()
    }

    /// The method MethodDebugInformation row `row` of this generation belongs to.
    #[must_use]
    pub fn method_id(&self, row: u32) -> Option<MethodId> {
        self.method_handles.get(&row).copied()
    }
}

pub(crate) fn lookup<'a>(
    generations: &'a [Generation],
) -> impl Fn(u32) -> Option<&'a GenerationMetadata> + 'a {
    move |number| {
        let index = (number as usize).checked_sub(1)?;
        generations.get(index).map(|generation| generation.metadata.as_ref())
    }
}

/// Read-only view of the session as of one version.
///
/// Lookups of unknown documents, methods or lines return `None` or an empty result; they
/// are ordinary outcomes while code is being edited.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    generations: &'a [Generation],
    state: &'a EncState,
}

impl<'a> Snapshot<'a> {
    /// View the state after the last of `generations`.
    pub(crate) fn new(generations: &'a [Generation]) -> Option<Snapshot<'a>> {
        let last = generations.last()?;
        Some(Snapshot {
            generations,
            state: &last.state,
        })
    }

    /// The version this snapshot shows.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.generations.len() as u32
    }

    /// Generation `number`, if it is part of this snapshot.
    #[must_use]
    pub fn generation(&self, number: u32) -> Option<&'a Generation> {
        self.generations.get((number as usize).checked_sub(1)?)
    }

    /// Number of documents known.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.state.documents.len()
    }

    /// Number of methods with debug information.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.state.methods.len()
    }

    /// All document ids, in assignment order.
    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + 'a {
        self.state.documents.ids()
    }

    /// Resolve a source file path to its document.
    #[must_use]
    pub fn resolve_document(&self, path: &str) -> Option<DocumentId> {
        self.state
            .documents
            .resolve(path, lookup(self.generations))
    }

    /// The current version of a document.
    #[must_use]
    pub fn document(&self, id: DocumentId) -> Option<&'a Document> {
        self.state.documents.document(id, lookup(self.generations))
    }

    /// The full path of a document.
    #[must_use]
    pub fn document_path(&self, id: DocumentId) -> Option<&'a str> {
        self.document(id).map(|document| document.name.as_str())
    }

    /// Where the current debug record of a method lives.
    #[must_use]
    pub fn method(&self, method: MethodId) -> Option<MethodHandle> {
        self.state.methods.resolve(method)
    }

    /// The current debug record of a method.
    #[must_use]
    pub fn method_debug_information(&self, method: MethodId) -> Option<&'a MethodDebugInformation> {
        let handle = self.method(method)?;
        self.generation(handle.generation)?
            .metadata
            .method_debug(handle.row)
    }

    /// Line deltas recorded for a method since its body was last replaced.
    #[must_use]
    pub fn line_deltas(&self, method: MethodId) -> Option<&'a MethodLineDeltas> {
        self.state.deltas.get(&method)
    }

    /// The documents a method has visible sequence points in.
    #[must_use]
    pub fn documents_of(&self, method: MethodId) -> &'a [DocumentId] {
        self.state.extents.documents_of(method)
    }

    /// The `(min_line, max_line)` range of a method in a document.
    #[must_use]
    pub fn source_extent(&self, method: MethodId, document: DocumentId) -> Option<(u32, u32)> {
        self.state.extents.source_extent(method, document)
    }

    /// Methods whose range in `document` contains `line`, each with the generation that
    /// declared its current version. Ordered by method id.
    #[must_use]
    pub fn methods_containing(&self, document: DocumentId, line: u32) -> Vec<(MethodId, u32)> {
        self.state.extents.query(document, line)
    }

    /// The method with the smallest id whose range contains `line`.
    #[must_use]
    pub fn method_containing(&self, document: DocumentId, line: u32) -> Option<(MethodId, u32)> {
        self.state.extents.best_match(document, line)
    }

    /// The sequence points of a method with its line deltas applied, each paired with the
    /// document it belongs to.
    ///
    /// Returns `None` if the method is unknown, has no sequence points, or its blob cannot
    /// be decoded.
    #[must_use]
    pub fn sequence_points(&self, method: MethodId) -> Option<Vec<(DocumentId, SequencePoint)>> {
        let handle = self.method(method)?;
        let owner = self.generation(handle.generation)?;
        let record = owner.metadata.method_debug(handle.row)?;
        record.sequence_points.as_ref()?;

        let mut points = record.sequence_points().ok()?;
        if let Some(deltas) = self.line_deltas(method) {
            deltas.apply(&mut points.0);
        }

        points
            .0
            .into_iter()
            .map(|point| Some((owner.document_id(point.document)?, point)))
            .collect()
    }

    /// The first line at or after `line` in `document` that has a visible sequence point.
    ///
    /// A point whose line range covers `line` yields `line` itself.
    #[must_use]
    pub fn closest_line(&self, document: DocumentId, line: u32) -> Option<u32> {
        let mut cursor = line;
        loop {
            let candidates = self.state.extents.closest_following(document, cursor);
            if candidates.is_empty() {
                return None;
            }

            let closest = candidates
                .iter()
                .filter_map(|extent| self.sequence_points(extent.method))
                .flatten()
                .filter(|(id, point)| *id == document && !point.is_hidden)
                .filter_map(|(_, point)| {
                    if point.contains_line(line) {
                        Some(line)
                    } else {
                        (point.start_line >= line).then_some(point.start_line)
                    }
                })
                .min();
            if closest.is_some() {
                return closest;
            }

            cursor = candidates
                .iter()
                .map(|extent| extent.max_line)
                .min()?
                .checked_add(1)?;
        }
    }

    /// For every method containing `line`, the IL offset of its first visible sequence
    /// point covering the line. Ordered by method id.
    #[must_use]
    pub fn il_offsets_at(&self, document: DocumentId, line: u32) -> Vec<(MethodId, u32)> {
        self.methods_containing(document, line)
            .into_iter()
            .filter_map(|(method, _)| {
                self.sequence_points(method)?
                    .into_iter()
                    .find(|(id, point)| *id == document && point.contains_line(line))
                    .map(|(_, point)| (method, point.il_offset))
            })
            .collect()
    }
}

impl std::fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version())
            .field("documents", &self.document_count())
            .field("methods", &self.method_count())
            .finish()
    }
}
