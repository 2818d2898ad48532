//! The Edit-and-Continue session: an append-only list of generations.
//!
//! Every update is staged on a clone of the current state and published only once every
//! step succeeded. A failing update leaves the session exactly as it was.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pdbscope::prelude::*;
//!
//! # fn load(_: &str) -> Vec<u8> { Vec::new() }
//! let mut session = EncSession::default();
//! session.apply_delta(&load("App.pdb"), Vec::new())?;
//! session.apply_delta(&load("App.1.pdb"), vec![(MethodId::new(4), MethodLineDeltas::scalar(2))])?;
//!
//! if let Some(snapshot) = session.current() {
//!     if let Some(document) = snapshot.resolve_document("/src/App/Program.cs") {
//!         for (method, generation) in snapshot.methods_containing(document, 42) {
//!             println!("{} (generation {})", method, generation);
//!         }
//!     }
//! }
//! # Ok::<(), pdbscope::Error>(())
//! ```

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    enc::{
        extents::{spans_of, DocumentSpan, MethodExtentIndex},
        generation::{lookup, EncState, Generation, Snapshot},
        ids::{DocumentId, MethodId},
        linedeltas::MethodLineDeltas,
    },
    metadata::{
        reader::PortablePdbReader,
        view::{GenerationMetadata, MetadataReader},
    },
    Error, Result,
};

/// How far a session has progressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing applied yet
    Empty,
    /// Only the baseline is applied
    Baseline,
    /// Deltas are applied; the latest generation number
    Generation(u32),
}

/// Explicit line deltas of a single update, merged per method.
struct StagedDeltas {
    by_document: FxHashMap<DocumentId, Vec<(MethodId, i32)>>,
    full_body: Vec<(MethodId, u32, Vec<DocumentSpan>)>,
    overlays: Vec<(MethodId, MethodLineDeltas)>,
}

/// Symbol state of one debugging session across Edit-and-Continue generations.
///
/// Updates must not race each other: [`EncSession::apply_delta`] takes `&mut self`.
/// Snapshots of published generations borrow the session immutably and may be queried
/// from any number of threads.
#[derive(Debug)]
pub struct EncSession<R: MetadataReader = PortablePdbReader> {
    reader: R,
    generations: Vec<Generation>,
}

impl Default for EncSession<PortablePdbReader> {
    fn default() -> Self {
        EncSession::new(PortablePdbReader)
    }
}

impl<R: MetadataReader> EncSession<R> {
    /// Creates an empty session that parses updates with `reader`.
    pub fn new(reader: R) -> Self {
        EncSession {
            reader,
            generations: Vec::new(),
        }
    }

    /// The reader used by [`EncSession::apply_delta`].
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// The number of the latest generation, 0 if nothing was applied.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.generations.len() as u32
    }

    /// How far the session has progressed.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self.version() {
            0 => SessionPhase::Empty,
            1 => SessionPhase::Baseline,
            version => SessionPhase::Generation(version),
        }
    }

    /// A view of the latest generation.
    #[must_use]
    pub fn current(&self) -> Option<Snapshot<'_>> {
        Snapshot::new(&self.generations)
    }

    /// A view of the session as it was right after generation `version` was applied.
    #[must_use]
    pub fn at(&self, version: u32) -> Option<Snapshot<'_>> {
        if version == 0 {
            return None;
        }
        Snapshot::new(self.generations.get(..version as usize)?)
    }

    /// Generation `number`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownGeneration`] if it has not been applied.
    pub fn generation(&self, number: u32) -> Result<&Generation> {
        (number as usize)
            .checked_sub(1)
            .and_then(|index| self.generations.get(index))
            .ok_or(Error::UnknownGeneration(number))
    }

    /// Parse `data` and apply it as the next generation.
    ///
    /// The first call applies the baseline, later calls apply deltas. `line_deltas` names
    /// methods that moved in their documents without getting a new body.
    ///
    /// Returns the number of the new generation.
    ///
    /// # Errors
    /// Returns an error if `data` cannot be parsed or the update is inconsistent with the
    /// session; the session is left unchanged.
    pub fn apply_delta(
        &mut self,
        data: &[u8],
        line_deltas: Vec<(MethodId, MethodLineDeltas)>,
    ) -> Result<u32> {
        let metadata = self.reader.read(data)?;
        self.apply_generation(metadata, line_deltas)
    }

    /// Apply already parsed metadata as the next generation.
    ///
    /// # Errors
    /// - [`Error::IdentityConflict`] for line deltas passed along with the baseline, or
    ///   metadata that assigns an identity twice
    /// - [`Error::UnknownMethod`] for a line delta of a method without debug information
    /// - [`Error::LineDeltaMismatch`] for per-point deltas that do not match the method's
    ///   sequence points
    /// - [`Error::LineDeltaOutOfRange`] for deltas that move a sequence point before line 1
    ///   or past the last valid line
    /// - [`Error::Malformed`] if a sequence point blob cannot be decoded
    pub fn apply_generation(
        &mut self,
        metadata: GenerationMetadata,
        line_deltas: Vec<(MethodId, MethodLineDeltas)>,
    ) -> Result<u32> {
        let number = self.version() + 1;
        if number == 1 && !line_deltas.is_empty() {
            return Err(Error::IdentityConflict(
                "line deltas cannot be applied along with the baseline".to_string(),
            ));
        }

        let mut state = self
            .generations
            .last()
            .map(|generation| generation.state.clone())
            .unwrap_or_default();
        let previous_document_count = state.documents.len();

        let document_handles =
            state
                .documents
                .update(&metadata, number, lookup(&self.generations))?;
        let method_handles = state.methods.update(&metadata, number)?;

        let redefined: FxHashSet<MethodId> = method_handles.values().copied().collect();
        let staged = self.stage_line_deltas(&state, &redefined, line_deltas)?;

        state.extents.update_by_line_delta(&staged.by_document);
        for (method, version, spans) in &staged.full_body {
            state.extents.update_full_body(*method, *version, spans);
        }

        let extents =
            MethodExtentIndex::build(&metadata, number, &document_handles, &method_handles)?;
        state.extents.merge(extents);

        for method in &redefined {
            state.deltas.remove(method);
        }
        for (method, deltas) in staged.overlays {
            state.deltas.insert(method, deltas);
        }

        debug!(
            "applied generation {}: {} documents ({} new), {} method records, {} line deltas",
            number,
            metadata.documents.len(),
            state.documents.len() - previous_document_count,
            metadata.method_debug_information.len(),
            state.deltas.len()
        );

        self.generations.push(Generation {
            number,
            metadata: Arc::new(metadata),
            previous_document_count,
            document_handles,
            method_handles,
            state,
        });
        Ok(number)
    }

    /// Validate explicit line deltas against the state before the update and work out how
    /// they move the extent index.
    ///
    /// A uniform shift moves the method's extents as they are. Per-point shifts change the
    /// shape of the method, so its extents are recomputed from the shifted points. Deltas
    /// that would move a visible point off the valid lines are rejected, so a shifted extent
    /// always matches the shifted points.
    fn stage_line_deltas(
        &self,
        state: &EncState,
        redefined: &FxHashSet<MethodId>,
        line_deltas: Vec<(MethodId, MethodLineDeltas)>,
    ) -> Result<StagedDeltas> {
        let mut merged: BTreeMap<MethodId, MethodLineDeltas> = BTreeMap::new();
        for (method, deltas) in line_deltas {
            let entry = merged.entry(method).or_default();
            *entry = entry.merge(&deltas);
        }

        let mut staged = StagedDeltas {
            by_document: FxHashMap::default(),
            full_body: Vec::new(),
            overlays: Vec::with_capacity(merged.len()),
        };

        for (method, deltas) in merged {
            if redefined.contains(&method) {
                warn!(
                    "ignoring line deltas for {}, its body is replaced in the same update",
                    method
                );
                continue;
            }

            let handle = state
                .methods
                .resolve(method)
                .ok_or(Error::UnknownMethod(method))?;
            let owner = self.generation(handle.generation)?;
            let record = owner.metadata.method_debug(handle.row).ok_or_else(|| {
                malformed_error!(
                    "{} points to missing MethodDebugInformation row {}",
                    method,
                    handle.row
                )
            })?;

            let overlay = match state.deltas.get(&method) {
                Some(existing) => existing.merge(&deltas),
                None => deltas.clone(),
            };

            let mut points = record.sequence_points()?;
            if !deltas.per_point.is_empty() {
                check_point_count(method, &deltas, points.len())?;
            }
            if let Some(line) = overlay.out_of_range_line(&points) {
                return Err(Error::LineDeltaOutOfRange { method, line });
            }

            if deltas.is_uniform() {
                for document in state.extents.documents_of(method) {
                    staged
                        .by_document
                        .entry(*document)
                        .or_default()
                        .push((method, deltas.scalar));
                }
            } else {
                overlay.apply(&mut points.0);
                let spans = spans_of(&points, |row| owner.document_id(row))?;
                staged.full_body.push((method, handle.generation, spans));
            }

            staged.overlays.push((method, overlay));
        }

        Ok(staged)
    }
}

fn check_point_count(method: MethodId, deltas: &MethodLineDeltas, expected: usize) -> Result<()> {
    if deltas.per_point.len() == expected {
        return Ok(());
    }

    Err(Error::LineDeltaMismatch {
        method,
        expected,
        actual: deltas.per_point.len(),
    })
}
