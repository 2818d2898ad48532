//! Maps [`MethodId`]s to the generation holding their latest debug record.

use log::trace;
use rustc_hash::FxHashMap;

use crate::{enc::ids::MethodId, metadata::view::GenerationMetadata, Error, Result};

/// The MethodDebugInformation row holding the current version of a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    /// MethodDebugInformation row in the owning generation
    pub row: u32,
    /// Generation that declared the current version
    pub generation: u32,
}

/// Method identities of one session state.
#[derive(Clone, Debug, Default)]
pub struct MethodIdentityMap {
    methods: imbl::HashMap<MethodId, MethodHandle>,
}

impl MethodIdentityMap {
    /// Number of methods with debug information.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no method is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Where the current debug record of `method` lives.
    #[must_use]
    pub fn resolve(&self, method: MethodId) -> Option<MethodHandle> {
        self.methods.get(&method).copied()
    }

    /// Merge the method debug records of a new generation.
    ///
    /// In the baseline, row `n` belongs to method `n`. In a delta, row `i` belongs to the
    /// method named by the `i`-th MethodDebugInformation entry of the EncMap.
    ///
    /// Returns the [`MethodId`] of every MethodDebugInformation row of `view`.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if the EncMap does not cover every row, or
    /// [`Error::IdentityConflict`] if it names a method twice.
    pub fn update(
        &mut self,
        view: &GenerationMetadata,
        generation: u32,
    ) -> Result<FxHashMap<u32, MethodId>> {
        let rows = &view.method_debug_information;
        let ids: Vec<MethodId> = if generation == 1 {
            rows.iter().map(|row| MethodId::new(row.rid)).collect()
        } else {
            view.method_debug_tokens()
                .map(|token| MethodId::new(token.row()))
                .collect()
        };

        if ids.len() != rows.len() {
            return Err(malformed_error!(
                "EncMap names {} MethodDebugInformation rows, generation {} has {}",
                ids.len(),
                generation,
                rows.len()
            ));
        }

        let mut handles = FxHashMap::with_capacity_and_hasher(rows.len(), Default::default());
        for (row, id) in rows.iter().zip(ids) {
            if id.value() == 0 {
                return Err(malformed_error!("EncMap references MethodDebugInformation row 0"));
            }

            if self
                .resolve(id)
                .is_some_and(|handle| handle.generation == generation)
            {
                return Err(Error::IdentityConflict(format!(
                    "{} is redefined twice in generation {}",
                    id, generation
                )));
            }

            trace!(
                "generation {}: method debug row {} is {}",
                generation,
                row.rid,
                id
            );
            self.methods.insert(
                id,
                MethodHandle {
                    row: row.rid,
                    generation,
                },
            );
            handles.insert(row.rid, id);
        }

        Ok(handles)
    }
}
