//! Maps document paths to durable [`DocumentId`]s across generations.
//!
//! Documents are grouped by their file name (the last path component), compared
//! case-insensitively. A delta that re-declares a path already known keeps the existing id
//! and moves ownership to the new generation; a new path gets a fresh id, even when another
//! document with the same file name exists.

use log::trace;
use rustc_hash::FxHashMap;

use crate::{
    enc::ids::DocumentId,
    metadata::{tables::Document, view::GenerationMetadata},
    utils::file_name,
    Error, Result,
};

/// Where the current version of a document lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Document row in the owning generation
    pub handle: u32,
    /// Generation that declared the current version
    pub generation: u32,
    /// File name portion of the path, used for grouping
    pub file_name: String,
}

/// Document identities of one session state.
///
/// Backed by persistent collections, so cloning is cheap and the session can stage an
/// update on a clone while older snapshots keep their own view.
#[derive(Clone, Debug, Default)]
pub struct DocumentIdentityMap {
    documents: imbl::Vector<DocumentInfo>,
    groups: imbl::HashMap<String, Vec<DocumentId>>,
}

impl DocumentIdentityMap {
    /// Number of documents known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no document is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Where the current version of `id` lives.
    #[must_use]
    pub fn info(&self, id: DocumentId) -> Option<&DocumentInfo> {
        if id.value() == 0 {
            return None;
        }
        self.documents.get(id.index())
    }

    /// All document ids, in assignment order.
    pub fn ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        (1..=self.documents.len()).map(|id| DocumentId::new(id as u32))
    }

    /// Merge the documents of a new generation.
    ///
    /// Returns the id of every Document row of `view`. `metadata` gives access to the
    /// metadata of already published generations, which is needed to compare full paths of
    /// existing documents.
    ///
    /// # Errors
    /// Returns [`Error::IdentityConflict`] if `view` declares the same path twice.
    pub fn update<'a, F>(
        &mut self,
        view: &GenerationMetadata,
        generation: u32,
        metadata: F,
    ) -> Result<FxHashMap<u32, DocumentId>>
    where
        F: Fn(u32) -> Option<&'a GenerationMetadata>,
    {
        let mut handles =
            FxHashMap::with_capacity_and_hasher(view.documents.len(), Default::default());

        for document in &view.documents {
            let name = file_name(&document.name);
            let key = fold_case(name);

            let existing = self.groups.get(&key).and_then(|group| {
                group.iter().copied().find(|id| {
                    self.path_in(*id, view, generation, &metadata) == Some(document.name.as_str())
                })
            });

            let id = match existing {
                Some(id) => {
                    if self.info(id).map(|info| info.generation) == Some(generation) {
                        return Err(Error::IdentityConflict(format!(
                            "document '{}' is declared twice in generation {}",
                            document.name, generation
                        )));
                    }

                    trace!(
                        "generation {}: document row {} '{}' redefines {}",
                        generation,
                        document.rid,
                        document.name,
                        id
                    );
                    self.documents.set(
                        id.index(),
                        DocumentInfo {
                            handle: document.rid,
                            generation,
                            file_name: name.to_string(),
                        },
                    );
                    id
                }
                None => {
                    let id = DocumentId::new(self.documents.len() as u32 + 1);
                    trace!(
                        "generation {}: document row {} '{}' is new {}",
                        generation,
                        document.rid,
                        document.name,
                        id
                    );
                    self.documents.push_back(DocumentInfo {
                        handle: document.rid,
                        generation,
                        file_name: name.to_string(),
                    });

                    let mut group = self.groups.get(&key).cloned().unwrap_or_default();
                    group.push(id);
                    self.groups.insert(key, group);
                    id
                }
            };

            handles.insert(document.rid, id);
        }

        Ok(handles)
    }

    /// Resolve a document path.
    ///
    /// Documents are matched by file name, ignoring case. When several documents share the
    /// file name, the first rule that yields a match decides:
    ///
    /// 1. the full path matches exactly
    /// 2. the full path matches ignoring case
    /// 3. the file name matches exactly
    /// 4. the smallest id of the group
    pub fn resolve<'a, F>(&self, path: &str, metadata: F) -> Option<DocumentId>
    where
        F: Fn(u32) -> Option<&'a GenerationMetadata>,
    {
        let name = file_name(path);
        let group = self.groups.get(&fold_case(name))?;
        if let [only] = group.as_slice() {
            return Some(*only);
        }

        let paths: Vec<(DocumentId, Option<&str>)> = group
            .iter()
            .map(|id| (*id, self.document(*id, &metadata).map(|d| d.name.as_str())))
            .collect();

        let exact = paths.iter().find(|(_, p)| *p == Some(path));
        let folded = fold_case(path);
        let ignoring_case = || {
            paths
                .iter()
                .find(|(_, p)| p.is_some_and(|p| fold_case(p) == folded))
        };
        let same_name = || {
            group.iter().find(|id| {
                self.info(**id)
                    .is_some_and(|info| info.file_name == name)
            })
        };

        exact
            .or_else(ignoring_case)
            .map(|(id, _)| *id)
            .or_else(|| same_name().copied())
            .or_else(|| group.iter().min().copied())
    }

    /// The current version of document `id`, read through the generation that owns it.
    pub fn document<'a, F>(&self, id: DocumentId, metadata: F) -> Option<&'a Document>
    where
        F: Fn(u32) -> Option<&'a GenerationMetadata>,
    {
        let info = self.info(id)?;
        metadata(info.generation)?.document(info.handle)
    }

    fn path_in<'a, 'b, F>(
        &self,
        id: DocumentId,
        view: &'b GenerationMetadata,
        generation: u32,
        metadata: &F,
    ) -> Option<&'b str>
    where
        F: Fn(u32) -> Option<&'a GenerationMetadata>,
        'a: 'b,
    {
        let info = self.info(id)?;
        let owner = if info.generation == generation {
            view
        } else {
            metadata(info.generation)?
        };
        owner.document(info.handle).map(|d| d.name.as_str())
    }
}

/// Case folding shared by file name grouping and full path comparison.
fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::documents_only;

    fn apply(
        map: &mut DocumentIdentityMap,
        history: &mut Vec<GenerationMetadata>,
        view: GenerationMetadata,
    ) -> Result<FxHashMap<u32, DocumentId>> {
        let generation = history.len() as u32 + 1;
        let handles = {
            let published: &[GenerationMetadata] = history;
            map.update(&view, generation, |g| published.get(g as usize - 1))?
        };
        history.push(view);
        Ok(handles)
    }

    #[test]
    fn new_documents_get_new_ids() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();

        let handles = apply(
            &mut map,
            &mut history,
            documents_only(&["/src/A.cs", "/src/B.cs", "/test/A.cs"]),
        )
        .unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(handles[&1], DocumentId::new(1));
        assert_eq!(handles[&3], DocumentId::new(3));

        let lookup = |g: u32| history.get(g as usize - 1);
        assert_eq!(map.resolve("/src/B.cs", lookup), Some(DocumentId::new(2)));
        assert_eq!(map.resolve("/test/A.cs", lookup), Some(DocumentId::new(3)));
        assert_eq!(map.resolve("/src/C.cs", lookup), None);
    }

    #[test]
    fn redefinition_keeps_id() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();

        apply(&mut map, &mut history, documents_only(&["/src/A.cs", "/src/B.cs"])).unwrap();
        let handles =
            apply(&mut map, &mut history, documents_only(&["/src/B.cs", "/other/B.cs"])).unwrap();

        assert_eq!(handles[&1], DocumentId::new(2));
        assert_eq!(handles[&2], DocumentId::new(3));
        assert_eq!(map.len(), 3);

        let info = map.info(DocumentId::new(2)).unwrap();
        assert_eq!(info.generation, 2);
        assert_eq!(info.handle, 1);
        assert_eq!(map.info(DocumentId::new(1)).unwrap().generation, 1);
    }

    #[test]
    fn duplicate_path_in_one_generation() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();

        let result = apply(
            &mut map,
            &mut history,
            documents_only(&["/src/A.cs", "/src/A.cs"]),
        );
        assert!(matches!(result, Err(Error::IdentityConflict(_))));
    }

    #[test]
    fn resolve_tie_breaks() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();

        apply(
            &mut map,
            &mut history,
            documents_only(&["/one/Foo.cs", "/two/foo.cs", "/three/FOO.CS"]),
        )
        .unwrap();
        let lookup = |g: u32| history.get(g as usize - 1);

        // exact full path
        assert_eq!(map.resolve("/two/foo.cs", lookup), Some(DocumentId::new(2)));
        // full path ignoring case
        assert_eq!(map.resolve("/THREE/foo.cs", lookup), Some(DocumentId::new(3)));
        // exact file name
        assert_eq!(map.resolve("/elsewhere/Foo.cs", lookup), Some(DocumentId::new(1)));
        assert_eq!(map.resolve("foo.cs", lookup), Some(DocumentId::new(2)));
        // nothing better, smallest id
        assert_eq!(map.resolve("/x/fOO.cs", lookup), Some(DocumentId::new(1)));
    }

    #[test]
    fn resolve_folds_non_ascii_case() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();

        apply(
            &mut map,
            &mut history,
            documents_only(&["/SRC/Äpfel.cs", "/lib/äpfel.cs"]),
        )
        .unwrap();
        let lookup = |g: u32| history.get(g as usize - 1);

        // full path ignoring case wins over the exact file name of the other document
        assert_eq!(map.resolve("/src/äpfel.cs", lookup), Some(DocumentId::new(1)));
        assert_eq!(map.resolve("/LIB/ÄPFEL.CS", lookup), Some(DocumentId::new(2)));
    }

    #[test]
    fn resolve_single_candidate_ignores_directory() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();

        apply(&mut map, &mut history, documents_only(&["C:\\src\\Program.cs"])).unwrap();
        let lookup = |g: u32| history.get(g as usize - 1);

        assert_eq!(map.resolve("program.cs", lookup), Some(DocumentId::new(1)));
        assert_eq!(
            map.document(DocumentId::new(1), lookup).map(|d| d.name.as_str()),
            Some("C:\\src\\Program.cs")
        );
        assert_eq!(map.info(DocumentId::new(0)), None);
        assert_eq!(map.info(DocumentId::new(2)), None);
    }

    #[test]
    fn clones_are_independent() {
        let mut map = DocumentIdentityMap::default();
        let mut history = Vec::new();
        apply(&mut map, &mut history, documents_only(&["/src/A.cs"])).unwrap();

        let before = map.clone();
        apply(&mut map, &mut history, documents_only(&["/src/A.cs", "/src/B.cs"])).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(before.info(DocumentId::new(1)).unwrap().generation, 1);
        assert_eq!(map.len(), 2);
        assert_eq!(map.info(DocumentId::new(1)).unwrap().generation, 2);
    }
}
