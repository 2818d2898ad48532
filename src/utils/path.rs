//! Document path helpers.

/// Returns the last component of a document path.
///
/// Portable PDBs record the paths the compiler saw, so both `/` and `\` are treated as
/// separators regardless of the host platform. A drive prefix such as `C:` is dropped as
/// well. A path ending in a separator yields an empty file name.
#[must_use]
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\', ':']) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}
