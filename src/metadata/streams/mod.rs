//! Metadata streams of a Portable PDB.
//!
//! A Portable PDB (and every EnC delta of it) is a plain ECMA-335 metadata blob. Only the
//! streams needed for document and method debug identity are parsed:
//!
//! - [`StreamHeader`] - Name, offset and size of one stream
//! - [`TablesHeader`] - The `#~` stream, locating the debug tables
//! - [`PdbStream`] - The `#Pdb` stream of a baseline
//! - [`Blob`] - The `#Blob` heap (document names, hashes, sequence points)
//! - [`Guid`] - The `#GUID` heap (hash algorithms, languages)
//!
//! `#Strings` and `#US` are accepted but never read, since no supported table references
//! them. A `#JTD` stream only matters for the index widths it forces.

mod blob;
mod guid;
mod pdb;
mod streamheader;
mod tablesheader;

pub use blob::Blob;
pub use guid::Guid;
pub use pdb::PdbStream;
pub use streamheader::{StreamHeader, STREAM_NAMES};
pub use tablesheader::TablesHeader;
