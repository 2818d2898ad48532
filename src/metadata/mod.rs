//! Portable PDB metadata.
//!
//! Everything needed to turn the bytes of one baseline or delta into the
//! [`view::GenerationMetadata`] the Edit-and-Continue session works on.
//!
//! # Key Components
//!
//! - [`root`] - Metadata root and stream directory
//! - [`streams`] - The `#~`, `#Pdb`, `#Blob` and `#GUID` streams
//! - [`tables`] - `Document`, `MethodDebugInformation` and `EncMap` rows
//! - [`sequencepoints`] - Sequence point blob decoding and encoding
//! - [`token`] - Metadata table row references
//! - [`view`] - The owned per-generation view and the [`view::MetadataReader`] trait
//! - [`reader`] / [`writer`] - Portable PDB metadata to view and back
//!
//! # Examples
//!
//! ```rust,no_run
//! use pdbscope::metadata::reader::PortablePdbReader;
//!
//! let data = std::fs::read("App.pdb")?;
//! let view = PortablePdbReader::parse(&data)?;
//! for document in &view.documents {
//!     println!("{}: {}", document.rid, document.name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Portable PDB metadata reader
pub mod reader;
/// Implementation of the root metadata structure
pub mod root;
/// Sequence point blob codec
pub mod sequencepoints;
/// Implementation of the metadata streams
pub mod streams;
/// Implementation of the debug metadata tables
pub mod tables;
/// Metadata tokens
pub mod token;
/// The per-generation metadata view
pub mod view;
/// Portable PDB metadata writer
pub mod writer;
