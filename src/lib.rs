// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # pdbscope
//!
//! Symbol state for .NET Edit-and-Continue debugging sessions, built on Portable PDB.
//!
//! While a debugger applies edits to a running process, the compiler emits one metadata
//! delta per edit. Each delta numbers its `Document` and `MethodDebugInformation` rows from
//! 1 again and only carries what changed. `pdbscope` folds the baseline PDB and every
//! delta into a single, versioned view:
//!
//! - **Durable identities** - a [`DocumentId`](enc::DocumentId) per source file and a
//!   [`MethodId`](enc::MethodId) per method, valid across all generations
//! - **Line to method lookup** - which methods (including nested lambdas) contain a line,
//!   answered by binary search over per-document extent runs
//! - **Line deltas** - methods that only moved in their file are shifted without a new body
//! - **Versioned queries** - every applied generation stays queryable as it was
//! - **Transactional updates** - a delta that fails to apply leaves the session untouched
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! pdbscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use pdbscope::prelude::*;
//!
//! let baseline = std::fs::read("bin/App.pdb")?;
//! let mut session = EncSession::default();
//! session.apply_delta(&baseline, Vec::new())?;
//!
//! let snapshot = session.current().expect("baseline applied");
//! if let Some(document) = snapshot.resolve_document("Program.cs") {
//!     println!("methods at line 10: {:?}", snapshot.methods_containing(document, 10));
//!     println!("next stoppable line: {:?}", snapshot.closest_line(document, 10));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Applying Edits
//!
//! ```rust,no_run
//! use pdbscope::prelude::*;
//!
//! # fn deltas() -> Vec<Vec<u8>> { Vec::new() }
//! let mut session = EncSession::default();
//! session.apply_delta(&std::fs::read("bin/App.pdb")?, Vec::new())?;
//!
//! for delta in deltas() {
//!     // Method 0x06000004 moved two lines down without being recompiled
//!     let moved = vec![(MethodId::new(4), MethodLineDeltas::scalar(2))];
//!     session.apply_delta(&delta, moved)?;
//! }
//!
//! // The baseline is still available as it was
//! let baseline = session.at(1).expect("baseline applied");
//! println!("{} documents in the baseline", baseline.document_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Portable PDB metadata reader and writer, the sequence point codec
//! - [`enc`] - Identity maps, the method extent index and the session
//!
//! ## Standards Compliance
//!
//! ### References
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Metadata physical layout
//! - [Portable PDB Spec](https://github.com/dotnet/runtime/blob/main/docs/design/specs/PortablePdb-Metadata.md) - Debug tables and blob formats
//! - [EnC delta layout](https://github.com/dotnet/runtime/blob/main/docs/design/specs/Ecma-335-Augments.md) - `EncLog` / `EncMap`
//!
//! ## Error Handling
//!
//! Ingesting data returns [`Result<T, Error>`](Result); queries return `Option` or empty
//! collections, since "no method at this line" is an ordinary answer during editing.
//!
//! ```rust,no_run
//! use pdbscope::{EncSession, Error};
//!
//! let mut session = EncSession::default();
//! match session.apply_delta(&[0u8; 16], Vec::new()) {
//!     Ok(version) => println!("now at generation {}", version),
//!     Err(e) if e.is_malformed_input() => println!("symbols could not be updated: {}", e),
//!     Err(e) => println!("caller error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run sequencepoints --release
//! cargo +nightly fuzz run pdb --release -- -jobs=4 -fork=1
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod utils;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use pdbscope::prelude::*;
///
/// let session: EncSession = EncSession::new(PortablePdbReader);
/// assert_eq!(session.phase(), SessionPhase::Empty);
/// ```
pub mod prelude;

/// Portable PDB metadata: root, streams, debug tables and sequence points
///
/// This module turns the bytes of a baseline PDB or an Edit-and-Continue delta into a
/// [`metadata::view::GenerationMetadata`], and back.
///
/// # Key Components
///
/// - [`metadata::reader::PortablePdbReader`] - Reads a generation
/// - [`metadata::writer::write_metadata`] - Writes a generation
/// - [`metadata::sequencepoints`] - Sequence point blob codec
/// - [`metadata::tables`] - `Document`, `MethodDebugInformation`, `EncMap`
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::metadata::sequencepoints::SequencePointsBlob;
///
/// let blob = SequencePointsBlob::decode(&[0x00, 0x00, 0x01, 0x02, 0x0A, 0x05], Some(1))?;
/// println!("{:?}", blob.points);
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub mod metadata;

/// Edit-and-Continue symbol state
///
/// Durable document and method identities, the per-document method extent index, line
/// deltas and the [`EncSession`] that applies generations transactionally.
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::enc::{EncSession, MethodId};
///
/// let mut session = EncSession::default();
/// session.apply_delta(&std::fs::read("App.pdb")?, Vec::new())?;
/// if let Some(snapshot) = session.current() {
///     println!("{:?}", snapshot.sequence_points(MethodId::new(1)));
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod enc;

/// `pdbscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `pdbscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::{Error, metadata::reader::PortablePdbReader};
///
/// match PortablePdbReader::parse(&[0u8; 64]) {
///     Ok(view) => println!("{} documents", view.documents.len()),
///     Err(Error::NotSupported(what)) => println!("Not supported: {}", what),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The session entry point, see [`enc::EncSession`].
pub use enc::EncSession;

/// Metadata streams and heaps for direct access to Portable PDB data structures.
pub use metadata::streams::{Blob, Guid, PdbStream, StreamHeader, TablesHeader};

/// Provides access to the low-level cursor used to decode blobs.
///
/// # Example
///
/// ```rust
/// use pdbscope::Parser;
///
/// let mut parser = Parser::new(&[0x81, 0x00]);
/// assert_eq!(parser.read_compressed_uint()?, 0x100);
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub use file::parser::Parser;
