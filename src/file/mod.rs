//! Binary input primitives.
//!
//! Portable PDB generations reach this crate as already-loaded byte buffers (the debugger
//! host owns file and stream I/O). This module only provides the bounds-checked readers
//! used to walk those buffers.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Cursor-based parser with ECMA-335 compressed integer support
//! - [`crate::file::io`] - Low-level endian-aware primitive reads and writes

pub mod io;
pub mod parser;
