//! # pdbscope Prelude
//!
//! The types needed to run an Edit-and-Continue session and inspect Portable PDB metadata.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pdbscope operations
pub use crate::Error;

/// The result type used throughout pdbscope
pub use crate::Result;

// ================================================================================================
// Session
// ================================================================================================

/// Session, versioned views and generations
pub use crate::enc::{EncSession, Generation, SessionPhase, Snapshot};

/// Durable identities
pub use crate::enc::{DocumentId, MethodId};

/// Line moves of methods without a new body
pub use crate::enc::MethodLineDeltas;

/// Line ranges of methods
pub use crate::enc::{MethodExtent, MethodHandle};

// ================================================================================================
// Metadata
// ================================================================================================

/// Producing the per-generation view
pub use crate::metadata::{
    reader::PortablePdbReader,
    view::{GenerationMetadata, MetadataReader},
    writer::write_metadata,
};

/// Debug table rows
pub use crate::metadata::tables::{Document, MethodDebugInformation};

/// Sequence points
pub use crate::metadata::sequencepoints::{SequencePoint, SequencePoints, SequencePointsBlob};

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Low-level blob cursor
pub use crate::Parser;
