//! Edit-and-Continue symbol state.
//!
//! An [`EncSession`] receives the baseline Portable PDB of a module followed by the
//! metadata deltas the compiler emits for every edit. It keeps durable identities for
//! documents and methods across those generations and an index of the source lines every
//! method covers, so a debugger can map breakpoints and stepping positions onto the
//! current code.
//!
//! # Key Components
//!
//! - [`DocumentId`] / [`MethodId`] - Identities that stay valid across generations
//! - [`DocumentIdentityMap`] - Document paths to ids
//! - [`MethodIdentityMap`] - Method ids to their latest debug record
//! - [`MethodExtentIndex`] - Per-document line ranges of methods
//! - [`MethodLineDeltas`] - Line moves not yet reflected in a new method body
//! - [`EncSession`] / [`Snapshot`] - Applying generations and querying any version

mod documents;
mod extents;
mod generation;
mod ids;
mod linedeltas;
mod methods;
mod session;

pub use documents::{DocumentIdentityMap, DocumentInfo};
pub use extents::{
    partition, spans_of, DocumentSpan, MethodExtent, MethodExtentIndex, MethodExtents, Runs,
};
pub use generation::{Generation, Snapshot};
pub use ids::{DocumentId, MethodId};
pub use linedeltas::MethodLineDeltas;
pub use methods::{MethodHandle, MethodIdentityMap};
pub use session::{EncSession, SessionPhase};
