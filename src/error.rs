use thiserror::Error;

use crate::enc::MethodId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors are only ever produced while *ingesting* data: decoding a sequence point blob,
/// reading a Portable PDB metadata blob, or applying a new generation to an
/// [`crate::enc::EncSession`]. Queries against an already published generation never fail;
/// a document without methods or a line without code is reported through `Option` or an
/// empty collection instead.
///
/// # Error Categories
///
/// ## Malformed input
/// - [`Error::Malformed`] - A blob or table contains an invalid or out-of-range field
/// - [`Error::OutOfBounds`] - A read would run past the end of the provided data
/// - [`Error::NotSupported`] - The metadata uses a layout this reader does not handle
///
/// ## Session updates
/// - [`Error::IdentityConflict`] - The update would give two records the same identity
/// - [`Error::LineDeltaMismatch`] - Explicit line deltas disagree with the method's sequence points
/// - [`Error::LineDeltaOutOfRange`] - Explicit line deltas move a sequence point off the valid lines
/// - [`Error::UnknownMethod`] - An explicit line delta names a method without debug information
/// - [`Error::UnknownGeneration`] - A generation number outside the session's history
///
/// Any error returned from [`crate::enc::EncSession::apply_delta`] leaves the session exactly
/// as it was before the call.
///
/// # Examples
///
/// ```rust
/// use pdbscope::{Error, metadata::sequencepoints::SequencePointsBlob};
///
/// match SequencePointsBlob::decode(&[0x00, 0x05], Some(1)) {
///     Ok(blob) => println!("{} points", blob.points.len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed blob: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The metadata uses tables or streams this reader does not support.
    ///
    /// Portable PDB blobs normally only carry debug tables (plus `EncLog`/`EncMap`
    /// in deltas). Metadata that embeds type-system tables cannot be sized without a
    /// full ECMA-335 table schema and is rejected.
    #[error("This metadata layout is not supported - {0}")]
    NotSupported(String),

    /// Applying the update would assign an identity twice.
    ///
    /// Only caller bugs lead here, for example replaying the same delta or passing line
    /// deltas along with a baseline. Treated like malformed input: the update is rejected.
    #[error("Identity conflict - {0}")]
    IdentityConflict(String),

    /// Per-sequence-point line deltas do not line up with the method's sequence points.
    #[error("Line deltas for {method} have {actual} entries, method has {expected} sequence points")]
    LineDeltaMismatch {
        /// The method the deltas were supplied for
        method: MethodId,
        /// Number of sequence points the method currently has
        expected: usize,
        /// Number of per-point deltas supplied
        actual: usize,
    },

    /// Line deltas would move a sequence point of the method outside the valid line range.
    #[error("Line deltas for {method} move a sequence point to line {line}")]
    LineDeltaOutOfRange {
        /// The method the deltas were supplied for
        method: MethodId,
        /// The first shifted line that is out of range
        line: i64,
    },

    /// An explicit line delta names a method that has no debug information.
    #[error("Method {0} has no debug information in this session")]
    UnknownMethod(MethodId),

    /// The requested generation does not exist.
    #[error("Generation {0} does not exist")]
    UnknownGeneration(u32),
}

impl Error {
    /// Returns `true` for errors caused by damaged or unsupported input data.
    ///
    /// These are the failures a debugger host reports as "symbols could not be updated",
    /// as opposed to errors that signal misuse of the session API.
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::Malformed { .. }
                | Error::OutOfBounds { .. }
                | Error::NotSupported(_)
                | Error::IdentityConflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_macro_captures_location() {
        let err = malformed_error!("bad value - {}", 42);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad value - 42");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn classification() {
        assert!(out_of_bounds_error!().is_malformed_input());
        assert!(Error::IdentityConflict("twice".into()).is_malformed_input());
        assert!(!Error::UnknownMethod(MethodId::new(3)).is_malformed_input());
        assert!(!Error::LineDeltaMismatch {
            method: MethodId::new(1),
            expected: 2,
            actual: 3
        }
        .is_malformed_input());
    }
}
