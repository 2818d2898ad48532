//! Shared helpers for encoding metadata values and handling document paths.
//!
//! - [`write_compressed_uint`] / [`write_compressed_int`] - ECMA-335 II.23.2 encoders, the
//!   inverse of [`crate::Parser::read_compressed_uint`] and [`crate::Parser::read_compressed_int`]
//! - [`file_name`] - Last path component of a document path, used for document grouping
//! - [`to_u32`] - Checked narrowing for serialized sizes and counts

mod compressed;
mod math;
mod path;

pub use compressed::{write_compressed_int, write_compressed_uint};
pub use math::to_u32;
pub use path::file_name;
