//! Core definitions (error taxonomy, result type and verification macros),
//! relied upon by all blocksplit-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
