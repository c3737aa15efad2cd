//! Interception Type Definitions
//!
//! This crate contains the data model shared by the header loader and the
//! interface generator. It provides pure data structures for representing
//! C function declarations and their normalized signatures without any file
//! I/O or code generation logic.

pub mod decl;
pub mod signature;

// Re-export commonly used types at the crate root
pub use decl::*;
pub use signature::*;
