//! GOTCHA Interface Generation
//!
//! This crate turns the function declarations of a C header into a pair of
//! brahma interception sources: a C++ interface header declaring one virtual
//! method per function and an implementation file holding the GOTCHA
//! bindings and pass-through wrappers.

pub mod codegen;
pub mod error;
pub mod extract;
pub mod registry;
pub mod sink;

// Re-export commonly used types at the crate root
pub use codegen::gotcha::{GotchaCodeGenerator, GotchaCodeGeneratorOptions};
pub use codegen::gotcha_gen::{FragmentBundle, GeneratedModule, ModuleAssembler, Namespace, RenderedArgs};
pub use error::GenError;
pub use extract::extract;
pub use registry::{InterfaceRegistry, InterfaceTarget};
pub use sink::{FormatStatus, Formatter, FsSink, OutputSink, WrittenModule};
