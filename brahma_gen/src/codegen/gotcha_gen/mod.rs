pub mod args;
pub mod fragments;
pub mod module;
pub mod namespace;

// Re-export main public functions
pub use args::{RenderedArgs, format_parameter, render};
pub use fragments::{FragmentBundle, emit_all};
pub use module::{FragmentSet, GeneratedModule, ModuleAssembler};
pub use namespace::Namespace;
