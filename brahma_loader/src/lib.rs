//! Header Loading and Declaration Extraction
//!
//! This crate reads C headers from disk, evaluates their conditional
//! blocks, follows their include directives and reports every top-level
//! declaration in source order. It also owns
//! the YAML configuration that describes which headers to process.

pub mod config;
pub mod error;
pub mod expr;
pub mod macros;
pub mod parser;
pub mod preprocess;
pub mod resolver;
pub mod source;
pub mod strip;

// Re-export commonly used types at the crate root
pub use config::{GeneratorConfig, InterfaceRule, OutputConfig};
pub use error::{ConfigError, LoadError};
pub use macros::{MacroDefinition, MacroTable};
pub use parser::parse_header_source;
pub use preprocess::{Preprocessor, TranslationUnit};
pub use resolver::{HeaderResolver, IncludeDirective};
pub use source::{CHeaderSource, DeclarationSource};
pub use strip::MacroStripper;

// Re-export brahma_types for convenience
pub use brahma_types;
