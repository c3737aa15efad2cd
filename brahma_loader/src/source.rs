use crate::config::{GeneratorConfig, InterfaceRule};
use crate::error::LoadError;
use crate::macros::MacroTable;
use crate::parser::HeaderParser;
use crate::preprocess::Preprocessor;
use crate::resolver::HeaderResolver;
use crate::strip::MacroStripper;
use brahma_types::Declaration;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies the ordered function declarations of a header.
///
/// Implementations must report declarations in source order, with the
/// contents of included headers at the position of their include directive.
pub trait DeclarationSource {
    fn parse(&self, header: &Path) -> Result<Vec<Declaration>, LoadError>;
}

/* In-memory declarations, handy for callers that already parsed their header */
impl DeclarationSource for Vec<Declaration> {
    fn parse(&self, _header: &Path) -> Result<Vec<Declaration>, LoadError> {
        Ok(self.clone())
    }
}

/* Declaration source backed by the tree-sitter C grammar */
#[derive(Debug, Clone)]
pub struct CHeaderSource {
    include_dirs: Vec<PathBuf>,
    strip_macros: Vec<String>,
    /* NAME or NAME=VALUE, seeded before the header is read */
    defines: Vec<String>,
    follow_includes: bool,
}

impl CHeaderSource {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            strip_macros: Vec::new(),
            defines: Vec::new(),
            follow_includes: true,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            include_dirs: config.include_dirs.clone(),
            strip_macros: config.strip_macros.clone(),
            defines: config.defines.clone(),
            follow_includes: config.follow_includes,
        }
    }

    /* Global settings plus the rule's own strip list */
    pub fn for_rule(config: &GeneratorConfig, rule: &InterfaceRule) -> Self {
        let mut strip_macros = config.strip_macros.clone();
        for name in &rule.strip_macros {
            if !strip_macros.contains(name) {
                strip_macros.push(name.clone());
            }
        }
        Self::from_config(config).with_strip_macros(strip_macros)
    }

    pub fn with_strip_macros(mut self, names: Vec<String>) -> Self {
        self.strip_macros = names;
        self
    }

    pub fn with_defines(mut self, defines: Vec<String>) -> Self {
        self.defines = defines;
        self
    }

    pub fn with_follow_includes(mut self, follow: bool) -> Self {
        self.follow_includes = follow;
        self
    }
}

impl DeclarationSource for CHeaderSource {
    fn parse(&self, header: &Path) -> Result<Vec<Declaration>, LoadError> {
        /* Fresh parser state per call: each run sees every header exactly once */
        let preprocessor = Preprocessor::new(
            HeaderResolver::new(self.include_dirs.clone()),
            MacroTable::from_command_line(&self.defines),
            self.follow_includes,
        );
        let mut parser = HeaderParser::new(preprocessor, MacroStripper::new(&self.strip_macros))?;

        let declarations = parser.parse_file(header)?;
        debug!(
            header = %header.display(),
            files = parser.loaded_file_count(),
            declarations = declarations.len(),
            "parsed header"
        );
        Ok(declarations)
    }
}
