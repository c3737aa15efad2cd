use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/* An #include directive as written in the header */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeDirective {
    /* #include "file.h" */
    Quoted(String),
    /* #include <file.h> */
    System(String),
}

impl IncludeDirective {
    /* Build from the raw path token, quotes or angle brackets included */
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Some(inner) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Some(IncludeDirective::Quoted(inner.to_string()));
        }
        if let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return Some(IncludeDirective::System(inner.to_string()));
        }
        None
    }

    pub fn path(&self) -> &str {
        match self {
            IncludeDirective::Quoted(path) | IncludeDirective::System(path) => path,
        }
    }
}

/* Include resolver for locating headers and parsing each one only once */
pub struct HeaderResolver {
    /* Track loaded files so repeated or circular includes are skipped */
    loaded_files: HashSet<PathBuf>,

    /* Include directories for searching headers */
    include_dirs: Vec<PathBuf>,
}

impl HeaderResolver {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            loaded_files: HashSet::new(),
            include_dirs,
        }
    }

    /* Quoted includes are tried relative to the including file first, then the
     * include directories. System includes only search the include directories. */
    pub fn resolve(&self, directive: &IncludeDirective, including_file: &Path) -> Option<PathBuf> {
        if let IncludeDirective::Quoted(path) = directive {
            if let Some(parent) = including_file.parent() {
                let relative_path = parent.join(path);
                if relative_path.is_file() {
                    return Some(relative_path);
                }
            }
        }

        for include_dir in &self.include_dirs {
            let include_path = include_dir.join(directive.path());
            if include_path.is_file() {
                return Some(include_path);
            }
        }

        debug!(
            include = directive.path(),
            from = %including_file.display(),
            "include not found, skipping"
        );
        None
    }

    /* Record a file as loaded. Returns false if it was already loaded. */
    pub fn mark_loaded(&mut self, path: &Path) -> bool {
        let canonical_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.loaded_files.insert(canonical_path)
    }

    pub fn loaded_file_count(&self) -> usize {
        self.loaded_files.len()
    }
}
