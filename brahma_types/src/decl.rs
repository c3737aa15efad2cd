use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;

/* ============================================================================
   Raw declarations as reported by a declaration source
   ============================================================================ */

/* Kind of a top-level declaration */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum DeclarationKind {
    Function,
    Other,
}

/* Shape of a parameter's type as the parser saw it */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ParamTypeKind {
    Scalar,
    IncompleteArray,
    ConstantArray,
}

/* Where a declaration was found, for diagnostics only */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SourceLocation {
    pub file: PathBuf,
    /* 1-indexed */
    pub line: usize,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RawParameter {
    pub name: String,
    pub kind: ParamTypeKind,
    /* Full type spelling, e.g. "const char *" or "double[4]" */
    pub spelling: String,
    #[serde(default)]
    pub element_spelling: Option<String>,
    #[serde(default)]
    pub element_count: Option<u64>,
}

impl RawParameter {
    pub fn scalar(name: impl Into<String>, spelling: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamTypeKind::Scalar,
            spelling: spelling.into(),
            element_spelling: None,
            element_count: None,
        }
    }

    pub fn incomplete_array(name: impl Into<String>, element: impl Into<String>) -> Self {
        let element = element.into();
        Self {
            name: name.into(),
            kind: ParamTypeKind::IncompleteArray,
            spelling: format!("{}[]", element),
            element_spelling: Some(element),
            element_count: None,
        }
    }

    pub fn constant_array(name: impl Into<String>, element: impl Into<String>, count: u64) -> Self {
        let element = element.into();
        Self {
            name: name.into(),
            kind: ParamTypeKind::ConstantArray,
            spelling: format!("{}[{}]", element, count),
            element_spelling: Some(element),
            element_count: Some(count),
        }
    }
}

/* One top-level declaration from a parsed header */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /* Empty for anything that is not a function */
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Declaration {
    pub fn function(
        name: impl Into<String>,
        return_type: impl Into<String>,
        parameters: Vec<RawParameter>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Function,
            return_type: return_type.into(),
            parameters,
            location: None,
        }
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Other,
            return_type: String::new(),
            parameters: Vec::new(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_function(&self) -> bool {
        self.kind == DeclarationKind::Function
    }
}
