use serde_derive::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/* Normalized parameter type. Spellings are passed through verbatim from the
 * header; no typedef resolution or simplification happens here. */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "form", rename_all = "kebab-case")]
pub enum TypeDescriptor {
    Scalar { spelling: String },
    IncompleteArray { element: String },
    FixedArray { element: String, count: u64 },
}

impl TypeDescriptor {
    pub fn scalar(spelling: impl Into<String>) -> Self {
        TypeDescriptor::Scalar {
            spelling: spelling.into(),
        }
    }

    pub fn incomplete_array(element: impl Into<String>) -> Self {
        TypeDescriptor::IncompleteArray {
            element: element.into(),
        }
    }

    pub fn fixed_array(element: impl Into<String>, count: u64) -> Self {
        TypeDescriptor::FixedArray {
            element: element.into(),
            count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Parameter {
    /* May be empty for unnamed prototype parameters */
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A matched function, normalized for code generation.
///
/// Two signatures are equal when their names are equal; the return type and
/// parameters do not take part in comparison or hashing.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Signature {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new(
        name: impl Into<String>,
        return_type: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            parameters,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
