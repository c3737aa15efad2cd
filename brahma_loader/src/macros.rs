/* Macro definitions seen by the preprocessor
 *
 * Only what conditional evaluation and array bounds need: object-like
 * macros keep their replacement text, function-like macros keep their
 * parameter names as well. Nothing is expanded into declaration text.
 */

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    /* Some for function-like macros, e.g. H5_VERSION_GE(Maj, Min, Rel) */
    pub params: Option<Vec<String>>,
    pub body: String,
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/* Length of the identifier at the start of `text`, 0 when there is none */
pub(crate) fn identifier_len(text: &str) -> usize {
    let mut len = 0;
    for (index, c) in text.char_indices() {
        let ok = if index == 0 {
            c == '_' || c.is_ascii_alphabetic()
        } else {
            c == '_' || c.is_ascii_alphanumeric()
        };
        if !ok {
            break;
        }
        len = index + c.len_utf8();
    }
    len
}

impl MacroDefinition {
    pub fn object(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            body: body.into(),
        }
    }

    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Parses a command-line style definition: `NAME` defines NAME as 1,
    /// `NAME=VALUE` gives it VALUE. Returns None for an invalid name.
    pub fn from_command_line(spec: &str) -> Option<Self> {
        let (name, body) = match spec.split_once('=') {
            Some((name, body)) => (name.trim(), body.trim()),
            None => (spec.trim(), "1"),
        };
        is_identifier(name).then(|| Self::object(name, body))
    }

    /* Parse the text following `#define` */
    pub fn from_directive(rest: &str) -> Option<Self> {
        let rest = rest.trim_start();
        let len = identifier_len(rest);
        if len == 0 {
            return None;
        }
        let name = &rest[..len];
        let after = &rest[len..];

        /* A '(' directly after the name makes the macro function-like */
        if let Some(params) = after.strip_prefix('(') {
            let close = params.find(')')?;
            let names = params[..close]
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            return Some(Self {
                name: name.to_string(),
                params: Some(names),
                body: params[close + 1..].trim().to_string(),
            });
        }

        Some(Self::object(name, after.trim()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    definitions: HashMap<String, MacroDefinition>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /* Table seeded from NAME / NAME=VALUE entries; invalid entries are skipped */
    pub fn from_command_line<S: AsRef<str>>(specs: &[S]) -> Self {
        let mut table = Self::new();
        for spec in specs {
            if let Some(definition) = MacroDefinition::from_command_line(spec.as_ref()) {
                table.define(definition);
            }
        }
        table
    }

    pub fn define(&mut self, definition: MacroDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn undefine(&mut self, name: &str) {
        self.definitions.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
