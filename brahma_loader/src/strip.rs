use regex::Regex;

/* Blanks out export/attribute macros (H5_DLL and friends) that the C grammar
 * cannot see through without expanding them. Each occurrence is replaced by
 * spaces of the same length so byte offsets and line numbers are unchanged.
 *
 * A name written with a trailing "()" is function-like: its balanced
 * argument list is blanked too, e.g. H5_ATTR_FORMAT(printf, 2, 3). */
#[derive(Debug, Clone, Default)]
pub struct MacroStripper {
    pattern: Option<Regex>,
    function_like: Vec<String>,
}

/* Split "NAME()" into ("NAME", true) */
pub(crate) fn strip_entry_name(entry: &str) -> (&str, bool) {
    let entry = entry.trim();
    match entry.strip_suffix("()") {
        Some(name) => (name.trim_end(), true),
        None => (entry, false),
    }
}

fn blank(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '\n' {
            out.push('\n');
        } else {
            out.push_str(&" ".repeat(c.len_utf8()));
        }
    }
}

/* Byte length of a balanced "( ... )" at the start of `text`, if there is one */
fn argument_list_len(text: &str) -> Option<usize> {
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

impl MacroStripper {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let mut alternatives = Vec::new();
        let mut function_like = Vec::new();
        for entry in names {
            let (name, is_function) = strip_entry_name(entry.as_ref());
            if name.is_empty() {
                continue;
            }
            if is_function {
                function_like.push(name.to_string());
            }
            alternatives.push(regex::escape(name));
        }

        if alternatives.is_empty() {
            return Self::default();
        }

        /* Escaped literals joined by '|' always form a valid pattern */
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).ok();
        Self { pattern, function_like }
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    pub fn strip(&self, source: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return source.to_string();
        };

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for found in pattern.find_iter(source) {
            /* Inside an argument list that was already blanked */
            if found.start() < cursor {
                continue;
            }
            out.push_str(&source[cursor..found.start()]);
            blank(&mut out, found.as_str());
            cursor = found.end();

            if self.function_like.iter().any(|name| name == found.as_str()) {
                let after = &source[cursor..];
                let gap = after.len() - after.trim_start().len();
                if let Some(len) = argument_list_len(&after[gap..]) {
                    blank(&mut out, &after[..gap + len]);
                    cursor += gap + len;
                }
            }
        }
        out.push_str(&source[cursor..]);
        out
    }
}
