/* Line-based C preprocessing
 *
 * Produces one translation unit from a header and everything it includes.
 * Conditional blocks are evaluated against the define table, so only the
 * active branch of an #if/#ifdef/#ifndef/#elif/#else chain reaches the
 * parser. Included headers are spliced in at their #include line. Every
 * directive and every inactive line becomes an empty line; a line map
 * keeps each output line's origin for source locations.
 *
 * Macros are not expanded into declaration text. Export and attribute
 * macros are blanked by the MacroStripper instead.
 */

use crate::error::LoadError;
use crate::expr::evaluate_condition;
use crate::macros::{MacroDefinition, MacroTable, identifier_len};
use crate::resolver::{HeaderResolver, IncludeDirective};
use brahma_types::SourceLocation;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineOrigin {
    file: usize,
    line: usize,
}

/* Preprocessed text of a header and its includes */
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    text: String,
    files: Vec<PathBuf>,
    origins: Vec<LineOrigin>,
}

impl TranslationUnit {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Maps a zero-based row of `text()` back to the header line it came from.
    pub fn location(&self, row: usize) -> Option<SourceLocation> {
        let origin = self.origins.get(row)?;
        Some(SourceLocation {
            file: self.files[origin.file].clone(),
            line: origin.line,
        })
    }

    fn add_file(&mut self, path: &Path) -> usize {
        self.files.push(path.to_path_buf());
        self.files.len() - 1
    }

    fn push_line(&mut self, text: &str, file: usize, line: usize) {
        self.text.push_str(text);
        self.text.push('\n');
        self.origins.push(LineOrigin { file, line });
    }
}

/* State of one open #if chain */
#[derive(Debug, Clone, Copy)]
struct Conditional {
    /* Enclosing region is active */
    parent_active: bool,
    /* Some branch of this chain was already taken */
    taken: bool,
    active: bool,
}

impl Conditional {
    fn open(parent_active: bool, value: bool) -> Self {
        let active = parent_active && value;
        Self {
            parent_active,
            taken: active,
            active,
        }
    }

    fn branch(&mut self, value: impl FnOnce() -> bool) {
        if self.taken || !self.parent_active {
            self.active = false;
        } else {
            self.active = value();
            self.taken = self.active;
        }
    }
}

/* Replace comments with spaces, keeping newlines and byte offsets */
fn blank_comments(source: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Literal(char),
    }

    fn blank(out: &mut String, c: char) {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match (c, chars.peek()) {
                ('/', Some('/')) => {
                    state = State::LineComment;
                    out.push(' ');
                }
                ('/', Some('*')) => {
                    chars.next();
                    state = State::BlockComment;
                    out.push_str("  ");
                }
                ('"' | '\'', _) => {
                    state = State::Literal(c);
                    out.push(c);
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    blank(&mut out, c);
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    out.push_str("  ");
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    blank(&mut out, c);
                }
            }
            State::Literal(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote || c == '\n' {
                    /* Unterminated literals end with their line */
                    state = State::Code;
                }
            }
        }
    }
    out
}

/* "#  define X 1" -> ("define", "X 1") */
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let len = identifier_len(rest);
    Some((&rest[..len], rest[len..].trim()))
}

/* The quoted or bracketed path token at the start of an #include operand */
fn include_token(rest: &str) -> Option<&str> {
    let close = match rest.chars().next()? {
        '"' => '"',
        '<' => '>',
        _ => return None,
    };
    let end = rest[1..].find(close)?;
    Some(&rest[..end + 2])
}

/* Stateful preprocessor for one generation run. The resolver makes sure each
 * header is read once; defines persist across included headers. */
pub struct Preprocessor {
    resolver: HeaderResolver,
    macros: MacroTable,
    follow_includes: bool,
}

impl Preprocessor {
    pub fn new(resolver: HeaderResolver, macros: MacroTable, follow_includes: bool) -> Self {
        Self {
            resolver,
            macros,
            follow_includes,
        }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn loaded_file_count(&self) -> usize {
        self.resolver.loaded_file_count()
    }

    /* Preprocess a header from disk */
    pub fn run_file(&mut self, path: &Path) -> Result<TranslationUnit, LoadError> {
        let mut unit = TranslationUnit::default();
        self.load_file(path, &mut unit)?;
        Ok(unit)
    }

    /* Preprocess in-memory header text; `path` anchors relative includes */
    pub fn run_source(&mut self, source: &str, path: &Path) -> Result<TranslationUnit, LoadError> {
        self.resolver.mark_loaded(path);
        let mut unit = TranslationUnit::default();
        self.process(source, path, &mut unit)?;
        Ok(unit)
    }

    fn load_file(&mut self, path: &Path, unit: &mut TranslationUnit) -> Result<(), LoadError> {
        if !self.resolver.mark_loaded(path) {
            trace!(file = %path.display(), "header already loaded");
            return Ok(());
        }

        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = String::from_utf8_lossy(&bytes);

        debug!(file = %path.display(), "preprocessing header");
        self.process(&source, path, unit)
    }

    fn process(&mut self, source: &str, path: &Path, unit: &mut TranslationUnit) -> Result<(), LoadError> {
        let text = blank_comments(source);
        let file = unit.add_file(path);
        let mut stack: Vec<Conditional> = Vec::new();
        let mut lines = text.lines().enumerate();

        while let Some((index, line)) = lines.next() {
            let active = stack.last().map_or(true, |c| c.active);

            if split_directive(line).is_none() {
                unit.push_line(if active { line } else { "" }, file, index + 1);
                continue;
            }

            /* Join backslash continuations; each physical line still gets its own row */
            let mut directive = line.to_string();
            unit.push_line("", file, index + 1);
            while directive.ends_with('\\') {
                directive.pop();
                let Some((next_index, next)) = lines.next() else {
                    break;
                };
                directive.push(' ');
                directive.push_str(next);
                unit.push_line("", file, next_index + 1);
            }

            let Some((name, rest)) = split_directive(&directive) else {
                continue;
            };
            match name {
                "if" => stack.push(Conditional::open(active, active && self.condition(rest, path, index))),
                "ifdef" => stack.push(Conditional::open(active, self.macros.is_defined(first_word(rest)))),
                "ifndef" => stack.push(Conditional::open(active, !self.macros.is_defined(first_word(rest)))),
                "elif" | "elifdef" | "elifndef" | "else" => {
                    let Some(conditional) = stack.last_mut() else {
                        debug!(file = %path.display(), line = index + 1, directive = name, "stray directive");
                        continue;
                    };
                    let macros = &self.macros;
                    conditional.branch(|| match name {
                        "elif" => evaluate_condition(rest, macros).unwrap_or(false),
                        "elifdef" => macros.is_defined(first_word(rest)),
                        "elifndef" => !macros.is_defined(first_word(rest)),
                        _ => true,
                    });
                }
                "endif" => {
                    if stack.pop().is_none() {
                        debug!(file = %path.display(), line = index + 1, "stray #endif");
                    }
                }
                _ if !active => {}
                "define" => match MacroDefinition::from_directive(rest) {
                    Some(definition) => {
                        trace!(name = %definition.name, "define");
                        self.macros.define(definition);
                    }
                    None => debug!(file = %path.display(), line = index + 1, "malformed #define"),
                },
                "undef" => self.macros.undefine(first_word(rest)),
                "include" => self.include(rest, path, unit)?,
                _ => trace!(directive = name, "directive ignored"),
            }
        }

        if !stack.is_empty() {
            debug!(file = %path.display(), open = stack.len(), "unterminated conditional");
        }
        Ok(())
    }

    fn condition(&self, expr: &str, path: &Path, index: usize) -> bool {
        evaluate_condition(expr, &self.macros).unwrap_or_else(|| {
            debug!(file = %path.display(), line = index + 1, expr, "condition not evaluable, assuming false");
            false
        })
    }

    fn include(&mut self, rest: &str, path: &Path, unit: &mut TranslationUnit) -> Result<(), LoadError> {
        if !self.follow_includes {
            return Ok(());
        }
        let Some(directive) = include_token(rest).and_then(IncludeDirective::from_token) else {
            trace!(operand = rest, "computed include ignored");
            return Ok(());
        };

        match self.resolver.resolve(&directive, path) {
            Some(resolved) => self.load_file(&resolved, unit),
            None => Ok(()),
        }
    }
}

fn first_word(rest: &str) -> &str {
    &rest[..identifier_len(rest)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocess(source: &str, defines: &[&str]) -> TranslationUnit {
        let mut preprocessor = Preprocessor::new(
            HeaderResolver::new(Vec::new()),
            MacroTable::from_command_line(defines),
            false,
        );
        preprocessor.run_source(source, Path::new("test.h")).unwrap()
    }

    fn code_lines(unit: &TranslationUnit) -> Vec<&str> {
        unit.text().lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn comments_are_blanked_in_place() {
        let source = "int a; // trailing\n/* block\n spans */ int b;\nchar *s = \"/* kept */\";\n";
        let blanked = blank_comments(source);

        assert_eq!(blanked.len(), source.len());
        assert_eq!(blanked.lines().count(), source.lines().count());
        assert!(blanked.starts_with(&format!("int a;{}\n", " ".repeat(12))));
        assert!(blanked.contains(&format!("\n{}int b;", " ".repeat(10))));
        assert!(blanked.contains("\"/* kept */\""));
    }

    #[test]
    fn if_zero_blocks_are_dropped() {
        let unit = preprocess("#if 0\nint H5old(void);\n#endif\nint H5new(void);\n", &[]);
        assert_eq!(code_lines(&unit), vec!["int H5new(void);"]);
    }

    #[test]
    fn ifdef_chains_take_one_branch() {
        let source = "#ifdef H5_HAVE_PARALLEL\nint par;\n#elif defined(H5_HAVE_THREADSAFE)\nint ts;\n#else\nint serial;\n#endif\n";

        assert_eq!(code_lines(&preprocess(source, &[])), vec!["int serial;"]);
        assert_eq!(code_lines(&preprocess(source, &["H5_HAVE_PARALLEL"])), vec!["int par;"]);
        assert_eq!(code_lines(&preprocess(source, &["H5_HAVE_THREADSAFE"])), vec!["int ts;"]);
        assert_eq!(
            code_lines(&preprocess(source, &["H5_HAVE_PARALLEL", "H5_HAVE_THREADSAFE"])),
            vec!["int par;"]
        );
    }

    #[test]
    fn nested_conditionals_respect_the_outer_branch() {
        let source = "#if 0\n#ifndef X\nint inner;\n#else\nint other;\n#endif\n#else\nint outer;\n#endif\n";
        assert_eq!(code_lines(&preprocess(source, &[])), vec!["int outer;"]);
    }

    #[test]
    fn defines_in_the_header_drive_later_conditions() {
        let source = "#define H5_VERS_MINOR 14\n#if H5_VERS_MINOR >= 12\nint recent;\n#endif\n#undef H5_VERS_MINOR\n#ifdef H5_VERS_MINOR\nint stale;\n#endif\n";
        let unit = preprocess(source, &[]);
        assert_eq!(code_lines(&unit), vec!["int recent;"]);
    }

    #[test]
    fn inactive_defines_are_ignored() {
        let mut preprocessor = Preprocessor::new(HeaderResolver::new(Vec::new()), MacroTable::new(), false);
        preprocessor
            .run_source("#ifdef NEVER\n#define H5_RANK 3\n#endif\n", Path::new("test.h"))
            .unwrap();
        assert!(!preprocessor.macros().is_defined("H5_RANK"));
    }

    #[test]
    fn include_guards_keep_their_body() {
        let source = "#ifndef H5PUBLIC_H\n#define H5PUBLIC_H\nint H5open(void);\n#endif\n";
        assert_eq!(code_lines(&preprocess(source, &[])), vec!["int H5open(void);"]);
    }

    #[test]
    fn continued_directives_keep_line_numbers() {
        let source = "#define H5_LONG \\\n    1\n#if H5_LONG\nint kept;\n#endif\n";
        let unit = preprocess(source, &[]);

        assert_eq!(unit.text().lines().count(), 5);
        assert_eq!(code_lines(&unit), vec!["int kept;"]);
        let row = unit.text().lines().position(|l| l.contains("kept")).unwrap();
        assert_eq!(unit.location(row).map(|l| l.line), Some(4));
    }

    #[test]
    fn directives_with_comments_still_apply() {
        let source = "#if 1 /* always */\nint yes;\n#else // never\nint no;\n#endif\n";
        assert_eq!(code_lines(&preprocess(source, &[])), vec!["int yes;"]);
    }

    #[test]
    fn include_operands() {
        assert_eq!(include_token("\"H5public.h\" // comment"), Some("\"H5public.h\""));
        assert_eq!(include_token("<stdio.h>"), Some("<stdio.h>"));
        assert_eq!(include_token("H5_CONFIG_HEADER"), None);
    }
}
