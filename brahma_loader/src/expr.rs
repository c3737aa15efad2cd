/* Integer constant expressions of the C preprocessor
 *
 * Used for #if / #elif conditions and for array bounds such as
 * `dims[H5S_MAX_RANK]`. Macros are expanded from the define table first;
 * `defined NAME` and `defined(NAME)` are answered from the same table.
 *
 *   H5_VERS_MAJOR > 1 || (H5_VERS_MAJOR == 1 && H5_VERS_MINOR >= 14)
 *   defined(H5_HAVE_PARALLEL) && !defined(H5_NO_DEPRECATED_SYMBOLS)
 *   2 * H5S_MAX_RANK
 */

use crate::macros::{MacroTable, identifier_len};
use tracing::debug;

const MAX_EXPANSION_DEPTH: usize = 32;

/* Longest first so "<<" wins over "<" */
const PUNCTUATORS: &[&str] = &[
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "~", "&", "|",
    "^", "?", ":", "(", ")", ",",
];

/* Binary operators from loosest to tightest binding */
const BINARY_LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", "<=", ">", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Ident(String),
    Punct(&'static str),
    /* Strings, floats and anything else a constant expression cannot hold */
    Other,
}

/* How an identifier left over after macro expansion is treated */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unknown {
    /* #if semantics: undefined identifiers are 0 */
    Zero,
    /* Array bounds: an undefined identifier means no constant value */
    Fail,
}

/* Parse a C integer literal, ignoring u/l suffixes */
pub(crate) fn parse_int_literal(text: &str) -> Option<u64> {
    let digits = text
        .trim()
        .trim_end_matches(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L'));
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return u64::from_str_radix(&digits[1..], 8).ok();
    }
    digits.parse().ok()
}

fn char_literal(text: &str) -> Option<i64> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let value = match inner {
        "\\n" => '\n',
        "\\t" => '\t',
        "\\0" => '\0',
        "\\\\" => '\\',
        "\\'" => '\'',
        _ => {
            let mut chars = inner.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            c
        }
    };
    Some(value as i64)
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c.is_ascii_digit() {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
                .unwrap_or(rest.len());
            let literal = &rest[..len];
            tokens.push(match parse_int_literal(literal).and_then(|v| i64::try_from(v).ok()) {
                Some(value) => Token::Number(value),
                None => Token::Other,
            });
            rest = &rest[len..];
            continue;
        }

        let len = identifier_len(rest);
        if len > 0 {
            tokens.push(Token::Ident(rest[..len].to_string()));
            rest = &rest[len..];
            continue;
        }

        if c == '\'' || c == '"' {
            /* Runs to the matching quote, or the end of the text */
            let body = &rest[1..];
            let mut end = rest.len();
            let mut escaped = false;
            for (index, ch) in body.char_indices() {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == c {
                    end = index + 2;
                    break;
                }
            }
            let literal = &rest[..end];
            tokens.push(match (c, char_literal(literal)) {
                ('\'', Some(value)) => Token::Number(value),
                _ => Token::Other,
            });
            rest = &rest[end..];
            continue;
        }

        match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(punct) => {
                tokens.push(Token::Punct(punct));
                rest = &rest[punct.len()..];
            }
            None => {
                tokens.push(Token::Other);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    tokens
}

/* Operand of `defined`: NAME or (NAME). Returns the name and the index after it */
fn defined_operand(tokens: &[Token], start: usize) -> Option<(&str, usize)> {
    match (tokens.get(start), tokens.get(start + 1), tokens.get(start + 2)) {
        (Some(Token::Ident(name)), _, _) => Some((name, start + 1)),
        (Some(Token::Punct("(")), Some(Token::Ident(name)), Some(Token::Punct(")"))) => Some((name, start + 3)),
        _ => None,
    }
}

/* Arguments of a macro call starting at its '(' token, split at top-level commas */
fn call_arguments(tokens: &[Token], open: usize) -> Option<(Vec<Vec<Token>>, usize)> {
    let mut args = vec![Vec::new()];
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate().skip(open + 1) {
        match token {
            Token::Punct(")") if depth == 0 => {
                if args.len() == 1 && args[0].is_empty() {
                    args.clear();
                }
                return Some((args, index + 1));
            }
            Token::Punct(",") if depth == 0 => args.push(Vec::new()),
            _ => {
                match token {
                    Token::Punct("(") => depth += 1,
                    Token::Punct(")") => depth -= 1,
                    _ => {}
                }
                args.last_mut()?.push(token.clone());
            }
        }
    }
    None
}

fn substitute(body: Vec<Token>, params: &[String], args: &[Vec<Token>]) -> Vec<Token> {
    let mut out = Vec::with_capacity(body.len());
    for token in body {
        let position = match &token {
            Token::Ident(name) => params.iter().position(|param| param == name),
            _ => None,
        };
        match position {
            Some(index) => out.extend(args.get(index).cloned().unwrap_or_default()),
            None => out.push(token),
        }
    }
    out
}

fn expand(tokens: Vec<Token>, macros: &MacroTable, depth: usize) -> Option<Vec<Token>> {
    if depth > MAX_EXPANSION_DEPTH {
        debug!("macro expansion too deep, giving up");
        return None;
    }

    let mut out = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let Token::Ident(word) = &tokens[index] else {
            out.push(tokens[index].clone());
            index += 1;
            continue;
        };

        if word == "defined" {
            let (name, next) = defined_operand(&tokens, index + 1)?;
            out.push(Token::Number(i64::from(macros.is_defined(name))));
            index = next;
            continue;
        }

        match macros.get(word) {
            Some(definition) if !definition.is_function_like() => {
                out.extend(expand(tokenize(&definition.body), macros, depth + 1)?);
                index += 1;
            }
            Some(definition) if tokens.get(index + 1) == Some(&Token::Punct("(")) => {
                let (args, next) = call_arguments(&tokens, index + 1)?;
                let params = definition.params.as_deref().unwrap_or(&[]);
                let body = substitute(tokenize(&definition.body), params, &args);
                out.extend(expand(body, macros, depth + 1)?);
                index = next;
            }
            _ => {
                out.push(tokens[index].clone());
                index += 1;
            }
        }
    }
    Some(out)
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    pos: usize,
    unknown: Unknown,
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, punct: &str) -> bool {
        match self.peek() {
            Some(Token::Punct(p)) if *p == punct => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn conditional(&mut self) -> Option<i64> {
        let condition = self.binary(0)?;
        if !self.eat("?") {
            return Some(condition);
        }
        let when_true = self.conditional()?;
        if !self.eat(":") {
            return None;
        }
        let when_false = self.conditional()?;
        Some(if condition != 0 { when_true } else { when_false })
    }

    fn binary(&mut self, level: usize) -> Option<i64> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.unary();
        };

        let mut left = self.binary(level + 1)?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct(p)) if operators.contains(p) => *p,
                _ => break,
            };
            self.pos += 1;
            let right = self.binary(level + 1)?;
            left = apply_binary(op, left, right)?;
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<i64> {
        if self.eat("!") {
            return Some(i64::from(self.unary()? == 0));
        }
        if self.eat("-") {
            return self.unary()?.checked_neg();
        }
        if self.eat("+") {
            return self.unary();
        }
        if self.eat("~") {
            return Some(!self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<i64> {
        let token = self.peek()?.clone();
        self.pos += 1;
        match token {
            Token::Number(value) => Some(value),
            Token::Punct("(") => {
                let value = self.conditional()?;
                self.eat(")").then_some(value)
            }
            Token::Ident(name) => {
                /* Unknown call such as __has_attribute(x): skip its arguments */
                if self.peek() == Some(&Token::Punct("(")) {
                    let (_, next) = call_arguments(self.tokens, self.pos)?;
                    self.pos = next;
                    debug!(name = %name, "unknown function-like macro in expression");
                }
                match self.unknown {
                    Unknown::Zero => Some(0),
                    Unknown::Fail => None,
                }
            }
            Token::Punct(_) | Token::Other => None,
        }
    }
}

fn apply_binary(op: &str, left: i64, right: i64) -> Option<i64> {
    let value = match op {
        "||" => i64::from(left != 0 || right != 0),
        "&&" => i64::from(left != 0 && right != 0),
        "|" => left | right,
        "^" => left ^ right,
        "&" => left & right,
        "==" => i64::from(left == right),
        "!=" => i64::from(left != right),
        "<" => i64::from(left < right),
        "<=" => i64::from(left <= right),
        ">" => i64::from(left > right),
        ">=" => i64::from(left >= right),
        "<<" => left.checked_shl(u32::try_from(right).ok()?)?,
        ">>" => left.checked_shr(u32::try_from(right).ok()?)?,
        "+" => left.checked_add(right)?,
        "-" => left.checked_sub(right)?,
        "*" => left.checked_mul(right)?,
        "/" => left.checked_div(right)?,
        "%" => left.checked_rem(right)?,
        _ => return None,
    };
    Some(value)
}

fn evaluate(expr: &str, macros: &MacroTable, unknown: Unknown) -> Option<i64> {
    let tokens = expand(tokenize(expr), macros, 0)?;
    let mut evaluator = Evaluator {
        tokens: &tokens,
        pos: 0,
        unknown,
    };
    let value = evaluator.conditional()?;
    (evaluator.pos == tokens.len()).then_some(value)
}

/// Evaluates an `#if` / `#elif` condition. Undefined identifiers count as 0.
/// Returns None when the expression is malformed.
pub fn evaluate_condition(expr: &str, macros: &MacroTable) -> Option<bool> {
    evaluate(expr, macros, Unknown::Zero).map(|value| value != 0)
}

/// Evaluates an array bound. Only fully known, non-negative values succeed.
pub fn evaluate_constant(expr: &str, macros: &MacroTable) -> Option<u64> {
    evaluate(expr, macros, Unknown::Fail).and_then(|value| u64::try_from(value).ok())
}
