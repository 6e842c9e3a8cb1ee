//! SQL script parsing
//!
//! Splits a script into the statements it contains. A terminator only ends a
//! statement outside string literals (including `E'...'` escape strings),
//! quoted identifiers, nested block comments and dollar-quoted bodies. The isql `SET TERM <new> <old>` directive switches the
//! active terminator so procedure bodies can keep their inner semicolons.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Terminator in effect at the start of every script
pub const DEFAULT_TERMINATOR: &str = ";";

static SET_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^SET\s+TERM\s+(\S+)\s*$").expect("valid SET TERM pattern"));

/// Split a script into executable statements.
///
/// Statements are returned trimmed and without their terminator. Fragments that
/// contain only whitespace or comments are dropped, and a final statement
/// without a terminator is kept.
pub fn split_statements(script: &str) -> Result<Vec<String>> {
    Splitter::new(script).run()
}

struct Splitter<'a> {
    text: &'a str,
    terminator: String,
    statements: Vec<String>,
    start: usize,
    /// Offset of the first character outside comments and whitespace
    head: Option<usize>,
}

impl<'a> Splitter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            terminator: DEFAULT_TERMINATOR.to_string(),
            statements: Vec::new(),
            start: 0,
            head: None,
        }
    }

    fn run(mut self) -> Result<Vec<String>> {
        let text = self.text;
        let mut pos = 0;
        let mut prev: Option<char> = None;

        while pos < text.len() {
            let rest = &text[pos..];

            if rest.starts_with("--") {
                pos = rest.find('\n').map_or(text.len(), |i| pos + i + 1);
                prev = None;
                continue;
            }

            if rest.starts_with("/*") {
                pos = self.skip_block_comment(pos)?;
                prev = None;
                continue;
            }

            if rest.starts_with(self.terminator.as_str()) {
                self.flush(pos);
                pos += self.terminator.len();
                self.start = pos;
                prev = None;
                continue;
            }

            let c = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };

            if c.is_whitespace() {
                pos += c.len_utf8();
                prev = Some(c);
                continue;
            }

            self.head.get_or_insert(pos);
            pos = match c {
                '\'' if is_escape_prefix(&text[..pos]) => self.skip_escape_string(pos)?,
                '\'' => self.skip_quoted(pos, '\'', "string literal")?,
                '"' => self.skip_quoted(pos, '"', "quoted identifier")?,
                '$' if !prev.is_some_and(is_identifier_char) => match dollar_tag(rest) {
                    Some(tag) => {
                        let body = pos + tag.len();
                        let end = text[body..]
                            .find(tag)
                            .ok_or_else(|| self.unterminated("dollar-quoted body", pos))?;
                        body + end + tag.len()
                    }
                    None => pos + 1,
                },
                _ => pos + c.len_utf8(),
            };
            prev = text[..pos].chars().next_back();
        }

        self.flush(text.len());
        Ok(self.statements)
    }

    fn flush(&mut self, end: usize) {
        let text = self.text;
        if let Some(head) = self.head.take() {
            let directive = text[head..end].trim();
            if let Some(caps) = SET_TERM.captures(directive) {
                tracing::trace!(terminator = &caps[1], "Switching statement terminator");
                self.terminator = caps[1].to_string();
            } else {
                self.statements.push(text[self.start..end].trim().to_string());
            }
        }
    }

    /// Skip a quoted run starting at `pos`; a doubled quote is an escape
    fn skip_quoted(&self, pos: usize, quote: char, what: &str) -> Result<usize> {
        let mut i = pos + 1;
        loop {
            let found = self.text[i..]
                .find(quote)
                .ok_or_else(|| self.unterminated(what, pos))?;
            i += found + 1;
            if self.text[i..].starts_with(quote) {
                i += 1;
            } else {
                return Ok(i);
            }
        }
    }

    /// Skip an `E'...'` body starting at the quote; backslash escapes the next char
    fn skip_escape_string(&self, pos: usize) -> Result<usize> {
        let mut chars = self.text[pos + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '\'' => {
                    let after = pos + 1 + i + 1;
                    if self.text[after..].starts_with('\'') {
                        chars.next();
                    } else {
                        return Ok(after);
                    }
                }
                _ => {}
            }
        }
        Err(self.unterminated("string literal", pos))
    }

    /// Skip a block comment starting at `pos`; block comments nest
    fn skip_block_comment(&self, pos: usize) -> Result<usize> {
        let mut depth = 0usize;
        let mut i = pos;
        while i < self.text.len() {
            let rest = &self.text[i..];
            if rest.starts_with("/*") {
                depth += 1;
                i += 2;
            } else if rest.starts_with("*/") {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Ok(i);
                }
            } else {
                i += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
        Err(self.unterminated("block comment", pos))
    }

    fn unterminated(&self, what: &str, pos: usize) -> Error {
        let line = self.text[..pos].matches('\n').count() + 1;
        Error::SyntaxError(format!("unterminated {} starting on line {}", what, line))
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether `before` ends in a standalone `E` that opens an escape string
fn is_escape_prefix(before: &str) -> bool {
    let mut chars = before.chars().rev();
    matches!(chars.next(), Some('E' | 'e')) && !chars.next().is_some_and(is_identifier_char)
}

/// Dollar-quote opening tag at the start of `rest`: `$$` or `$name$`
fn dollar_tag(rest: &str) -> Option<&str> {
    for (i, c) in rest.char_indices().skip(1) {
        if c == '$' {
            return Some(&rest[..i + 1]);
        }
        let valid = if i == 1 {
            c.is_alphabetic() || c == '_'
        } else {
            c.is_alphanumeric() || c == '_'
        };
        if !valid {
            return None;
        }
    }
    None
}
