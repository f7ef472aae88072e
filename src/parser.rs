use crate::error::PathError;
use crate::path::{Key, Path};
use regex::Regex;
use std::sync::OnceLock;

/// Segments of a dot-form path that are read as array positions.
fn index_segment() -> &'static Regex {
    static INDEX: OnceLock<Regex> = OnceLock::new();
    INDEX.get_or_init(|| Regex::new(r"^-?[0-9]+$").expect("index pattern is valid"))
}

/// Resolve a pure dot-form path such as `a.0.b`.
///
/// Numeric segments (a leading `-` included) become [`Key::Index`], all
/// others [`Key::Name`]. Empty segments are dropped, so `a..b`, `.a` and
/// `a.` all collapse silently. This never fails.
pub fn resolve_dotted(input: &str) -> Path {
    input
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(classify_segment)
        .collect()
}

fn classify_segment(segment: &str) -> Key {
    if index_segment().is_match(segment) {
        // Digits too long for i64 stay a plain name.
        if let Ok(idx) = segment.parse::<i64>() {
            return Key::Index(idx);
        }
    }
    Key::Name(segment.to_string())
}

/// Resolve a bracket-form path such as `a[0].b`.
///
/// Grammar:
///
/// ```text
/// name     -> id nameTail
/// nameTail -> "[" number "]" nameTail | "." name | ε
/// ```
///
/// Segments after a `.` are always names, even when numeric.
pub fn resolve_bracketed(input: &str) -> Result<Path, PathError> {
    let mut parser = Parser::new(input);
    let mut path = Path::root();
    if parser.at_end() {
        return Ok(path);
    }
    parser.parse_name(&mut path)?;
    Ok(path)
}

/// Cursor over a path string. Shared by the bracket resolver above and the
/// form engine's recursive-descent walk.
pub(crate) struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Parser { input, pos: 0 }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    pub(crate) fn input(&self) -> &'a str {
        self.input
    }

    /// The path text walked so far.
    pub(crate) fn consumed(&self) -> &'a str {
        &self.input[..self.pos]
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    pub(crate) fn eat_char(&mut self, ch: char) -> bool {
        if self.peek_char() == Some(ch) {
            self.advance(ch.len_utf8());
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_char(&mut self, ch: char) -> Result<(), PathError> {
        if self.eat_char(ch) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", ch)))
        }
    }

    /// Character offset of the cursor.
    pub(crate) fn offset(&self) -> usize {
        self.input[..self.pos].chars().count()
    }

    pub(crate) fn error_point(&self, message: String) -> PathError {
        PathError::parse_error(self.input, message, self.offset())
    }

    /// "Expected X, found Y" at the cursor.
    pub(crate) fn unexpected(&self, expected: &str) -> PathError {
        let found = match self.peek_char() {
            Some(ch) => format!("'{}'", ch),
            None => "end of path".to_string(),
        };
        self.error_point(format!("Expected {}, found {}", expected, found))
    }

    // ── Tokens ──────────────────────────────────────────────────────

    /// An identifier runs up to the next `.`, `[` or `]`.
    pub(crate) fn parse_identifier(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_separator(ch) {
                break;
            }
            self.advance(ch.len_utf8());
        }
        if self.pos == start {
            return Err(self.unexpected("an identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// The `number` inside brackets: `-?[0-9]+`.
    pub(crate) fn parse_index(&mut self) -> Result<i64, PathError> {
        let start = self.pos;
        let begin = self.offset();
        self.eat_char('-');
        let digit_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.advance(1);
            } else {
                break;
            }
        }
        if self.pos == digit_start {
            self.pos = start;
            return Err(self.unexpected("an array index"));
        }
        self.input[start..self.pos].parse::<i64>().map_err(|_| {
            PathError::parse_error(
                self.input,
                format!("Array index {} is out of range", &self.input[start..self.pos]),
                begin,
            )
        })
    }

    // ── Grammar ─────────────────────────────────────────────────────

    fn parse_name(&mut self, path: &mut Path) -> Result<(), PathError> {
        let id = self.parse_identifier()?;
        path.push(Key::Name(id));
        self.parse_name_tail(path)
    }

    fn parse_name_tail(&mut self, path: &mut Path) -> Result<(), PathError> {
        loop {
            match self.peek_char() {
                Some('[') => {
                    self.advance(1);
                    let idx = self.parse_index()?;
                    self.expect_char(']')?;
                    path.push(Key::Index(idx));
                }
                Some('.') => {
                    self.advance(1);
                    return self.parse_name(path);
                }
                None => return Ok(()),
                Some(_) => return Err(self.unexpected("'[', '.' or end of path")),
            }
        }
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '.' | '[' | ']')
}
