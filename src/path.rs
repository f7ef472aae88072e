use crate::error::PathError;
use std::fmt;

/// One step of a property path: an array slot or a mapping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Array position. May be negative straight out of the lexer; only the
    /// delete leaf normalises it against the array length.
    Index(i64),
    Name(String),
}

impl Key {
    pub fn name(name: impl Into<String>) -> Self {
        Key::Name(name.into())
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<i64> for Key {
    fn from(index: i64) -> Self {
        Key::Index(index)
    }
}

/// An ordered sequence of keys. The empty path addresses the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    keys: Vec<Key>,
}

impl Path {
    pub fn new(keys: Vec<Key>) -> Self {
        Path { keys }
    }

    pub fn root() -> Self {
        Path { keys: Vec::new() }
    }

    /// Resolve a path string, picking the grammar from its shape: anything
    /// containing a bracket goes through the bracket grammar, everything
    /// else through the dot form.
    pub fn parse(input: &str) -> Result<Path, PathError> {
        if input.contains(['[', ']']) {
            crate::parser::resolve_bracketed(input)
        } else {
            Ok(crate::parser::resolve_dotted(input))
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn push(&mut self, key: Key) {
        self.keys.push(key);
    }

    /// Split into (all keys but the last, last key).
    pub fn split_last(&self) -> Option<(&Key, &[Key])> {
        self.keys.split_last()
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Formats in bracket form: `a[0].b`.
///
/// The bracket grammar starts every path with a name, so a path whose first
/// key is an index (`[0].a`) displays fine but does not parse back.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for key in &self.keys {
            match key {
                Key::Name(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Key::Index(idx) => write!(f, "[{}]", idx)?,
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_picks_grammar_by_brackets() {
        // Dot form: numeric segments are indices.
        let dotted = Path::parse("a.0.b").unwrap();
        assert_eq!(dotted.keys(), &[Key::from("a"), Key::Index(0), Key::from("b")]);

        // Bracket form: only bracketed numbers are indices.
        let bracketed = Path::parse("a[0].1").unwrap();
        assert_eq!(bracketed.keys(), &[Key::from("a"), Key::Index(0), Key::from("1")]);

        assert!(Path::parse("a[").is_err());
        assert!(Path::parse("").unwrap().is_empty());
    }

    #[test]
    fn display_is_bracket_form() {
        let path: Path = vec![Key::name("a"), Key::Index(0), Key::name("b"), Key::Index(-1)]
            .into_iter()
            .collect();
        assert_eq!(path.to_string(), "a[0].b[-1]");
        assert_eq!(Path::parse(&path.to_string()).unwrap(), path);
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn index_first_display_does_not_parse_back() {
        let path = Path::new(vec![Key::Index(0), Key::name("a")]);
        assert_eq!(path.to_string(), "[0].a");
        assert!(Path::parse(&path.to_string()).is_err());
    }

    #[test]
    fn split_last_separates_leaf() {
        let mut path = Path::new(vec![Key::name("x")]);
        path.push(Key::Index(2));
        let (last, init) = path.split_last().unwrap();
        assert!(last.is_index());
        assert_eq!(init, &[Key::name("x")]);
        assert_eq!(path.len(), 2);
        assert!(Path::root().split_last().is_none());
    }
}
