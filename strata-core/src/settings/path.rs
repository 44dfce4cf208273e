use std::str::FromStr;

use crate::error::{Error, Result};

pub const DEFAULT_SEPARATOR: char = '.';

/// A parsed settings path: the ordered key segments between separators.
///
/// The empty path has no segments and addresses the root of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Splits `raw` on `separator`. An empty string is the root path; any
    /// empty segment (leading, trailing or doubled separator) is rejected.
    pub fn parse(raw: &str, separator: char) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = raw.split(separator).map(str::to_owned).collect();
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(Error::Addressing(format!(
                "path '{raw}' has an empty segment at position {index}"
            )));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn split_last(&self) -> Option<(&String, &[String])> {
        self.segments.split_last()
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    pub fn concat(&self, other: &KeyPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn join(&self, separator: char) -> String {
        let mut buffer = [0u8; 4];
        self.segments.join(separator.encode_utf8(&mut buffer))
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value, DEFAULT_SEPARATOR)
    }
}

impl std::fmt::Display for KeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.join(DEFAULT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyPath, DEFAULT_SEPARATOR};
    use crate::error::Error;

    #[test]
    fn empty_string_is_root() {
        let path = KeyPath::parse("", DEFAULT_SEPARATOR).expect("root parses");
        assert!(path.is_root());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn splits_on_custom_separator() {
        let path = KeyPath::parse("ui/theme/colour", '/').expect("path parses");
        assert_eq!(path.segments(), ["ui", "theme", "colour"]);
        assert_eq!(path.join('/'), "ui/theme/colour");
        assert_eq!(path.to_string(), "ui.theme.colour");
    }

    #[test]
    fn dots_are_plain_characters_under_other_separator() {
        let path = KeyPath::parse("a.b/c", '/').expect("path parses");
        assert_eq!(path.segments(), ["a.b", "c"]);
    }

    #[test]
    fn rejects_empty_segments() {
        for raw in ["a..b", ".a", "a.", ".", "a.b..c"] {
            let error = KeyPath::parse(raw, '.').expect_err("empty segment must fail");
            assert!(matches!(error, Error::Addressing(_)), "{raw}: {error}");
            assert!(error.to_string().contains("empty segment"));
        }
    }

    #[test]
    fn child_and_concat_extend_segments() {
        let base: KeyPath = "plugins".parse().expect("path parses");
        let extended = base.child("lint").concat(&"rules.max".parse().expect("path parses"));
        assert_eq!(extended.to_string(), "plugins.lint.rules.max");
        assert_eq!(extended.len(), 4);
        let (last, parents) = extended.split_last().expect("not root");
        assert_eq!(last, "max");
        assert_eq!(parents.len(), 3);
    }
}
