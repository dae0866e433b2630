//! Format tokens and ordered format sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A normalized file format identifier (lower-case, no leading dot).
///
/// Two tokens compare equal iff their normalized forms are equal, so
/// `".PDF"` and `"pdf"` name the same format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FormatToken(String);

impl FormatToken {
    /// Creates a token from any raw extension-like string.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().trim_start_matches('.').to_lowercase())
    }

    /// Extracts the token from a path's extension, if it has one.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::new)
            .filter(|token| !token.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormatToken {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for FormatToken {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<FormatToken> for String {
    fn from(token: FormatToken) -> Self {
        token.0
    }
}

impl AsRef<str> for FormatToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for FormatToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FormatToken {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// An insertion-ordered set of format tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormatSet(Vec<FormatToken>);

impl FormatSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw tokens, dropping duplicates after normalization.
    pub fn from_tokens(raw: &[&str]) -> Self {
        let mut set = Self::new();
        for token in raw {
            set.insert(FormatToken::new(token));
        }
        set
    }

    /// Inserts a token unless already present. Returns whether it was added.
    pub fn insert(&mut self, token: FormatToken) -> bool {
        if token.is_empty() || self.contains(&token) {
            return false;
        }
        self.0.push(token);
        true
    }

    pub fn contains(&self, token: &FormatToken) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatToken> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<FormatToken> {
        self.0.clone()
    }
}

impl<'a> IntoIterator for &'a FormatSet {
    type Item = &'a FormatToken;
    type IntoIter = std::slice::Iter<'a, FormatToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_strips_dot_and_lowercases() {
        assert_eq!(FormatToken::new(".PDF"), FormatToken::new("pdf"));
        assert_eq!(FormatToken::new("  Jpeg "), "jpeg");
        assert_eq!(FormatToken::new("..md").as_str(), "md");
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            FormatToken::from_path(Path::new("/tmp/Report.DOCX")),
            Some(FormatToken::new("docx"))
        );
        assert_eq!(FormatToken::from_path(Path::new("/tmp/README")), None);
        assert_eq!(FormatToken::from_path(Path::new("archive.tar.gz")).unwrap(), "gz");
    }

    #[test]
    fn test_serde_normalizes_on_deserialize() {
        let token: FormatToken = serde_json::from_str("\".WebP\"").unwrap();
        assert_eq!(token, "webp");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"webp\"");
    }

    #[test]
    fn test_format_set_keeps_first_seen_order() {
        let set = FormatSet::from_tokens(&["png", "JPG", "png", ".gif", "jpg"]);
        let tokens: Vec<&str> = set.iter().map(|t| t.as_str()).collect();
        assert_eq!(tokens, vec!["png", "jpg", "gif"]);
    }

    #[test]
    fn test_format_set_rejects_empty_tokens() {
        let mut set = FormatSet::new();
        assert!(!set.insert(FormatToken::new(".")));
        assert!(set.is_empty());
    }
}
