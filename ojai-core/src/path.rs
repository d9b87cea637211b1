//! Field paths addressing values inside a document tree.
//!
//! A path is written as dot-separated names with optional bracketed list indices:
//!
//! ```text
//! a.b[0].c
//! address."zip.code"
//! 'odd name'[3]
//! ```
//!
//! Quoted names may contain dots. Empty segments produced by repeated, leading or trailing
//! dots are skipped, so `""` and `"."` both parse to the empty path, which callers treat
//! as the whole document.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{OjaiError, OjaiResult};

/// Reserved name of the identity field.
pub const ID_FIELD: &str = "_id";

/// One component of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A map key.
    Name(String),
    /// A list position.
    Index(usize),
}

impl Segment {
    /// The list position this segment addresses, if any.
    ///
    /// Index segments always do; names do when they consist only of ASCII digits.
    pub fn list_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Name(name) => parse_index(name),
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(i) => write!(f, "[{}]", i),
            Segment::Name(name) if is_bare(name) => f.write_str(name),
            Segment::Name(name) if name.contains('"') => write!(f, "'{}'", name),
            Segment::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// An ordered sequence of names and indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parses a textual field path.
    ///
    /// Fails with [`OjaiError::MalformedPath`] on an unmatched bracket, a bracket whose
    /// content is not a non-negative integer, an unterminated quote, or trailing text
    /// directly after a closing quote.
    pub fn parse(input: &str) -> OjaiResult<Self> {
        let chars: Vec<char> = input.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => i += 1,
                c if c.is_whitespace() => i += 1,
                '[' => {
                    let close = find(&chars, i + 1, |c| c == ']')
                        .ok_or_else(|| malformed(input, "unmatched '['"))?;
                    let content: String = chars[i + 1..close].iter().collect();
                    let index = parse_index(content.trim()).ok_or_else(|| {
                        malformed(input, &format!("invalid index '[{}]'", content))
                    })?;
                    segments.push(Segment::Index(index));
                    i = close + 1;
                }
                ']' => return Err(malformed(input, "unmatched ']'")),
                quote @ ('"' | '\'') => {
                    let close = find(&chars, i + 1, |c| c == quote)
                        .ok_or_else(|| malformed(input, "unterminated quote"))?;
                    segments.push(Segment::Name(chars[i + 1..close].iter().collect()));
                    i = close + 1;
                    while i < chars.len() && chars[i].is_whitespace() {
                        i += 1;
                    }
                    if i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        return Err(malformed(input, "unexpected text after quoted name"));
                    }
                }
                _ => {
                    let end = find(&chars, i, |c| matches!(c, '.' | '[' | ']'))
                        .unwrap_or(chars.len());
                    let name: String = chars[i..end].iter().collect();
                    let name = name.trim();
                    if !name.is_empty() {
                        segments.push(Segment::Name(name.to_string()));
                    }
                    i = end;
                }
            }
        }

        Ok(FieldPath { segments })
    }

    /// Builds a path directly from segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        FieldPath { segments }
    }

    /// The segments, left to right.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path addresses the whole document.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this path is exactly the top-level identity field.
    pub fn is_identity(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Name(name)] if name == ID_FIELD)
    }

    /// Whether any segment is an explicit list index.
    pub fn has_index(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Index(_)))
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Everything but the final segment. The parent of the empty path is empty.
    pub fn parent(&self) -> FieldPath {
        let end = self.segments.len().saturating_sub(1);
        FieldPath {
            segments: self.segments[..end].to_vec(),
        }
    }
}

impl FromStr for FieldPath {
    type Err = OjaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl From<Vec<Segment>> for FieldPath {
    fn from(segments: Vec<Segment>) -> Self {
        FieldPath::from_segments(segments)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Name(_)) {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

fn find(chars: &[char], from: usize, pred: impl Fn(char) -> bool) -> Option<usize> {
    chars[from..].iter().position(|c| pred(*c)).map(|p| p + from)
}

fn parse_index(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_bare(name: &str) -> bool {
    !name.is_empty()
        && name.trim() == name
        && !name.starts_with(['"', '\''])
        && !name.contains(['.', '[', ']'])
}

fn malformed(input: &str, reason: &str) -> OjaiError {
    log::error!("Malformed field path {:?}: {}", input, reason);
    OjaiError::MalformedPath(format!("{:?}: {}", input, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Segment {
        Segment::Name(s.to_string())
    }

    #[test]
    fn test_parse_names_and_indices() {
        let path = FieldPath::parse("a.b[0].c").unwrap();
        assert_eq!(
            path.segments(),
            &[name("a"), name("b"), Segment::Index(0), name("c")]
        );
        assert_eq!(path.len(), 4);
        assert!(path.has_index());
    }

    #[test]
    fn test_quoted_names_keep_dots() {
        let path = FieldPath::parse("address.\"zip.code\"").unwrap();
        assert_eq!(path.segments(), &[name("address"), name("zip.code")]);

        let path = FieldPath::parse("'a.b'[2]").unwrap();
        assert_eq!(path.segments(), &[name("a.b"), Segment::Index(2)]);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        assert!(FieldPath::parse("").unwrap().is_empty());
        assert!(FieldPath::parse(".").unwrap().is_empty());
        let path = FieldPath::parse("..a. .b.").unwrap();
        assert_eq!(path.segments(), &[name("a"), name("b")]);
        let path = FieldPath::parse(" a b .c").unwrap();
        assert_eq!(path.segments(), &[name("a b"), name("c")]);
    }

    #[test]
    fn test_malformed_inputs() {
        for input in ["a[", "a]", "a[]", "a[-1]", "a[x]", "\"abc", "'a'b", "a[1"] {
            let err = FieldPath::parse(input).unwrap_err();
            assert!(matches!(err, OjaiError::MalformedPath(_)), "{}", input);
        }
    }

    #[test]
    fn test_display_reparses_to_same_path() {
        for input in ["a.b[0].c", "x[1][2]", "\"zip.code\".y", "'say \"hi\"'", "_id", "0.1"] {
            let path = FieldPath::parse(input).unwrap();
            let rendered = path.to_string();
            assert_eq!(FieldPath::parse(&rendered).unwrap(), path, "{}", rendered);
        }
        assert_eq!(FieldPath::parse(" a . b [3] ").unwrap().to_string(), "a.b[3]");
    }

    #[test]
    fn test_identity_and_split() {
        assert!(FieldPath::parse("_id").unwrap().is_identity());
        assert!(!FieldPath::parse("_id.x").unwrap().is_identity());

        let path = FieldPath::parse("a.b[1]").unwrap();
        assert_eq!(path.last(), Some(&Segment::Index(1)));
        assert_eq!(path.parent().to_string(), "a.b");
        assert!(FieldPath::default().parent().is_empty());
    }

    #[test]
    fn test_numeric_names_address_lists() {
        assert_eq!(name("12").list_index(), Some(12));
        assert_eq!(name("a1").list_index(), None);
        assert_eq!(Segment::Index(3).list_index(), Some(3));
    }
}
