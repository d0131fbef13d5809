use smallvec::SmallVec;
use smol_str::SmolStr;
use std::fmt::{self, Display, Formatter};

/// A single bracketed unit `[name:arg1:arg2:...]`.
///
/// All structure above tokens is reconstructed on read and lost on write: two
/// tokens are equal iff their fragment sequences are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    fragments: SmallVec<[SmolStr; 4]>,
}

impl Token {
    /// Creates a token from a non-empty fragment sequence.
    ///
    /// ***Panics*** if `fragments` is empty; a token always has a name.
    pub fn new(fragments: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        let fragments: SmallVec<[SmolStr; 4]> = fragments.into_iter().map(Into::into).collect();
        assert!(!fragments.is_empty(), "a token must have at least a name fragment");
        Self { fragments }
    }

    /// The token's name (its first fragment).
    pub fn name(&self) -> &str {
        &self.fragments[0]
    }

    /// The token's arguments (every fragment after the name).
    pub fn args(&self) -> &[SmolStr] {
        &self.fragments[1..]
    }

    /// All fragments, including the name.
    pub fn fragments(&self) -> &[SmolStr] {
        &self.fragments
    }

    /// Joins every fragment (including the name) with `:`.
    pub fn colon_joined(&self) -> String {
        join_colon(&self.fragments)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.colon_joined())
    }
}

/// Joins a fragment sequence with `:`, used both for tokens and for the
/// argument runs passed to directives like `GO_TO_TAG` and `COPY_TAGS_FROM`.
pub fn join_colon<S: AsRef<str>>(fragments: &[S]) -> String {
    let mut out = String::new();
    for (i, frag) in fragments.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(frag.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_fields() {
        let token = Token::new(["BIOME", "MOUNTAIN"]);
        assert_eq!(token.name(), "BIOME");
        assert_eq!(token.args(), &[SmolStr::new("MOUNTAIN")]);
        assert_eq!(token.to_string(), "[BIOME:MOUNTAIN]");
    }

    #[test]
    fn test_equality_is_by_fragments() {
        let a = Token::new(["A", "1"]);
        let b = Token::new(["A", "1"]);
        let c = Token::new(["A", "2"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
