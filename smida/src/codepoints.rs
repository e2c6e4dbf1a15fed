//! Codepoint sequences and their canonical naming.

use std::cmp::Ordering;
use std::fmt;

use crate::BuildError;

/// VARIATION SELECTOR-16, the emoji presentation selector.
pub const VS16: u32 = 0xFE0F;
/// ZERO WIDTH JOINER.
pub const ZWJ: u32 = 0x200D;

/// A non-empty sequence of Unicode scalar values naming one glyph.
///
/// The `Ord` impl is the glyph-ID assignment order: shorter sequences
/// sort before longer ones, and equal-length sequences compare
/// lexicographically by value. Every emitted subtable relies on this
/// order being stable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodepointSeq(Vec<u32>);

impl CodepointSeq {
    /// Parse a delimited string of hex numbers, e.g. `1f3c3-200d-2640`.
    pub fn parse(input: &str, delimiter: char) -> Result<Self, BuildError> {
        Self::from_tokens(input.split(delimiter))
            .map_err(|_| BuildError::Naming(input.to_owned()))
    }

    /// Build a sequence from explicit hex tokens.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self, BuildError> {
        let mut seq = Vec::new();
        for token in tokens {
            let value = u32::from_str_radix(token, 16)
                .map_err(|_| BuildError::Naming(token.to_owned()))?;
            seq.push(value);
        }
        if seq.is_empty() {
            return Err(BuildError::Naming(String::new()));
        }
        Ok(Self(seq))
    }

    /// The canonical name: lowercase hex, no leading zeros, joined
    /// with `_` and prefixed with `u`. Presentation only, never used
    /// for ordering.
    pub fn name(&self) -> String {
        let hex: Vec<String> = self.0.iter().map(|c| format!("{c:x}")).collect();
        format!("u{}", hex.join("_"))
    }

    pub fn codepoints(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for sequences of more than one codepoint.
    pub fn is_ligature(&self) -> bool {
        self.0.len() > 1
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.0.contains(&codepoint)
    }

    /// A copy with every instance of `codepoint` removed. If removal
    /// would empty the sequence it is returned unchanged, preserving
    /// the length >= 1 invariant.
    pub fn without(&self, codepoint: u32) -> Self {
        let stripped: Vec<u32> = self.0.iter().copied().filter(|&c| c != codepoint).collect();
        if stripped.is_empty() {
            self.clone()
        } else {
            Self(stripped)
        }
    }
}

impl Ord for CodepointSeq {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for CodepointSeq {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CodepointSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_name_round_trip() {
        let seq = CodepointSeq::parse("1F3C3-200D-2640", '-').unwrap();
        assert_eq!(seq.name(), "u1f3c3_200d_2640");
        // delimiter-independent: same tokens, different separator
        let other = CodepointSeq::parse("1f3c3_200d_2640", '_').unwrap();
        assert_eq!(seq, other);
        assert_eq!(seq.name(), other.name());
    }

    #[test]
    fn name_has_no_leading_zeros() {
        let seq = CodepointSeq::from_tokens(["0061"]).unwrap();
        assert_eq!(seq.name(), "u61");
    }

    #[test]
    fn bad_token_is_a_naming_error() {
        assert!(matches!(
            CodepointSeq::parse("61-zz", '-'),
            Err(BuildError::Naming(_))
        ));
        assert!(matches!(
            CodepointSeq::parse("", '-'),
            Err(BuildError::Naming(_))
        ));
        assert!(matches!(
            CodepointSeq::from_tokens([]),
            Err(BuildError::Naming(_))
        ));
    }

    #[test]
    fn shorter_sequences_sort_first() {
        let long = CodepointSeq::from_tokens(["1", "1"]).unwrap();
        let short = CodepointSeq::from_tokens(["ffff"]).unwrap();
        // 0xffff > 0x1 by value, but length rules
        assert!(short < long);
    }

    #[test]
    fn equal_length_sorts_by_value() {
        let a = CodepointSeq::parse("61-300", '-').unwrap();
        let b = CodepointSeq::parse("61-301", '-').unwrap();
        assert!(a < b);
    }

    #[test]
    fn sort_is_idempotent() {
        let mut seqs = vec![
            CodepointSeq::parse("62-308d", '-').unwrap(),
            CodepointSeq::parse("308d", '-').unwrap(),
            CodepointSeq::parse("61", '-').unwrap(),
        ];
        seqs.sort();
        let once = seqs.clone();
        seqs.sort();
        assert_eq!(once, seqs);
        let names: Vec<String> = seqs.iter().map(CodepointSeq::name).collect();
        assert_eq!(names, ["u61", "u308d", "u62_308d"]);
    }

    #[test]
    fn without_strips_all_instances() {
        let seq = CodepointSeq::parse("fe0f-61-fe0f", '-').unwrap();
        assert_eq!(seq.without(VS16).name(), "u61");
    }

    #[test]
    fn without_never_empties_a_sequence() {
        let lone = CodepointSeq::parse("fe0f", '-').unwrap();
        assert_eq!(lone.without(VS16), lone);
    }
}
