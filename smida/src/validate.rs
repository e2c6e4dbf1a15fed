//! Codepoint-level validation of glyph sequences.

use crate::codepoints::{CodepointSeq, ZWJ};
use crate::glyph::Glyph;
use crate::BuildError;

/// A single validation rule applied to a glyph's sequences.
///
/// Validators are interchangeable values so each rule can be tested in
/// isolation; the corpus assembler runs them against both the target
/// sequence and, for alias glyphs, the destination sequence.
pub trait SequenceValidator {
    fn validate(&self, glyph: &Glyph) -> Result<(), BuildError>;
}

/// Rejects codepoints outside the permitted Unicode scalar ranges:
/// controls below U+0020, surrogates, noncharacters, and anything
/// past U+10FFFF.
pub struct RestrictedCodepoints;

fn check_restricted(glyph: &Glyph, seq: &CodepointSeq) -> Result<(), BuildError> {
    for &cp in seq.codepoints() {
        let restricted = cp < 0x20
            || (0xD800..=0xDFFF).contains(&cp)
            || (0xFDD0..=0xFDEF).contains(&cp)
            || (cp & 0xFFFE) == 0xFFFE
            || cp > 0x10FFFF;
        if restricted {
            return Err(BuildError::RestrictedCodepoint {
                glyph: glyph.location(),
                codepoint: cp,
            });
        }
    }
    Ok(())
}

impl SequenceValidator for RestrictedCodepoints {
    fn validate(&self, glyph: &Glyph) -> Result<(), BuildError> {
        check_restricted(glyph, &glyph.codepoints)?;
        if let Some(destination) = glyph.alias_destination() {
            check_restricted(glyph, destination)?;
        }
        Ok(())
    }
}

/// Rejects sequences where ZWJ (U+200D) starts or ends the sequence
/// or appears twice in a row. A lone ZWJ passes; the lone-ZWJ service
/// glyph is legitimate.
pub struct ZwjSanity;

fn check_zwj(glyph: &Glyph, seq: &CodepointSeq) -> Result<(), BuildError> {
    let cps = seq.codepoints();
    if !cps.contains(&ZWJ) || cps.len() == 1 {
        return Ok(());
    }
    let misplaced = cps.first() == Some(&ZWJ)
        || cps.last() == Some(&ZWJ)
        || cps.windows(2).any(|w| w[0] == ZWJ && w[1] == ZWJ);
    if misplaced {
        return Err(BuildError::ZwjPlacement {
            glyph: glyph.location(),
        });
    }
    Ok(())
}

impl SequenceValidator for ZwjSanity {
    fn validate(&self, glyph: &Glyph) -> Result<(), BuildError> {
        check_zwj(glyph, &glyph.codepoints)?;
        if let Some(destination) = glyph.alias_destination() {
            check_zwj(glyph, destination)?;
        }
        Ok(())
    }
}
