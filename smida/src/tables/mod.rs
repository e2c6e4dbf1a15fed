//! Builders for the emitted subtables.
//!
//! Both builders consume a frozen [`GlyphRegistry`](crate::glyph::GlyphRegistry)
//! and are independent of each other; the registry's `img` order is the
//! glyph-ID contract they share.

pub mod bitmap;
pub mod svg;
