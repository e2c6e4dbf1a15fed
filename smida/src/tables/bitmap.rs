//! Bitmap-strike metrics subtables (EBDT/EBLC/CBDT/CBLC and sbix
//! families), derived from the font-global bounding box.

use crate::assets::Strike;
use crate::glyph::GlyphRegistry;
use crate::{BuildError, FontMetrics};

/// Maximum signed 8-bit metric magnitude used by bitmap strikes; every
/// metric is expressed on this scale.
pub const BIT_SCALE: i16 = 127;

fn local_scale(metrics: &FontMetrics) -> f64 {
    metrics.height.max(metrics.width) as f64
}

/// `round(raw / localScale * 127)`, round-half-away-from-zero. The
/// same rounding applies to every metric field so strikes stay
/// proportionally consistent.
fn scaled(value: i32, local_scale: f64) -> i16 {
    ((value as f64 / local_scale) * f64::from(BIT_SCALE)).round() as i16
}

/// An EBDT/CBDT SmallGlyphMetrics record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmallGlyphMetrics {
    pub height: i16,
    pub width: i16,
    pub bearing_x: i16,
    pub bearing_y: i16,
    pub advance: i16,
}

impl SmallGlyphMetrics {
    pub fn new(metrics: &FontMetrics) -> Self {
        let scale = local_scale(metrics);
        let width = scaled(metrics.width, scale);
        SmallGlyphMetrics {
            height: scaled(metrics.height, scale),
            width,
            bearing_x: scaled(metrics.x_min, scale),
            // re-based so it lands in the same unsigned-ish family as
            // the other fields
            bearing_y: BIT_SCALE + scaled(metrics.y_min, scale),
            advance: width,
        }
    }
}

/// An EBDT/CBDT BigGlyphMetrics record, with separate horizontal and
/// vertical bearing/advance pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BigGlyphMetrics {
    pub height: i16,
    pub width: i16,
    pub hori_bearing_x: i16,
    pub hori_bearing_y: i16,
    pub hori_advance: i16,
    pub vert_bearing_x: i16,
    pub vert_bearing_y: i16,
    pub vert_advance: i16,
}

impl BigGlyphMetrics {
    pub fn new(metrics: &FontMetrics) -> Self {
        let scale = local_scale(metrics);
        let width = scaled(metrics.width, scale);
        let height = scaled(metrics.height, scale);
        BigGlyphMetrics {
            height,
            width,
            hori_bearing_x: scaled(metrics.x_min, scale),
            hori_bearing_y: BIT_SCALE + scaled(metrics.y_min, scale),
            hori_advance: width,
            vert_bearing_x: scaled(metrics.x_min, scale),
            vert_bearing_y: scaled(metrics.y_min, scale),
            vert_advance: height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Horizontal,
    Vertical,
}

/// An EBLC/CBLC sbitLineMetrics record. Caret-slope and side-bearing
/// fields are fixed at zero; this glyph class has no slanted caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SbitLineMetrics {
    pub direction: Direction,
    pub ascender: i16,
    pub descender: i16,
    pub width_max: i16,
    pub caret_slope_numerator: i16,
    pub caret_slope_denominator: i16,
    pub caret_offset: i16,
    pub min_origin_sb: i16,
    pub min_advance_sb: i16,
    pub max_before_bl: i16,
    pub min_after_bl: i16,
    pub pad1: i16,
    pub pad2: i16,
}

impl SbitLineMetrics {
    // NOTE: the vertical direction reuses the horizontal formulas;
    // distinct vertical metrics were never specified upstream.
    pub fn new(direction: Direction, metrics: &FontMetrics) -> Self {
        let scale = local_scale(metrics);
        SbitLineMetrics {
            direction,
            ascender: scaled(metrics.y_max, scale),
            descender: scaled(metrics.y_min, scale),
            width_max: scaled(metrics.width, scale),
            caret_slope_numerator: 0,
            caret_slope_denominator: 0,
            caret_offset: 0,
            min_origin_sb: 0,
            min_advance_sb: 0,
            max_before_bl: 0,
            min_after_bl: 0,
            pad1: 0,
            pad2: 0,
        }
    }
}

/// An EBLC/CBLC BitmapSize subtable: one per raster strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapSize {
    pub hori: SbitLineMetrics,
    pub vert: SbitLineMetrics,
    pub color_ref: u32,
    pub start_glyph_index: u16,
    pub end_glyph_index: u16,
    pub ppem_x: u16,
    pub ppem_y: u16,
    pub bit_depth: u8,
    pub flags: u8,
}

/// Build the size subtable for one strike. The glyph-index range is
/// the first and last `img` registry position holding an image at
/// this strike, scanned in ID order.
pub fn bitmap_size(
    strike: &Strike,
    metrics: &FontMetrics,
    registry: &GlyphRegistry,
) -> Result<BitmapSize, BuildError> {
    let mut range: Option<(u16, u16)> = None;
    for (id, glyph) in registry.img.iter().enumerate() {
        if glyph
            .images()
            .is_some_and(|images| images.contains_key(&strike.label))
        {
            let id = id as u16;
            range = Some(match range {
                None => (id, id),
                Some((start, _)) => (start, id),
            });
        }
    }
    let (start_glyph_index, end_glyph_index) =
        range.ok_or_else(|| BuildError::EmptyStrike(strike.label.clone()))?;

    Ok(BitmapSize {
        hori: SbitLineMetrics::new(Direction::Horizontal, metrics),
        vert: SbitLineMetrics::new(Direction::Vertical, metrics),
        color_ref: 0,
        start_glyph_index,
        end_glyph_index,
        ppem_x: strike.ppem,
        ppem_y: strike.ppem,
        bit_depth: 32, // color bit depth, fixed for this glyph class
        flags: 1,
    })
}

pub fn build_bitmap_sizes(
    registry: &GlyphRegistry,
    metrics: &FontMetrics,
    strikes: &[Strike],
) -> Result<Vec<BitmapSize>, BuildError> {
    strikes
        .iter()
        .map(|strike| bitmap_size(strike, metrics, registry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{Glyph, ImageSet};
    use std::path::PathBuf;

    fn box_metrics() -> FontMetrics {
        FontMetrics {
            x_min: 0,
            y_min: 0,
            x_max: 100,
            y_max: 80,
            width: 100,
            height: 50,
            units_per_em: 1000,
        }
    }

    #[test]
    fn small_metrics_scale_to_127() {
        let small = SmallGlyphMetrics::new(&box_metrics());
        // localScale = max(50, 100) = 100
        assert_eq!(small.width, 127);
        assert_eq!(small.height, 64); // round(50/100 * 127) = round(63.5)
        assert_eq!(small.bearing_x, 0);
        assert_eq!(small.bearing_y, 127); // 127 + round(0/100 * 127)
        assert_eq!(small.advance, small.width);
    }

    #[test]
    fn big_metrics_vertical_pair() {
        let metrics = FontMetrics {
            x_min: 10,
            y_min: -20,
            ..box_metrics()
        };
        let big = BigGlyphMetrics::new(&metrics);
        assert_eq!(big.hori_bearing_x, 13); // round(10/100 * 127)
        assert_eq!(big.hori_bearing_y, 127 - 25); // 127 + round(-20/100 * 127)
        assert_eq!(big.vert_bearing_y, -25); // no re-base vertically
        assert_eq!(big.hori_advance, big.width);
        assert_eq!(big.vert_advance, big.height);
    }

    #[test]
    fn line_metrics_fix_caret_fields_at_zero() {
        let line = SbitLineMetrics::new(Direction::Horizontal, &box_metrics());
        assert_eq!(line.ascender, 102); // round(80/100 * 127) = round(101.6)
        assert_eq!(line.descender, 0);
        assert_eq!(line.width_max, 127);
        assert_eq!(line.caret_slope_numerator, 0);
        assert_eq!(line.caret_slope_denominator, 0);
        assert_eq!(line.min_origin_sb, 0);
    }

    #[test]
    fn hori_and_vert_line_metrics_agree() {
        let metrics = box_metrics();
        let hori = SbitLineMetrics::new(Direction::Horizontal, &metrics);
        let vert = SbitLineMetrics::new(Direction::Vertical, &metrics);
        assert_eq!(hori.ascender, vert.ascender);
        assert_eq!(hori.descender, vert.descender);
        assert_eq!(hori.width_max, vert.width_max);
    }

    fn image_glyph(stem: &str, labels: &[&str]) -> Glyph {
        let mut images = ImageSet::new();
        for label in labels {
            images.insert(
                (*label).to_owned(),
                PathBuf::from(format!("in/{label}/{stem}")),
            );
        }
        Glyph::image(stem, images, '-').unwrap()
    }

    #[test]
    fn glyph_index_range_spans_populated_entries() {
        let registry = crate::glyph::GlyphRegistry::from_glyphs(vec![
            image_glyph("61", &["svg"]),
            image_glyph("62", &["svg", "png-32"]),
            image_glyph("63", &["svg", "png-32"]),
            image_glyph("64", &["svg"]),
        ]);
        let strike = Strike {
            label: "png-32".into(),
            ppem: 32,
        };
        let size = bitmap_size(&strike, &box_metrics(), &registry).unwrap();
        assert_eq!(size.start_glyph_index, 1);
        assert_eq!(size.end_glyph_index, 2);
        assert_eq!(size.ppem_x, 32);
        assert_eq!(size.bit_depth, 32);
    }

    #[test]
    fn strike_with_no_images_is_an_error() {
        let registry = crate::glyph::GlyphRegistry::from_glyphs(vec![image_glyph("61", &["svg"])]);
        let strike = Strike {
            label: "png-32".into(),
            ppem: 32,
        };
        assert!(matches!(
            bitmap_size(&strike, &box_metrics(), &registry),
            Err(BuildError::EmptyStrike(_))
        ));
    }
}
