//! Compiling a directory of per-codepoint-sequence image assets into
//! the structured subtables of a color font.
//!
//! The pipeline scans an input directory (`svg` and/or `png-<size>`
//! subfolders of images named by hex codepoint sequence), assembles a
//! validated, deterministically ordered glyph registry, and builds
//! bitmap-strike metrics subtables and an embedded-vector-image table
//! from it. The registry's `img` order is the glyph-ID assignment and
//! must be preserved verbatim by whatever packs the resulting table
//! objects into a binary font; packing itself is out of scope here.

pub mod assets;
pub mod codepoints;
pub mod corpus;
pub mod glyph;
pub mod tables;
pub mod validate;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use glyph::{Glyph, GlyphRegistry};
pub use tables::bitmap::BitmapSize;
pub use tables::svg::SvgTable;

/// Everything that can abort a build. Every variant is fatal; there
/// is no partial-output mode, because a font with silently dropped or
/// misordered glyphs is worse than a failed build.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("codepoint sequence '{0}' is not a delimited list of hex numbers")]
    Naming(String),

    #[error("no 'svg' subfolder in the input directory")]
    MissingSvgFolder,

    #[error("the 'svg' subfolder has no svg images")]
    EmptySvgFolder,

    #[error("strike subfolder '{0}' is not named like 'png-<size>'")]
    MalformedStrikeName(String),

    #[error("no 'png-<size>' strike subfolders in the input directory")]
    MissingStrikeFolders,

    #[error("strike '{0}' has no images")]
    EmptyStrike(String),

    #[error("glyph '{0}' has both an image set and an alias destination")]
    AliasWithImage(String),

    #[error("subfolder '{folder}' has {count} images but '{reference}' has {reference_count}")]
    GlyphCountMismatch {
        folder: String,
        count: usize,
        reference: String,
        reference_count: usize,
    },

    #[error("subfolder '{reference}' has '{stem}' but subfolder '{folder}' does not")]
    MissingCounterpart {
        stem: String,
        folder: String,
        reference: String,
    },

    #[error("alias target '{0}' already names an existing glyph")]
    AliasTargetExists(String),

    #[error("alias '{target}' points at '{destination}', which is not an image glyph")]
    AliasUnresolved { target: String, destination: String },

    #[error("glyph '{first}' matches '{second}' once VS16 (U+FE0F) is stripped")]
    DuplicateSequence { first: String, second: String },

    #[error("ligature '{ligature}' uses U+{codepoint:04X}, which has no single-codepoint glyph")]
    LigatureComponent { ligature: String, codepoint: u32 },

    #[error("glyph '{glyph}' contains restricted codepoint U+{codepoint:04X}")]
    RestrictedCodepoint { glyph: String, codepoint: u32 },

    #[error("glyph '{glyph}' has a ZWJ (U+200D) at the edge of a sequence or doubled up")]
    ZwjPlacement { glyph: String },

    #[error("svg image '{path}' has a '{element}' element, which does not work in color fonts")]
    RestrictedSvgElement { path: String, element: String },

    #[error("svg image '{path}' could not be parsed: {message}")]
    SvgParse { path: String, message: String },

    #[error("svg image '{path}' has a malformed viewBox")]
    MalformedViewBox { path: String },

    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// An output font format. The compiler only cares which image class a
/// format consumes; the binary container differences live downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFormat {
    /// SVGinOT
    SvgInOt,
    /// sbixOT
    SbixOt,
    /// sbixTT
    SbixTt,
    /// sbixOTiOS
    SbixOtIos,
    /// sbixTTiOS
    SbixTtIos,
    /// CBDT/CBLC (CBx)
    Cbdt,
}

impl FontFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SVGinOT" => Some(Self::SvgInOt),
            "sbixOT" => Some(Self::SbixOt),
            "sbixTT" => Some(Self::SbixTt),
            "sbixOTiOS" => Some(Self::SbixOtIos),
            "sbixTTiOS" => Some(Self::SbixTtIos),
            "CBx" => Some(Self::Cbdt),
            _ => None,
        }
    }

    pub fn needs_svg(self) -> bool {
        matches!(self, Self::SvgInOt)
    }

    pub fn needs_png(self) -> bool {
        !self.needs_svg()
    }
}

/// The font-global metrics record from the manifest, applied to every
/// glyph and strike.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FontMetrics {
    #[serde(rename = "xMin")]
    pub x_min: i32,
    #[serde(rename = "yMin")]
    pub y_min: i32,
    #[serde(rename = "xMax")]
    pub x_max: i32,
    #[serde(rename = "yMax")]
    pub y_max: i32,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "unitsPerEm")]
    pub units_per_em: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Manifest {
    pub metrics: FontMetrics,
}

/// A fully resolved build configuration.
#[derive(Clone, Debug)]
pub struct Plan {
    pub input_dir: PathBuf,
    pub formats: Vec<FontFormat>,
    /// Delimiter between codepoints in file stems and alias keys.
    pub delimiter: char,
    /// VS16 handling: strip U+FE0F from sequences, derive
    /// `vs16_enabled`, check for post-strip duplicates and inject the
    /// lone-VS16 service glyph when observed.
    pub vs16: bool,
    /// When false, skip warnings about SVG contents that are not
    /// guaranteed to render.
    pub strict_svg: bool,
    /// Cross-subfolder parity check on the scanned image sets.
    pub check_consistency: bool,
    /// When false, multi-codepoint glyphs are discarded instead of
    /// validated.
    pub keep_ligatures: bool,
    pub metrics: FontMetrics,
    pub aliases: Option<BTreeMap<String, String>>,
}

/// The compiler's output: the glyph-ID contract plus one entry per
/// emitted subtable, ready for an external packer.
#[derive(Clone, Debug)]
pub struct CompiledFont {
    pub registry: GlyphRegistry,
    pub bitmap_sizes: Vec<BitmapSize>,
    pub svg_table: Option<SvgTable>,
}

/// Run the whole build: scan, assemble, then emit each requested
/// subtable from the frozen registry.
pub fn compile(plan: &Plan) -> Result<CompiledFont, BuildError> {
    let needs_svg = plan.formats.iter().any(|f| f.needs_svg());
    let needs_png = plan.formats.iter().any(|f| f.needs_png());

    log::info!("scanning '{}'", plan.input_dir.display());
    let scan = assets::scan_images(&plan.input_dir, needs_svg, needs_png)?;
    if plan.check_consistency {
        assets::check_consistency(&scan)?;
    }

    let registry = corpus::assemble(plan, &scan)?;

    let bitmap_sizes = if needs_png {
        log::info!("building bitmap size tables");
        tables::bitmap::build_bitmap_sizes(&registry, &plan.metrics, &scan.strikes)?
    } else {
        Vec::new()
    };

    let svg_table = if needs_svg {
        log::info!("building the svg table");
        Some(tables::svg::build_svg_table(&registry, &plan.metrics)?)
    } else {
        None
    };

    Ok(CompiledFont {
        registry,
        bitmap_sizes,
        svg_table,
    })
}
