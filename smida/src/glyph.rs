//! Glyphs and the ordered registry that fixes their IDs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codepoints::CodepointSeq;
use crate::BuildError;

/// Per-subfolder image locations for one glyph, keyed by subfolder
/// label (`svg`, `png-128`, ...).
pub type ImageSet = BTreeMap<String, PathBuf>;

/// What backs a glyph. A glyph is image-backed, an alias to another
/// glyph, or a bare service glyph; it can never be more than one.
#[derive(Clone, Debug)]
pub enum GlyphSource {
    Image(ImageSet),
    Alias(CodepointSeq),
    Bare,
}

#[derive(Clone, Debug)]
pub struct Glyph {
    pub codepoints: CodepointSeq,
    pub source: GlyphSource,
    /// Set during service-codepoint processing: the original sequence
    /// carried VS16 and reduced to a single codepoint once stripped.
    pub vs16_enabled: bool,
}

impl Glyph {
    fn from_parts(
        codepoints: CodepointSeq,
        images: Option<ImageSet>,
        alias: Option<CodepointSeq>,
    ) -> Result<Self, BuildError> {
        let source = match (images, alias) {
            (Some(_), Some(_)) => {
                return Err(BuildError::AliasWithImage(codepoints.name()));
            }
            (Some(images), None) => GlyphSource::Image(images),
            (None, Some(destination)) => GlyphSource::Alias(destination),
            (None, None) => GlyphSource::Bare,
        };
        Ok(Glyph {
            codepoints,
            source,
            vs16_enabled: false,
        })
    }

    /// An image-backed glyph named by a file stem.
    pub fn image(stem: &str, images: ImageSet, delimiter: char) -> Result<Self, BuildError> {
        let codepoints = CodepointSeq::parse(stem, delimiter)?;
        Self::from_parts(codepoints, Some(images), None)
    }

    /// An alias glyph pointing at another glyph's sequence.
    pub fn alias(target: &str, destination: &str, delimiter: char) -> Result<Self, BuildError> {
        let codepoints = CodepointSeq::parse(target, delimiter)?;
        let destination = CodepointSeq::parse(destination, delimiter)?;
        Self::from_parts(codepoints, None, Some(destination))
    }

    /// A synthesized service glyph with no image and no alias.
    pub fn bare(tokens: &[&str]) -> Result<Self, BuildError> {
        let codepoints = CodepointSeq::from_tokens(tokens.iter().copied())?;
        Self::from_parts(codepoints, None, None)
    }

    pub fn images(&self) -> Option<&ImageSet> {
        match &self.source {
            GlyphSource::Image(images) => Some(images),
            _ => None,
        }
    }

    pub fn alias_destination(&self) -> Option<&CodepointSeq> {
        match &self.source {
            GlyphSource::Alias(destination) => Some(destination),
            _ => None,
        }
    }

    pub fn is_image_backed(&self) -> bool {
        matches!(self.source, GlyphSource::Image(_))
    }

    /// The glyph's vector asset, if it has one.
    pub fn svg_path(&self) -> Option<&Path> {
        self.images()?.get("svg").map(PathBuf::as_path)
    }

    /// Something to point at in an error message: an image location
    /// when the glyph has one, the canonical name otherwise.
    pub fn location(&self) -> String {
        match self.images().and_then(|images| images.values().next()) {
            Some(path) => path.display().to_string(),
            None => self.codepoints.name(),
        }
    }
}

/// The finished glyph set, sorted into ID order.
///
/// `all` holds every glyph including aliases; `img` holds image-backed
/// glyphs only. The index of a glyph in `img` is its numeric glyph ID
/// in every emitted subtable, so both sequences use the `CodepointSeq`
/// total order and are never reordered after construction.
#[derive(Clone, Debug, Default)]
pub struct GlyphRegistry {
    pub all: Vec<Glyph>,
    pub img: Vec<Glyph>,
}

impl GlyphRegistry {
    pub fn from_glyphs(glyphs: Vec<Glyph>) -> Self {
        let mut img: Vec<Glyph> = glyphs
            .iter()
            .filter(|g| g.is_image_backed())
            .cloned()
            .collect();
        let mut all = glyphs;
        all.sort_by(|a, b| a.codepoints.cmp(&b.codepoints));
        img.sort_by(|a, b| a.codepoints.cmp(&b.codepoints));
        GlyphRegistry { all, img }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_set(label: &str, file: &str) -> ImageSet {
        let mut images = ImageSet::new();
        images.insert(label.to_owned(), PathBuf::from(file));
        images
    }

    #[test]
    fn image_glyph_from_stem() {
        let g = Glyph::image("1f600", image_set("svg", "in/svg/1f600.svg"), '-').unwrap();
        assert!(g.is_image_backed());
        assert_eq!(g.codepoints.name(), "u1f600");
        assert_eq!(g.svg_path(), Some(Path::new("in/svg/1f600.svg")));
    }

    #[test]
    fn alias_glyph_carries_destination() {
        let g = Glyph::alias("1f3f3-1f308", "1f308", '-').unwrap();
        assert!(!g.is_image_backed());
        assert_eq!(g.alias_destination().unwrap().name(), "u1f308");
    }

    #[test]
    fn malformed_stem_is_a_naming_error() {
        assert!(matches!(
            Glyph::image("not-hex!", ImageSet::new(), '-'),
            Err(BuildError::Naming(_))
        ));
        assert!(matches!(
            Glyph::alias("61", "not-hex!", '-'),
            Err(BuildError::Naming(_))
        ));
    }

    #[test]
    fn image_and_alias_together_is_rejected() {
        let codepoints = CodepointSeq::parse("61", '-').unwrap();
        let destination = CodepointSeq::parse("62", '-').unwrap();
        let result = Glyph::from_parts(
            codepoints,
            Some(image_set("svg", "a.svg")),
            Some(destination),
        );
        assert!(matches!(result, Err(BuildError::AliasWithImage(_))));
    }

    #[test]
    fn registry_sorts_and_partitions() {
        let glyphs = vec![
            Glyph::image("62-308d", image_set("svg", "b.svg"), '-').unwrap(),
            Glyph::bare(&["20"]).unwrap(),
            Glyph::image("61", image_set("svg", "a.svg"), '-').unwrap(),
            Glyph::alias("1f9e1", "61", '-').unwrap(),
            Glyph::image("308d", image_set("svg", "c.svg"), '-').unwrap(),
        ];
        let registry = GlyphRegistry::from_glyphs(glyphs);

        let all_names: Vec<String> = registry.all.iter().map(|g| g.codepoints.name()).collect();
        assert_eq!(all_names, ["u20", "u61", "u308d", "u1f9e1", "u62_308d"]);

        let img_names: Vec<String> = registry.img.iter().map(|g| g.codepoints.name()).collect();
        assert_eq!(img_names, ["u61", "u308d", "u62_308d"]);
    }
}
