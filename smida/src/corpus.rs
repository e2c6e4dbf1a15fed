//! The corpus assembler: turns scanned image sets and alias maps into
//! the ordered, validated glyph registry.
//!
//! Stages run in a fixed order and every failure is fatal; later
//! stages assume the invariants the earlier ones establish (the
//! duplicate check assumes VS16 is already stripped, the ligature
//! check assumes service glyphs are already injected).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use rayon::prelude::*;

use crate::assets::ImageScan;
use crate::codepoints::{CodepointSeq, VS16, ZWJ};
use crate::glyph::{Glyph, GlyphRegistry, GlyphSource, ImageSet};
use crate::tables::svg;
use crate::validate::{RestrictedCodepoints, SequenceValidator, ZwjSanity};
use crate::{BuildError, Plan};

/// Whether any glyph carried VS16 or ZWJ before stripping, threaded
/// out of service processing to drive service-glyph injection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServicePresence {
    pub vs16: bool,
    pub zwj: bool,
}

/// Build an image-backed glyph per file stem in the reference
/// subfolder, pointing its image set at the same stem in every
/// scanned subfolder (suffix adjusted per format).
pub fn compile_image_glyphs(
    root: &Path,
    delimiter: char,
    scan: &ImageScan,
) -> Result<Vec<Glyph>, BuildError> {
    let Some((_, reference_files)) = scan.reference() else {
        return Ok(Vec::new());
    };
    let mut glyphs = Vec::with_capacity(reference_files.len());
    for file in reference_files {
        let stem = file.file_stem().unwrap_or_default().to_string_lossy();
        let mut images = ImageSet::new();
        for label in scan.subfolders.keys() {
            let extension = label.split('-').next().unwrap_or(label);
            images.insert(
                label.clone(),
                root.join(label).join(format!("{stem}.{extension}")),
            );
        }
        glyphs.push(Glyph::image(&stem, images, delimiter)?);
    }
    Ok(glyphs)
}

/// Append alias glyphs. Targets must be new names; destinations must
/// resolve to existing image-backed glyphs.
pub fn compile_alias_glyphs(
    glyphs: &mut Vec<Glyph>,
    aliases: &BTreeMap<String, String>,
    delimiter: char,
) -> Result<(), BuildError> {
    for (target, destination) in aliases {
        let alias = Glyph::alias(target, destination, delimiter)?;
        if glyphs.iter().any(|g| g.codepoints == alias.codepoints) {
            return Err(BuildError::AliasTargetExists(target.clone()));
        }
        let resolves = glyphs.iter().any(|g| {
            g.is_image_backed() && Some(&g.codepoints) == alias.alias_destination()
        });
        if !resolves {
            return Err(BuildError::AliasUnresolved {
                target: target.clone(),
                destination: destination.clone(),
            });
        }
        glyphs.push(alias);
    }
    Ok(())
}

/// A copy of `glyph` with VS16 removed from the target and alias
/// sequences, `vs16_enabled` derived from what was stripped.
fn strip_vs16(glyph: Glyph) -> Glyph {
    let had_vs16 = glyph.codepoints.contains(VS16);
    let codepoints = glyph.codepoints.without(VS16);
    let vs16_enabled = had_vs16 && codepoints.len() == 1;
    let source = match glyph.source {
        GlyphSource::Alias(destination) => GlyphSource::Alias(destination.without(VS16)),
        other => other,
    };
    Glyph {
        codepoints,
        source,
        vs16_enabled,
    }
}

/// Stage 3: restricted-codepoint validation, VS16 stripping, ZWJ
/// sanity, then service-glyph injection. Returns the new glyph set
/// and the observed VS16/ZWJ presence.
pub fn process_service_codepoints(
    glyphs: Vec<Glyph>,
    vs16: bool,
) -> Result<(Vec<Glyph>, ServicePresence), BuildError> {
    let restricted = RestrictedCodepoints;
    let zwj_sanity = ZwjSanity;
    let mut presence = ServicePresence::default();
    let mut out = Vec::with_capacity(glyphs.len() + 4);

    for glyph in glyphs {
        restricted.validate(&glyph)?;

        let had_vs16 = glyph.codepoints.contains(VS16)
            || glyph
                .alias_destination()
                .is_some_and(|d| d.contains(VS16));
        let glyph = if vs16 {
            presence.vs16 |= had_vs16;
            strip_vs16(glyph)
        } else {
            glyph
        };

        let has_zwj = glyph.codepoints.contains(ZWJ)
            || glyph.alias_destination().is_some_and(|d| d.contains(ZWJ));
        if has_zwj {
            presence.zwj = true;
            zwj_sanity.validate(&glyph)?;
        }

        out.push(glyph);
    }

    out.push(Glyph::bare(&["20"])?);
    out.push(Glyph::bare(&["a0"])?);
    if presence.vs16 {
        out.push(Glyph::bare(&["fe0f"])?);
    }
    if presence.zwj {
        out.push(Glyph::bare(&["200d"])?);
    }

    Ok((out, presence))
}

/// Stage 4: with VS16 stripped, no two glyphs may share a sequence.
pub fn check_duplicates(glyphs: &[Glyph]) -> Result<(), BuildError> {
    let mut seen: HashMap<&CodepointSeq, &Glyph> = HashMap::with_capacity(glyphs.len());
    for glyph in glyphs {
        if let Some(first) = seen.insert(&glyph.codepoints, glyph) {
            return Err(BuildError::DuplicateSequence {
                first: first.location(),
                second: glyph.location(),
            });
        }
    }
    Ok(())
}

/// Stage 5: per-glyph vector-image compliance, run across a worker
/// pool. Raster images are not content-validated here.
pub fn validate_image_data(glyphs: &[Glyph], relaxed: bool) -> Result<(), BuildError> {
    glyphs
        .par_iter()
        .filter_map(Glyph::svg_path)
        .map(|path| svg::check_file(path, relaxed))
        .collect()
}

/// Stage 6 alternative: discard every multi-codepoint glyph.
pub fn strip_ligatures(glyphs: Vec<Glyph>) -> Vec<Glyph> {
    glyphs
        .into_iter()
        .filter(|g| !g.codepoints.is_ligature())
        .collect()
}

/// Stage 7: every codepoint of every ligature must exist as some
/// single glyph's sole codepoint.
pub fn check_ligature_composition(glyphs: &[Glyph]) -> Result<(), BuildError> {
    let singles: HashSet<u32> = glyphs
        .iter()
        .filter(|g| !g.codepoints.is_ligature())
        .map(|g| g.codepoints.codepoints()[0])
        .collect();

    for glyph in glyphs.iter().filter(|g| g.codepoints.is_ligature()) {
        for &codepoint in glyph.codepoints.codepoints() {
            if !singles.contains(&codepoint) {
                return Err(BuildError::LigatureComponent {
                    ligature: glyph.location(),
                    codepoint,
                });
            }
        }
    }
    Ok(())
}

/// Run the full pipeline over a finished scan and freeze the registry.
pub fn assemble(plan: &Plan, scan: &ImageScan) -> Result<GlyphRegistry, BuildError> {
    log::info!("compiling image glyphs");
    let mut glyphs = compile_image_glyphs(&plan.input_dir, plan.delimiter, scan)?;

    if let Some(aliases) = &plan.aliases {
        log::info!("compiling alias glyphs");
        compile_alias_glyphs(&mut glyphs, aliases, plan.delimiter)?;
    }

    log::info!("processing service codepoints");
    let (mut glyphs, _presence) = process_service_codepoints(glyphs, plan.vs16)?;

    if plan.vs16 {
        log::info!("checking for duplicate sequences with VS16 stripped");
        check_duplicates(&glyphs)?;
    }

    log::info!("validating image glyph data");
    validate_image_data(&glyphs, !plan.strict_svg)?;

    if plan.keep_ligatures {
        log::info!("validating ligature composition");
        check_ligature_composition(&glyphs)?;
    } else {
        log::info!("stripping ligatures");
        glyphs = strip_ligatures(glyphs);
    }

    log::info!("sorting glyphs into ID order");
    Ok(GlyphRegistry::from_glyphs(glyphs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn scan_of(subfolders: &[(&str, &[&str])]) -> ImageScan {
        let mut map = IndexMap::new();
        for (label, stems) in subfolders {
            let files: Vec<PathBuf> = stems
                .iter()
                .map(|stem| PathBuf::from(format!("in/{label}/{stem}")))
                .collect();
            map.insert((*label).to_owned(), files);
        }
        ImageScan {
            subfolders: map,
            strikes: Vec::new(),
        }
    }

    fn image_glyph(stem: &str) -> Glyph {
        let mut images = ImageSet::new();
        images.insert("svg".to_owned(), PathBuf::from(format!("in/svg/{stem}.svg")));
        Glyph::image(stem, images, '-').unwrap()
    }

    fn names(glyphs: &[Glyph]) -> Vec<String> {
        glyphs.iter().map(|g| g.codepoints.name()).collect()
    }

    #[test]
    fn image_glyphs_point_at_every_subfolder() {
        let scan = scan_of(&[
            ("svg", &["61.svg", "62.svg"]),
            ("png-32", &["61.png", "62.png"]),
        ]);
        let glyphs = compile_image_glyphs(Path::new("in"), '-', &scan).unwrap();
        assert_eq!(names(&glyphs), ["u61", "u62"]);

        let images = glyphs[0].images().unwrap();
        assert_eq!(images["svg"], PathBuf::from("in/svg/61.svg"));
        // strike label keeps its name, file keeps the format suffix
        assert_eq!(images["png-32"], PathBuf::from("in/png-32/61.png"));
    }

    #[test]
    fn malformed_stem_aborts_compilation() {
        let scan = scan_of(&[("svg", &["oops!.svg"])]);
        assert!(matches!(
            compile_image_glyphs(Path::new("in"), '-', &scan),
            Err(BuildError::Naming(_))
        ));
    }

    #[test]
    fn alias_target_must_be_new() {
        let mut glyphs = vec![image_glyph("61")];
        let aliases = BTreeMap::from([("61".to_owned(), "61".to_owned())]);
        assert!(matches!(
            compile_alias_glyphs(&mut glyphs, &aliases, '-'),
            Err(BuildError::AliasTargetExists(t)) if t == "61"
        ));
    }

    #[test]
    fn alias_destination_must_resolve_to_an_image_glyph() {
        let mut glyphs = vec![image_glyph("61")];
        let aliases = BTreeMap::from([("1f9e1".to_owned(), "63".to_owned())]);
        assert!(matches!(
            compile_alias_glyphs(&mut glyphs, &aliases, '-'),
            Err(BuildError::AliasUnresolved { destination, .. }) if destination == "63"
        ));

        // an alias is not a valid destination either
        let mut glyphs = vec![image_glyph("61")];
        let aliases = BTreeMap::from([
            ("1f9e1".to_owned(), "61".to_owned()),
            ("1f9e2".to_owned(), "1f9e1".to_owned()),
        ]);
        assert!(matches!(
            compile_alias_glyphs(&mut glyphs, &aliases, '-'),
            Err(BuildError::AliasUnresolved { .. })
        ));
    }

    #[test]
    fn valid_aliases_are_appended() {
        let mut glyphs = vec![image_glyph("61")];
        let aliases = BTreeMap::from([("1f9e1".to_owned(), "61".to_owned())]);
        compile_alias_glyphs(&mut glyphs, &aliases, '-').unwrap();
        assert_eq!(names(&glyphs), ["u61", "u1f9e1"]);
    }

    #[test]
    fn service_processing_strips_vs16_and_injects_service_glyphs() {
        let glyphs = vec![image_glyph("263a-fe0f"), image_glyph("61")];
        let (glyphs, presence) = process_service_codepoints(glyphs, true).unwrap();

        assert!(presence.vs16);
        assert!(!presence.zwj);
        assert_eq!(names(&glyphs), ["u263a", "u61", "u20", "ua0", "ufe0f"]);
        assert!(glyphs[0].vs16_enabled);
        assert!(!glyphs[1].vs16_enabled);
    }

    #[test]
    fn zwj_presence_injects_the_zwj_glyph() {
        let glyphs = vec![
            image_glyph("1f3c3-200d-2640"),
            image_glyph("1f3c3"),
            image_glyph("2640"),
        ];
        let (glyphs, presence) = process_service_codepoints(glyphs, true).unwrap();
        assert!(presence.zwj);
        assert_eq!(names(&glyphs).last().unwrap().as_str(), "u200d");
    }

    #[test]
    fn vs16_disabled_leaves_sequences_alone() {
        let glyphs = vec![image_glyph("263a-fe0f")];
        let (glyphs, presence) = process_service_codepoints(glyphs, false).unwrap();
        assert!(!presence.vs16);
        assert_eq!(names(&glyphs), ["u263a_fe0f", "u20", "ua0"]);
        assert!(!glyphs[0].vs16_enabled);
    }

    #[test]
    fn restricted_codepoints_abort_processing() {
        let glyphs = vec![image_glyph("d800")];
        assert!(matches!(
            process_service_codepoints(glyphs, true),
            Err(BuildError::RestrictedCodepoint { .. })
        ));
    }

    #[test]
    fn stripping_vs16_exposes_duplicates() {
        let glyphs = vec![image_glyph("263a-fe0f"), image_glyph("263a")];
        let (glyphs, _) = process_service_codepoints(glyphs, true).unwrap();
        assert!(matches!(
            check_duplicates(&glyphs),
            Err(BuildError::DuplicateSequence { first, second })
                if first.contains("263a") && second.contains("263a")
        ));
    }

    #[test]
    fn ligature_with_missing_component_fails() {
        let glyphs = vec![image_glyph("61"), image_glyph("62-308d")];
        assert!(matches!(
            check_ligature_composition(&glyphs),
            Err(BuildError::LigatureComponent { codepoint: 0x62, .. })
        ));

        let glyphs = vec![
            image_glyph("61"),
            image_glyph("62"),
            image_glyph("62-308d"),
        ];
        assert!(matches!(
            check_ligature_composition(&glyphs),
            Err(BuildError::LigatureComponent { codepoint: 0x308d, .. })
        ));
    }

    #[test]
    fn complete_ligatures_pass() {
        let glyphs = vec![
            image_glyph("61"),
            image_glyph("308d"),
            image_glyph("61-308d"),
        ];
        assert!(check_ligature_composition(&glyphs).is_ok());
    }

    #[test]
    fn strip_ligatures_keeps_singles_only() {
        let glyphs = vec![image_glyph("61"), image_glyph("61-308d")];
        assert_eq!(names(&strip_ligatures(glyphs)), ["u61"]);
    }
}
