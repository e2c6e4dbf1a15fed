//! Input-directory scanning: the only filesystem-facing part of the
//! compiler.
//!
//! The input root has a fixed layout: one `svg` subfolder and/or one
//! or more `png-<size>` strike subfolders, each holding files named
//! `<codepoint-sequence>.<ext>`.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::BuildError;

/// One raster strike subfolder and its pixels-per-em size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Strike {
    pub label: String,
    pub ppem: u16,
}

/// The discovered image set: subfolder label to image files. The map
/// preserves scan order, so the first entry is the reference subfolder
/// for the consistency check and image-glyph compilation.
#[derive(Clone, Debug, Default)]
pub struct ImageScan {
    pub subfolders: IndexMap<String, Vec<PathBuf>>,
    pub strikes: Vec<Strike>,
}

impl ImageScan {
    pub fn reference(&self) -> Option<(&str, &[PathBuf])> {
        self.subfolders
            .first()
            .map(|(label, files)| (label.as_str(), files.as_slice()))
    }
}

fn read_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Read {
        path: path.display().to_string(),
        source,
    }
}

/// Files in `dir` with the given extension, sorted by name. Hidden
/// files are skipped.
fn image_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| read_error(dir, e))? {
        let entry = entry.map_err(|e| read_error(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !path.is_file() {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Walk the input root and discover the per-format/per-strike image
/// sets the requested output formats need.
pub fn scan_images(root: &Path, needs_svg: bool, needs_png: bool) -> Result<ImageScan, BuildError> {
    let mut scan = ImageScan::default();

    if needs_svg {
        let svg_dir = root.join("svg");
        if !svg_dir.is_dir() {
            return Err(BuildError::MissingSvgFolder);
        }
        let files = image_files(&svg_dir, "svg")?;
        if files.is_empty() {
            return Err(BuildError::EmptySvgFolder);
        }
        scan.subfolders.insert("svg".to_owned(), files);
    }

    if needs_png {
        let mut strikes = Vec::new();
        for entry in fs::read_dir(root).map_err(|e| read_error(root, e))? {
            let entry = entry.map_err(|e| read_error(root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() || !name.starts_with("png") {
                continue;
            }
            let Some((_, size)) = name.split_once('-') else {
                return Err(BuildError::MalformedStrikeName(name));
            };
            let Ok(ppem) = size.parse::<u16>() else {
                return Err(BuildError::MalformedStrikeName(name));
            };
            strikes.push(Strike { label: name, ppem });
        }
        if strikes.is_empty() {
            return Err(BuildError::MissingStrikeFolders);
        }
        strikes.sort_by_key(|s| s.ppem);

        for strike in &strikes {
            let files = image_files(&root.join(&strike.label), "png")?;
            if files.is_empty() {
                return Err(BuildError::EmptyStrike(strike.label.clone()));
            }
            scan.subfolders.insert(strike.label.clone(), files);
        }
        scan.strikes = strikes;
    }

    Ok(scan)
}

fn stem_of(path: &Path) -> String {
    path.file_stem().unwrap_or_default().to_string_lossy().into_owned()
}

/// Cross-subfolder parity: with more than one subfolder scanned, every
/// subfolder must hold the same number of images, and every stem in
/// the reference subfolder must exist in every other subfolder.
pub fn check_consistency(scan: &ImageScan) -> Result<(), BuildError> {
    if scan.subfolders.len() < 2 {
        return Ok(());
    }
    let Some((reference, reference_files)) = scan.reference() else {
        return Ok(());
    };

    for (label, files) in scan.subfolders.iter().skip(1) {
        if files.len() != reference_files.len() {
            return Err(BuildError::GlyphCountMismatch {
                folder: label.clone(),
                count: files.len(),
                reference: reference.to_owned(),
                reference_count: reference_files.len(),
            });
        }
    }

    for file in reference_files {
        let stem = stem_of(file);
        for (label, files) in scan.subfolders.iter().skip(1) {
            if !files.iter().any(|f| stem_of(f) == stem) {
                return Err(BuildError::MissingCounterpart {
                    stem: stem.clone(),
                    folder: label.clone(),
                    reference: reference.to_owned(),
                });
            }
        }
    }

    Ok(())
}
