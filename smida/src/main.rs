//! Command-line front-end for the subtable compiler.
//!
//! Takes an input directory of glyph images, a manifest with the font
//! metrics record and an optional alias file, and runs the full build,
//! reporting what the packer would receive.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use smida::{compile, CompiledFont, FontFormat, Manifest, Plan};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Image glyphs directory
    #[arg(short, long, default_value = "in")]
    input: PathBuf,

    /// Alias glyphs file: a JSON object of target -> destination
    /// codepoint sequences
    #[arg(short, long)]
    aliases: Option<PathBuf>,

    /// Manifest file carrying the font metrics record
    #[arg(short, long, default_value = "manifest.json")]
    manifest: PathBuf,

    /// Output formats: SVGinOT, sbixOT, sbixTT, sbixOTiOS, sbixTTiOS, CBx
    #[arg(short = 'F', long = "format", default_value = "SVGinOT")]
    formats: Vec<String>,

    /// Delimiter between ligatured codepoints
    #[arg(short, long, default_value_t = '-')]
    delimiter: char,

    /// Disable VS16 handling (no stripping, no duplicate check, no
    /// lone-VS16 service glyph)
    #[arg(long)]
    no_vs16: bool,

    /// No unenforced SVG contents checking: skip warnings about SVG
    /// contents that are not guaranteed to render
    #[arg(long)]
    nusc: bool,

    /// No font consistency checking: skip the cross-subfolder parity
    /// check
    #[arg(long)]
    nfcc: bool,

    /// Strip ligatures from the output
    #[arg(long)]
    no_lig: bool,
}

fn run(args: &Args) -> Result<CompiledFont, Box<dyn std::error::Error>> {
    let manifest: Manifest = serde_json::from_str(&std::fs::read_to_string(&args.manifest)?)?;

    let aliases: Option<BTreeMap<String, String>> = match &args.aliases {
        Some(path) => Some(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    let mut formats = Vec::with_capacity(args.formats.len());
    for name in &args.formats {
        formats
            .push(FontFormat::from_name(name).ok_or_else(|| format!("unknown format '{name}'"))?);
    }

    let plan = Plan {
        input_dir: args.input.clone(),
        formats,
        delimiter: args.delimiter,
        vs16: !args.no_vs16,
        strict_svg: !args.nusc,
        check_consistency: !args.nfcc,
        keep_ligatures: !args.no_lig,
        metrics: manifest.metrics,
        aliases,
    };

    Ok(compile(&plan)?)
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(font) => {
            println!(
                "{} glyphs ({} image-backed), {} bitmap strikes, {} svg documents",
                font.registry.all.len(),
                font.registry.img.len(),
                font.bitmap_sizes.len(),
                font.svg_table.as_ref().map_or(0, |t| t.documents.len()),
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
