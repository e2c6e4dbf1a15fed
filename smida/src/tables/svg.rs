//! The embedded-vector-image table.
//!
//! Each image-backed glyph's SVG asset is validated, rewritten for
//! renderer compatibility (inline styles expanded, root viewBox
//! removed and compensated with a transform), tagged with its glyph
//! ID and serialized into a per-glyph document record.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::glyph::GlyphRegistry;
use crate::{BuildError, FontMetrics};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Elements that do not work in color-font renderers. Fatal.
const RESTRICTED_ELEMENTS: &[&str] =
    &["text", "font", "foreignObject", "switch", "script", "a", "view"];

/// Elements that are not guaranteed to render. Warned about unless
/// compliance checking is relaxed.
const UNENFORCED_ELEMENTS: &[&str] =
    &["filter", "pattern", "mask", "marker", "symbol", "style", "cursor"];

#[derive(Clone, Debug)]
enum Node {
    Element(Element),
    Text(String),
}

/// A parsed SVG element. Namespace prefixes are kept verbatim in
/// names; matching is done on the local part.
#[derive(Clone, Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.attrs.push((key.to_owned(), value.to_owned())),
        }
    }

    fn remove_attr(&mut self, key: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(k, _)| k == key)?;
        Some(self.attrs.remove(index).1)
    }

    fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }
}

fn parse_error(path: &Path, message: impl std::fmt::Display) -> BuildError {
    BuildError::SvgParse {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn element_from(start: &BytesStart<'_>, path: &Path) -> Result<Element, BuildError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(path, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(path, e))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn parse_svg(text: &str, path: &Path) -> Result<Element, BuildError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| parse_error(path, e))?;
        match event {
            Event::Start(start) => stack.push(element_from(&start, path)?),
            Event::Empty(start) => {
                let element = element_from(&start, path)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => return Err(parse_error(path, "multiple root elements")),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error(path, "unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => return Err(parse_error(path, "multiple root elements")),
                }
            }
            Event::Text(text) => {
                let content = text
                    .unescape()
                    .map_err(|e| parse_error(path, e))?
                    .into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(content));
                }
            }
            Event::CData(cdata) => {
                let content = String::from_utf8_lossy(&cdata).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(content));
                }
            }
            Event::Eof => break,
            // declarations, comments, PIs and doctypes carry nothing
            // a glyph document needs
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(parse_error(path, "unclosed element"));
    }
    root.ok_or_else(|| parse_error(path, "no root element"))
}

fn parse_file(path: &Path) -> Result<Element, BuildError> {
    let text = fs::read_to_string(path).map_err(|source| BuildError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_svg(&text, path)
}

/// Depth-first search for any element whose local name is in `names`,
/// the root included.
fn find_element<'a>(element: &Element, names: &'a [&'a str]) -> Option<&'a str> {
    if let Some(found) = names.iter().copied().find(|n| *n == element.local_name()) {
        return Some(found);
    }
    element.children.iter().find_map(|child| match child {
        Node::Element(child) => find_element(child, names),
        Node::Text(_) => None,
    })
}

fn check_restricted(root: &Element, path: &Path) -> Result<(), BuildError> {
    if let Some(element) = find_element(root, RESTRICTED_ELEMENTS) {
        return Err(BuildError::RestrictedSvgElement {
            path: path.display().to_string(),
            element: element.to_owned(),
        });
    }
    Ok(())
}

fn warn_unenforced(root: &Element, path: &Path) {
    if let Some(element) = find_element(root, UNENFORCED_ELEMENTS) {
        log::warn!(
            "svg image '{}' has a '{element}' element; renderer support is not guaranteed",
            path.display()
        );
    }
}

/// Validate one SVG asset ahead of table construction. Restricted
/// elements are fatal; unenforced ones are logged unless `relaxed`.
pub fn check_file(path: &Path, relaxed: bool) -> Result<(), BuildError> {
    let root = parse_file(path)?;
    check_restricted(&root, path)?;
    if !relaxed {
        warn_unenforced(&root, path);
    }
    Ok(())
}

/// Rewrite every inline `style="k:v;..."` attribute into individual
/// presentation attributes on the same element.
fn strip_styles(element: &mut Element) {
    if let Some(style) = element.remove_attr("style") {
        for rule in style.split(';') {
            if let Some((key, value)) = rule.split_once(':') {
                if !key.trim().is_empty() {
                    element.set_attr(key.trim(), value.trim());
                }
            }
        }
    }
    for child in &mut element.children {
        if let Node::Element(child) = child {
            strip_styles(child);
        }
    }
}

/// Format a number the way the transform attribute expects: integral
/// values without a trailing fraction.
fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

/// Remove the root viewBox and compensate for the lost coordinate
/// frame: the root's children move into a group translated to the
/// glyph origin and scaled so the viewBox width spans one em.
fn compensate_viewbox(
    mut root: Element,
    metrics: &FontMetrics,
    path: &Path,
) -> Result<Element, BuildError> {
    let Some(viewbox) = root.remove_attr("viewBox") else {
        return Ok(root);
    };
    let width = viewbox
        .split_whitespace()
        .nth(2)
        .and_then(|w| w.parse::<f64>().ok())
        .filter(|w| *w > 0.0)
        .ok_or_else(|| BuildError::MalformedViewBox {
            path: path.display().to_string(),
        })?;

    let scale = f64::from(metrics.units_per_em) / width;
    let transform = format!(
        "translate({}, {}) scale({})",
        metrics.x_min,
        -metrics.y_max,
        format_number(scale)
    );
    let group = Element {
        name: "g".to_owned(),
        attrs: vec![("transform".to_owned(), transform)],
        children: std::mem::take(&mut root.children),
    };

    root.attrs
        .retain(|(k, _)| k != "xmlns" && k != "xmlns:xlink" && k != "version");
    root.attrs.insert(0, ("xmlns".to_owned(), SVG_NS.to_owned()));
    root.attrs
        .insert(1, ("xmlns:xlink".to_owned(), XLINK_NS.to_owned()));
    root.set_attr("version", "1.1");
    root.children = vec![Node::Element(group)];
    Ok(root)
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
    path: &Path,
) -> Result<(), BuildError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| parse_error(path, e))?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(start))
        .map_err(|e| parse_error(path, e))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child, path)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| parse_error(path, e))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| parse_error(path, e))?;
    Ok(())
}

fn serialize(root: &Element, path: &Path) -> Result<String, BuildError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| parse_error(path, e))?;
    write_element(&mut writer, root, path)?;
    String::from_utf8(writer.into_inner()).map_err(|e| parse_error(path, e))
}

/// One finished glyph document. `start_glyph_id` and `end_glyph_id`
/// are always equal; the table holds one document per glyph.
#[derive(Clone, Debug)]
pub struct SvgDocument {
    pub start_glyph_id: u16,
    pub end_glyph_id: u16,
    pub data: String,
}

/// The assembled embedded-vector-image table, documents in glyph-ID
/// order.
#[derive(Clone, Debug, Default)]
pub struct SvgTable {
    pub documents: Vec<SvgDocument>,
}

/// Build the vector table from the frozen registry. The `img` index
/// of each glyph is its document ID; compliance failures abort.
pub fn build_svg_table(
    registry: &GlyphRegistry,
    metrics: &FontMetrics,
) -> Result<SvgTable, BuildError> {
    let mut documents = Vec::new();
    for (id, glyph) in registry.img.iter().enumerate() {
        let Some(path) = glyph.svg_path() else {
            continue;
        };
        let mut root = parse_file(path)?;
        check_restricted(&root, path)?;
        strip_styles(&mut root);
        if root.attr("viewBox").is_some() {
            root = compensate_viewbox(root, metrics, path)?;
        }
        let id = id as u16;
        root.set_attr("id", &format!("glyph{id}"));
        let data = serialize(&root, path)?;
        documents.push(SvgDocument {
            start_glyph_id: id,
            end_glyph_id: id,
            data,
        });
    }
    Ok(SvgTable { documents })
}
