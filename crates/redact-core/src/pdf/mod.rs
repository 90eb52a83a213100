//! lopdf-backed document adapter
//!
//! [`PdfDocument`] owns a parsed PDF and hands out [`PdfPage`] handles. A
//! page reads its text layout from the content stream and implements
//! [`RedactionSurface`]: removals rewrite the content stream when committed,
//! drawing operations are queued and stacked on top of the page content when
//! the document is serialized.

mod fonts;
mod rewrite;
mod text;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::apply::RedactionSurface;
use crate::error::{RedactError, Result};
use crate::geometry::{Color, Point, Rect};
use crate::layout::TextBlock;

use fonts::FontMetrics;
use text::FontSet;

/// Resource name of the font used for overlay text
const OVERLAY_FONT: &str = "RdxHelv";

/// Guard against cyclic `Parent` chains
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Follow a reference to the object it points at
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Numeric value of an integer or real operand
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Drawing queued for one page, written out when the document is serialized
#[derive(Debug, Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    uses_font: bool,
}

/// An open PDF document
pub struct PdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    overlays: BTreeMap<u32, PageOverlay>,
}

impl PdfDocument {
    /// Read and parse the file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RedactError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(RedactError::Io(e)),
        };
        let document = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), pages = document.page_count(), "Opened document");
        Ok(document)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| RedactError::Parse(e.to_string()))?;
        let pages = doc.get_pages();
        Ok(Self {
            doc,
            pages,
            overlays: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page numbers in document order, 1-based
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    pub fn page(&mut self, number: u32) -> Result<PdfPage<'_>> {
        let id = *self
            .pages
            .get(&number)
            .ok_or_else(|| RedactError::Pdf(format!("Page {} does not exist", number)))?;
        Ok(PdfPage {
            doc: &mut self.doc,
            overlay: self.overlays.entry(number).or_default(),
            number,
            id,
            pending: Vec::new(),
        })
    }

    /// Serialize with every queued overlay applied
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_overlays()?;
        self.doc.prune_objects();
        self.doc.compress();

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| RedactError::Pdf(format!("Failed to serialize PDF: {}", e)))?;
        Ok(output)
    }

    /// Write the document to `path` atomically. Returns the size written.
    pub fn save(&mut self, path: &Path) -> Result<u64> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved document");
        Ok(bytes.len() as u64)
    }

    pub fn close(self) {
        debug!(pages = self.pages.len(), "Closed document");
    }

    fn flush_overlays(&mut self) -> Result<()> {
        let overlays = std::mem::take(&mut self.overlays);
        for (number, overlay) in overlays {
            if overlay.operations.is_empty() {
                continue;
            }
            let Some(&page_id) = self.pages.get(&number) else {
                continue;
            };
            if overlay.uses_font {
                install_overlay_font(&mut self.doc, page_id)?;
            }

            // Wrap the page content so its graphics state cannot leak into the overlay
            let mut content = b"q\n".to_vec();
            content.extend(self.doc.get_page_content(page_id)?);
            content.extend_from_slice(b"\nQ\n");
            content.extend(
                Content {
                    operations: overlay.operations,
                }
                .encode()?,
            );
            set_page_content(&mut self.doc, page_id, content)?;
            debug!(page = number, "Flushed overlay");
        }
        Ok(())
    }
}

/// Mutable handle on one page
pub struct PdfPage<'a> {
    doc: &'a mut Document,
    overlay: &'a mut PageOverlay,
    number: u32,
    id: ObjectId,
    pending: Vec<Rect>,
}

impl PdfPage<'_> {
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Blocks of lines of runs, in content-stream order
    pub fn text_structure(&self) -> Result<Vec<TextBlock>> {
        let operations = page_operations(self.doc, self.id)?;
        let fonts = page_fonts(self.doc, self.id);
        Ok(text::group_runs(&text::layout_operations(&operations, &fonts)))
    }

    /// Width and height of the page's `MediaBox`
    pub fn size(&self) -> (f64, f64) {
        inherited(self.doc, self.id, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| {
                let values: Vec<f64> = arr.iter().filter_map(number).collect();
                match values.as_slice() {
                    [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
                    _ => None,
                }
            })
            .unwrap_or((612.0, 792.0)) // US Letter
    }

    fn push_overlay(&mut self, operations: Vec<Operation>) {
        self.overlay.operations.push(Operation::new("q", vec![]));
        self.overlay.operations.extend(operations);
        self.overlay.operations.push(Operation::new("Q", vec![]));
    }
}

fn rect_operands(rect: &Rect) -> Vec<Object> {
    vec![
        real(rect.x0),
        real(rect.y0),
        real(rect.width()),
        real(rect.height()),
    ]
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![
        Object::Real(color.r),
        Object::Real(color.g),
        Object::Real(color.b),
    ]
}

/// WinAnsi bytes for overlay text; characters outside Latin-1 become `?`
fn encode_overlay_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}

impl RedactionSurface for PdfPage<'_> {
    fn remove_content(&mut self, rect: Rect) -> Result<()> {
        self.pending.push(rect);
        Ok(())
    }

    fn fill(&mut self, rect: Rect, color: Color) -> Result<()> {
        self.push_overlay(vec![
            Operation::new("rg", color_operands(color)),
            Operation::new("re", rect_operands(&rect)),
            Operation::new("f", vec![]),
        ]);
        Ok(())
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) -> Result<()> {
        self.push_overlay(vec![
            Operation::new("RG", color_operands(color)),
            Operation::new("w", vec![real(width)]),
            Operation::new("re", rect_operands(&rect)),
            Operation::new("S", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(&mut self, origin: Point, text: &str, font_size: f64) -> Result<()> {
        self.overlay.uses_font = true;
        self.push_overlay(vec![
            Operation::new("rg", color_operands(Color::BLACK)),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(OVERLAY_FONT.as_bytes().to_vec()), real(font_size)],
            ),
            Operation::new("Td", vec![real(origin.x), real(origin.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(
                    encode_overlay_text(text),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn commit_removals(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let rects = std::mem::take(&mut self.pending);

        let operations = page_operations(self.doc, self.id)?;
        let fonts = page_fonts(self.doc, self.id);
        let shown = text::layout_operations(&operations, &fonts);
        let rewrite = rewrite::remove_glyphs(&operations, &shown, &rects);

        debug!(
            page = self.number,
            rects = rects.len(),
            glyphs = rewrite.removed_glyphs,
            "Committed removals"
        );
        if rewrite.removed_glyphs == 0 {
            return Ok(());
        }

        let content = Content {
            operations: rewrite.operations,
        }
        .encode()?;
        set_page_content(self.doc, self.id, content)
    }
}

fn page_operations(doc: &Document, page_id: ObjectId) -> Result<Vec<Operation>> {
    let content = doc.get_page_content(page_id)?;
    let content = Content::decode(&content)
        .map_err(|e| RedactError::Pdf(format!("Invalid content stream: {}", e)))?;
    Ok(content.operations)
}

/// Replace the page's `/Contents` with a single new stream
fn set_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Reference(stream_id));
    Ok(())
}

/// Look up a page attribute, walking up the `Parent` chain for inherited keys
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> FontSet {
    let Some(fonts) = inherited(doc, page_id, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .and_then(|resources| resources.get(b"Font").ok())
        .and_then(|o| resolve(doc, o).as_dict().ok())
    else {
        return FontSet::new();
    };

    fonts
        .iter()
        .filter_map(|(name, obj)| {
            let dict = resolve(doc, obj).as_dict().ok()?;
            Some((name.clone(), FontMetrics::from_dict(doc, dict)))
        })
        .collect()
}

/// Register the overlay font in the page's own resource dictionary
fn install_overlay_font(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|o| resolve(doc, o).as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    fonts.set(OVERLAY_FONT, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Write through a temp file in the destination directory, then rename
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let save_error = |source: std::io::Error| RedactError::Save {
        path: path.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(parent).map_err(save_error)?;
    file.write_all(bytes).map_err(save_error)?;
    file.as_file().sync_all().map_err(save_error)?;
    file.persist(path).map_err(|e| save_error(e.error))?;
    Ok(())
}
