//! In-memory PDF fixtures shared by the integration tests
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, StringFormat};
use redact_core::layout::page_text;
use redact_core::PdfDocument;

/// Text placed with its baseline origin at (x, y), one `Tj` per chunk
pub struct Line<'a> {
    pub x: i64,
    pub y: i64,
    pub chunks: Vec<&'a str>,
}

pub fn line(x: i64, y: i64, text: &str) -> Line<'_> {
    Line {
        x,
        y,
        chunks: vec![text],
    }
}

/// A line whose text is shown by several consecutive `Tj` operators
pub fn split_line<'a>(x: i64, y: i64, chunks: &[&'a str]) -> Line<'a> {
    Line {
        x,
        y,
        chunks: chunks.to_vec(),
    }
}

/// Build a PDF with one page per entry, every line in Courier 10pt
/// (every glyph exactly 6 units wide)
pub fn build_pdf(pages: &[Vec<Line<'_>>]) -> Vec<u8> {
    build_pdf_in_font("Courier", pages)
}

/// Like [`build_pdf`] with another standard-14 `base_font` and no `Widths`
pub fn build_pdf_in_font(base_font: &str, pages: &[Vec<Line<'_>>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));

    let mut page_ids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for l in lines {
            operations.extend(vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
                Operation::new("Td", vec![Object::Integer(l.x), Object::Integer(l.y)]),
            ]);
            for chunk in &l.chunks {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        chunk.as_bytes().to_vec(),
                        StringFormat::Literal,
                    )],
                ));
            }
            operations.push(Operation::new("ET", vec![]));
        }
        let content_id = doc.add_object(lopdf::Stream::new(
            Dictionary::new(),
            Content { operations }.encode().unwrap(),
        ));

        let resources = Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "F1",
                Object::Reference(font_id),
            )])),
        )]);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

/// Extracted text of every page, in page order
pub fn extract_pages(bytes: &[u8]) -> Vec<String> {
    let mut document = PdfDocument::from_bytes(bytes).unwrap();
    document
        .page_numbers()
        .into_iter()
        .map(|n| page_text(&document.page(n).unwrap().text_structure().unwrap()))
        .collect()
}

/// Decoded content-stream operators of page `number`
pub fn page_operations(bytes: &[u8], number: u32) -> Vec<Operation> {
    let doc = Document::load_mem(bytes).unwrap();
    let page_id = doc.get_pages()[&number];
    let content = doc.get_page_content(page_id).unwrap();
    Content::decode(&content).unwrap().operations
}

pub fn operand_numbers(op: &Operation) -> Vec<f64> {
    op.operands
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        })
        .collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {}, got {}",
        expected,
        actual
    );
}
