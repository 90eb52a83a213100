//! Font metrics and glyph decoding for page fonts
//!
//! Only what layout needs: how many bytes a code takes, how wide each glyph
//! is, and which character it stands for.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use super::{number, resolve};

/// Glyph-space units per text-space unit
pub(crate) const GLYPH_UNITS: f64 = 1000.0;

/// Default advance when a font carries no metrics at all
const FALLBACK_WIDTH: f64 = 500.0;
const COURIER_WIDTH: f64 = 600.0;
const CID_DEFAULT_WIDTH: f64 = 1000.0;

/// Highest code a shown string can produce (two-byte fonts)
const MAX_CODE: u32 = 0xFFFF;
/// Entries a `W` array or a CMap may expand to, shared across all ranges
const MAX_TABLE_ENTRIES: usize = MAX_CODE as usize + 1;

/// Helvetica advance widths for codes 32..=126 (Adobe AFM, WinAnsi order)
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Standard-14 family used when a font has no `Widths`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StandardFamily {
    Helvetica,
    Courier,
    Other,
}

impl StandardFamily {
    /// Map a `BaseFont` name (possibly subset-prefixed, `ABCDEF+Courier-Bold`)
    /// to its metric family
    pub(crate) fn from_base_font(name: &str) -> Self {
        let name = name.split_once('+').map(|(_, rest)| rest).unwrap_or(name);
        if name.starts_with("Courier") || name.contains("Mono") {
            StandardFamily::Courier
        } else if name.starts_with("Helvetica") || name.starts_with("Arial") {
            StandardFamily::Helvetica
        } else {
            StandardFamily::Other
        }
    }

    fn width(&self, code: u32) -> f64 {
        match self {
            StandardFamily::Courier => COURIER_WIDTH,
            StandardFamily::Helvetica => helvetica_width(code),
            StandardFamily::Other => FALLBACK_WIDTH,
        }
    }
}

fn helvetica_width(code: u32) -> f64 {
    match code {
        32..=126 => HELVETICA_WIDTHS[(code - 32) as usize] as f64,
        _ => FALLBACK_WIDTH,
    }
}

/// One decoded glyph of a shown string
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedGlyph {
    pub bytes: Vec<u8>,
    pub code: u32,
    pub text: String,
    /// Advance in glyph units (1/1000 em)
    pub width: f64,
}

impl DecodedGlyph {
    /// Word spacing applies to single-byte code 32 only
    pub fn is_word_space(&self) -> bool {
        self.bytes.len() == 1 && self.code == 32
    }
}

/// Metrics for one font resource
#[derive(Debug, Clone)]
pub(crate) struct FontMetrics {
    first_char: u32,
    widths: Vec<f64>,
    missing_width: Option<f64>,
    cid_widths: HashMap<u32, f64>,
    family: StandardFamily,
    two_byte: bool,
    to_unicode: HashMap<u32, String>,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::standard(StandardFamily::Helvetica)
    }
}

impl FontMetrics {
    pub(crate) fn standard(family: StandardFamily) -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            missing_width: None,
            cid_widths: HashMap::new(),
            family,
            two_byte: false,
            to_unicode: HashMap::new(),
        }
    }

    pub(crate) fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let is_type0 = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        let mut metrics = Self::standard(StandardFamily::from_base_font(&base_font));
        metrics.to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .map(|o| read_to_unicode(doc, o))
            .unwrap_or_default();

        if is_type0 {
            metrics.two_byte = true;
            metrics.load_descendant_widths(doc, dict);
            return metrics;
        }

        metrics.first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);
        if let Ok(widths) = dict.get(b"Widths").and_then(|o| resolve(doc, o).as_array()) {
            metrics.widths = widths
                .iter()
                .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                .collect();
        }
        metrics.missing_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| number(resolve(doc, o)));

        metrics
    }

    /// `DW` and the `W` array of the first descendant CIDFont
    fn load_descendant_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let descendant = dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|a| a.first())
            .and_then(|o| resolve(doc, o).as_dict().ok());
        let Some(cid_font) = descendant else {
            self.missing_width = Some(CID_DEFAULT_WIDTH);
            return;
        };

        self.missing_width = Some(
            cid_font
                .get(b"DW")
                .ok()
                .and_then(|o| number(resolve(doc, o)))
                .unwrap_or(CID_DEFAULT_WIDTH),
        );

        let Ok(w) = cid_font.get(b"W").and_then(|o| resolve(doc, o).as_array()) else {
            return;
        };
        // Entries are either `c [w1 w2 ...]` or `c_first c_last w`
        let mut budget = MAX_TABLE_ENTRIES;
        let mut i = 0;
        while i < w.len() && budget > 0 {
            let Some(first) = number(resolve(doc, &w[i])) else {
                break;
            };
            let first = first as u32;
            match w.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    let cids = (first..=MAX_CODE).zip(list.iter()).take(budget);
                    for (cid, width) in cids {
                        budget -= 1;
                        if let Some(width) = number(resolve(doc, width)) {
                            self.cid_widths.insert(cid, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) = (
                        number(last),
                        w.get(i + 2).and_then(|o| number(resolve(doc, o))),
                    ) else {
                        break;
                    };
                    let last = (last as u32).min(MAX_CODE);
                    for cid in (first..=last).take(budget) {
                        budget -= 1;
                        self.cid_widths.insert(cid, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Advance width of `code` in glyph units
    pub(crate) fn width(&self, code: u32) -> f64 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .or(self.missing_width)
                .unwrap_or(CID_DEFAULT_WIDTH);
        }
        if code >= self.first_char {
            if let Some(w) = self.widths.get((code - self.first_char) as usize) {
                return *w;
            }
        }
        self.missing_width
            .filter(|_| !self.widths.is_empty())
            .unwrap_or_else(|| self.family.width(code))
    }

    fn char_for(&self, code: u32) -> String {
        if let Some(mapped) = self.to_unicode.get(&code) {
            return mapped.clone();
        }
        if self.two_byte {
            return char::from_u32(code)
                .filter(|c| !c.is_control())
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string();
        }
        // Latin-1 fallback, the WinAnsi printable range agrees with it
        char::from(code as u8).to_string()
    }

    /// Split a shown string into glyphs
    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        let step = if self.two_byte { 2 } else { 1 };
        bytes
            .chunks(step)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                DecodedGlyph {
                    bytes: chunk.to_vec(),
                    code,
                    text: self.char_for(code),
                    width: self.width(code),
                }
            })
            .collect()
    }
}

/// Parse the `bfchar`/`bfrange` sections of a ToUnicode CMap
fn read_to_unicode(doc: &Document, obj: &Object) -> HashMap<u32, String> {
    let Ok(stream) = resolve(doc, obj).as_stream() else {
        return HashMap::new();
    };
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    parse_cmap(&String::from_utf8_lossy(&data))
}

pub(crate) fn parse_cmap(cmap: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    let mut budget = MAX_TABLE_ENTRIES;
    let mut section: Option<&str> = None;
    let mut tokens: Vec<String> = Vec::new();

    for token in cmap_tokens(cmap) {
        match token.as_str() {
            "beginbfchar" => {
                section = Some("char");
                tokens.clear();
            }
            "beginbfrange" => {
                section = Some("range");
                tokens.clear();
            }
            "endbfchar" | "endbfrange" => {
                match section {
                    Some("char") => {
                        for pair in tokens.chunks(2) {
                            if let [src, dst] = pair {
                                if let (Some(code), Some(text)) = (hex_code(src), hex_text(dst)) {
                                    map.insert(code, text);
                                }
                            }
                        }
                    }
                    Some(_) => read_bfrange(&tokens, &mut map, &mut budget),
                    None => {}
                }
                section = None;
                tokens.clear();
            }
            _ if section.is_some() => tokens.push(token),
            _ => {}
        }
    }

    map
}

/// Codes above [`MAX_CODE`] are never shown and are not mapped. Stops once
/// `budget` entries have been written.
fn read_bfrange(tokens: &[String], map: &mut HashMap<u32, String>, budget: &mut usize) {
    let mut i = 0;
    while i + 2 < tokens.len() && *budget > 0 {
        let (Some(lo), Some(hi)) = (hex_code(&tokens[i]), hex_code(&tokens[i + 1])) else {
            return;
        };
        if tokens[i + 2] == "[" {
            let mut j = i + 3;
            let mut code = lo;
            while j < tokens.len() && tokens[j] != "]" {
                if code <= MAX_CODE && *budget > 0 {
                    if let Some(text) = hex_text(&tokens[j]) {
                        map.insert(code, text);
                        *budget -= 1;
                    }
                }
                code = code.saturating_add(1);
                j += 1;
            }
            i = j + 1;
        } else {
            let Some(base) = hex_text(&tokens[i + 2]) else {
                return;
            };
            let mut chars: Vec<char> = base.chars().collect();
            for code in (lo..=hi.min(MAX_CODE)).take(*budget) {
                *budget -= 1;
                map.insert(code, chars.iter().collect());
                if let Some(last) = chars.last_mut() {
                    *last = char::from_u32(*last as u32 + 1).unwrap_or(*last);
                }
            }
            i += 3;
        }
    }
}

/// Hex strings, array brackets and bare words
fn cmap_tokens(cmap: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = cmap.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut hex = String::from("<");
                for h in chars.by_ref() {
                    hex.push(h);
                    if h == '>' {
                        break;
                    }
                }
                tokens.push(hex);
            }
            '[' | ']' => tokens.push(c.to_string()),
            c if c.is_whitespace() => {}
            _ => {
                let mut word = c.to_string();
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || matches!(n, '<' | '[' | ']') {
                        break;
                    }
                    word.push(n);
                    chars.next();
                }
                tokens.push(word);
            }
        }
    }
    tokens
}

fn hex_bytes(token: &str) -> Option<Vec<u8>> {
    let hex: String = token
        .strip_prefix('<')?
        .strip_suffix('>')?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
        })
        .collect()
}

fn hex_code(token: &str) -> Option<u32> {
    let bytes = hex_bytes(token)?;
    (bytes.len() <= 4).then(|| bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
}

/// Destination strings are UTF-16BE
fn hex_text(token: &str) -> Option<String> {
    let bytes = hex_bytes(token)?;
    let units: Vec<u16> = bytes
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
