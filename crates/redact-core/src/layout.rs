//! Structured page text: blocks of lines of runs

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// A contiguous stretch of text in one font, size and baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub bbox: Rect,
}

impl TextRun {
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }

    /// Length in characters, the unit detector offsets are expressed in
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Runs in encounter order (line by line)
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.lines.iter().flat_map(|line| line.runs.iter())
    }
}

/// All runs of a page in block → line → run order
pub fn page_runs(blocks: &[TextBlock]) -> impl Iterator<Item = &TextRun> {
    blocks.iter().flat_map(TextBlock::runs)
}

/// Concatenated page text, one line per `TextLine`
pub fn page_text(blocks: &[TextBlock]) -> String {
    let mut text = String::new();
    for line in blocks.iter().flat_map(|b| b.lines.iter()) {
        for run in &line.runs {
            text.push_str(&run.text);
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_len_counts_codepoints() {
        let run = TextRun::new("Zürich", Rect::new(0.0, 0.0, 60.0, 10.0));
        assert_eq!(run.char_len(), 6);
        assert_eq!(run.text.len(), 7);
    }

    #[test]
    fn test_page_runs_order() {
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let blocks = vec![
            TextBlock {
                lines: vec![
                    TextLine {
                        runs: vec![TextRun::new("a", rect), TextRun::new("b", rect)],
                    },
                    TextLine {
                        runs: vec![TextRun::new("c", rect)],
                    },
                ],
            },
            TextBlock {
                lines: vec![TextLine {
                    runs: vec![TextRun::new("d", rect)],
                }],
            },
        ];
        let order: String = page_runs(&blocks).map(|r| r.text.as_str()).collect();
        assert_eq!(order, "abcd");
        assert_eq!(page_text(&blocks), "ab\nc\nd\n");
    }
}
