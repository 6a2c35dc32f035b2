//! Heading-aware chunker.
//!
//! Walks paragraphs in document order and emits one chunk per sub-heading
//! section, addressed by its `[top heading, sub heading]` path:
//!
//! ```text
//! Heading 1 "Intro"      → top = Intro, sub cleared        (NoSection)
//! Heading 2 "Overview"   → flush, sub = Overview            (InSection)
//! Body "Body A"          → body += "Body A"
//! Heading 2 "Details"    → flush [Intro, Overview], sub = Details
//! Body "Body B"          → body += "Body B"
//! <end>                  → flush [Intro, Details]
//! ```
//!
//! Body paragraphs before the first sub-heading are dropped, and a section
//! with no body text produces no chunk. Blank paragraphs are skipped.

use crate::document::{Paragraph, ParagraphStyle};

/// Separator between heading path entries in display headings and embedding input.
pub const HEADING_SEPARATOR: &str = " | ";

/// A body span addressed by its enclosing headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// `[top, sub]`, or just `[sub]` when no top-level heading preceded it.
    pub heading_path: Vec<String>,
    pub content: String,
}

impl Chunk {
    /// Display heading, e.g. `"Intro | Overview"`.
    pub fn heading(&self) -> String {
        self.heading_path.join(HEADING_SEPARATOR)
    }

    /// Text handed to the embedder: heading path followed by the body.
    pub fn embedding_text(&self) -> String {
        format!("{}{}{}", self.heading(), HEADING_SEPARATOR, self.content)
    }
}

/// Heading state machine. Feed paragraphs in order, then call [`Chunker::finish`].
#[derive(Debug, Default)]
pub struct Chunker {
    top_heading: Option<String>,
    sub_heading: Option<String>,
    body: Vec<String>,
    chunks: Vec<Chunk>,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk a whole document.
    pub fn chunk(paragraphs: &[Paragraph]) -> Vec<Chunk> {
        let mut chunker = Self::new();
        for paragraph in paragraphs {
            chunker.push(paragraph);
        }
        chunker.finish()
    }

    pub fn push(&mut self, paragraph: &Paragraph) {
        let text = paragraph.text.trim();
        // A blank heading line closes the current section without opening one.
        let heading = (!text.is_empty()).then(|| text.to_string());
        match paragraph.style {
            ParagraphStyle::Heading(1) => {
                self.flush();
                self.top_heading = heading;
                self.sub_heading = None;
            }
            ParagraphStyle::Heading(2) => {
                self.flush();
                self.sub_heading = heading;
            }
            // Deeper headings read as body text inside the current section.
            ParagraphStyle::Heading(_) | ParagraphStyle::Body => {
                if self.sub_heading.is_some() && !text.is_empty() {
                    self.body.push(text.to_string());
                }
            }
        }
    }

    pub fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.chunks
    }

    fn flush(&mut self) {
        let Some(sub) = self.sub_heading.as_ref() else {
            return;
        };
        if self.body.is_empty() {
            return;
        }

        let heading_path = self
            .top_heading
            .iter()
            .chain(std::iter::once(sub))
            .cloned()
            .collect();
        self.chunks.push(Chunk {
            heading_path,
            content: self.body.join("\n"),
        });
        self.body.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Vec<Paragraph> {
        vec![
            Paragraph::heading(1, "Intro"),
            Paragraph::heading(2, "Overview"),
            Paragraph::body("Body A"),
            Paragraph::body("Body A2"),
            Paragraph::heading(2, "Details"),
            Paragraph::body("Body B"),
        ]
    }

    #[test]
    fn test_two_sections() {
        let chunks = Chunker::chunk(&scenario());
        assert_eq!(
            chunks,
            vec![
                Chunk {
                    heading_path: vec!["Intro".into(), "Overview".into()],
                    content: "Body A\nBody A2".into(),
                },
                Chunk {
                    heading_path: vec!["Intro".into(), "Details".into()],
                    content: "Body B".into(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_section_emits_nothing() {
        let chunks = Chunker::chunk(&[
            Paragraph::heading(1, "Intro"),
            Paragraph::heading(2, "Empty"),
            Paragraph::heading(2, "Full"),
            Paragraph::body("text"),
        ]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading(), "Intro | Full");
    }

    #[test]
    fn test_body_before_sub_heading_is_dropped() {
        let chunks = Chunker::chunk(&[
            Paragraph::body("preamble"),
            Paragraph::heading(1, "Intro"),
            Paragraph::body("lead paragraph"),
            Paragraph::heading(2, "Overview"),
            Paragraph::body("kept"),
        ]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "kept");
    }

    #[test]
    fn test_new_top_heading_closes_section() {
        let chunks = Chunker::chunk(&[
            Paragraph::heading(1, "One"),
            Paragraph::heading(2, "A"),
            Paragraph::body("a"),
            Paragraph::heading(1, "Two"),
            Paragraph::body("orphan"),
            Paragraph::heading(2, "B"),
            Paragraph::body("b"),
        ]);
        let headings: Vec<_> = chunks.iter().map(Chunk::heading).collect();
        assert_eq!(headings, vec!["One | A", "Two | B"]);
        assert_eq!(chunks[1].content, "b");
    }

    #[test]
    fn test_sub_heading_without_top() {
        let chunks = Chunker::chunk(&[Paragraph::heading(2, "Loose"), Paragraph::body("x")]);
        assert_eq!(chunks[0].heading_path, vec!["Loose".to_string()]);
    }

    #[test]
    fn test_blank_sub_heading_closes_section() {
        let chunks = Chunker::chunk(&[
            Paragraph::heading(1, "Intro"),
            Paragraph::heading(2, "Overview"),
            Paragraph::body("a"),
            Paragraph::heading(2, "   "),
            Paragraph::body("stray"),
        ]);
        assert_eq!(
            chunks,
            vec![Chunk {
                heading_path: vec!["Intro".into(), "Overview".into()],
                content: "a".into(),
            }]
        );
    }

    #[test]
    fn test_blank_top_heading_is_left_out_of_path() {
        let chunks = Chunker::chunk(&[
            Paragraph::heading(1, ""),
            Paragraph::heading(2, "Overview"),
            Paragraph::body("a"),
        ]);
        assert_eq!(chunks[0].heading_path, vec!["Overview".to_string()]);
    }

    #[test]
    fn test_deeper_heading_and_blank_lines() {
        let chunks = Chunker::chunk(&[
            Paragraph::heading(1, " Intro "),
            Paragraph::heading(2, "Overview"),
            Paragraph::body("  first  "),
            Paragraph::body("   "),
            Paragraph::heading(3, "Minor"),
            Paragraph::body("second"),
        ]);
        assert_eq!(chunks[0].heading(), "Intro | Overview");
        assert_eq!(chunks[0].content, "first\nMinor\nsecond");
    }

    #[test]
    fn test_embedding_text() {
        let chunks = Chunker::chunk(&scenario());
        assert_eq!(chunks[1].embedding_text(), "Intro | Details | Body B");
    }
}
