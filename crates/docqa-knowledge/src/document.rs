//! Document loading: turns a file into an ordered list of styled paragraphs.
//!
//! Supported formats, chosen by extension:
//! - `.docx`: `word/document.xml` paragraphs, styles resolved via `word/styles.xml`
//! - `.md` / `.markdown`: CommonMark headings and blocks
//! - anything else: plain text, one paragraph per non-empty line, `H<n>: ` marks a heading

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use docqa_core::error::{DocQaError, Result};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use zip::ZipArchive;

/// Paragraph style, reduced to what the chunker cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Heading(u8),
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub text: String,
}

impl Paragraph {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self { style: ParagraphStyle::Heading(level), text: text.into() }
    }

    pub fn body(text: impl Into<String>) -> Self {
        Self { style: ParagraphStyle::Body, text: text.into() }
    }
}

/// Load a document from disk, picking the parser by file extension.
pub fn load_document(path: &Path) -> Result<Vec<Paragraph>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let paragraphs = match ext.as_str() {
        "docx" => load_docx(path)?,
        "md" | "markdown" => parse_markdown(&std::fs::read_to_string(path)?),
        _ => parse_plain_text(&std::fs::read_to_string(path)?),
    };

    tracing::debug!("Loaded {} paragraphs from {}", paragraphs.len(), path.display());
    Ok(paragraphs)
}

// ─── DOCX ────────────────────────────────────────────────────────────────────

fn load_docx(path: &Path) -> Result<Vec<Paragraph>> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| DocQaError::Document(format!("{} is not a docx archive: {e}", path.display())))?;

    let document_xml = read_zip_entry(&mut archive, "word/document.xml")?
        .ok_or_else(|| DocQaError::Document("docx has no word/document.xml".into()))?;
    let style_names = match read_zip_entry(&mut archive, "word/styles.xml")? {
        Some(xml) => parse_style_names(&xml)?,
        None => HashMap::new(),
    };

    parse_docx_xml(&document_xml, &style_names)
}

fn read_zip_entry(archive: &mut ZipArchive<std::fs::File>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(DocQaError::Document(format!("Failed to read {name}: {e}"))),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn attr_value(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Map style ids (`Heading1`) to display names (`heading 1`) from `word/styles.xml`.
pub fn parse_style_names(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut names = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(ref e)) if e.name().as_ref() == b"w:style" => {
                current_id = attr_value(e, b"styleId");
            }
            Ok(XmlEvent::Start(ref e)) | Ok(XmlEvent::Empty(ref e))
                if e.name().as_ref() == b"w:name" =>
            {
                if let (Some(id), Some(name)) = (current_id.as_ref(), attr_value(e, b"val")) {
                    names.insert(id.clone(), name);
                }
            }
            Ok(XmlEvent::End(ref e)) if e.name().as_ref() == b"w:style" => {
                current_id = None;
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => return Err(DocQaError::Document(format!("Invalid styles.xml: {e}"))),
            _ => {}
        }
    }

    Ok(names)
}

/// Heading level from a Word style name: "Heading 1", "heading 2", "Heading1" → Some(level).
pub fn heading_level(style_name: &str) -> Option<u8> {
    let compact: String = style_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let digits = compact.strip_prefix("heading")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parse `word/document.xml` into paragraphs.
///
/// Only body-level paragraphs are returned: tables are skipped. Paragraphs
/// nested inside another paragraph (text boxes) are folded into the
/// enclosing one.
pub fn parse_docx_xml(xml: &str, style_names: &HashMap<String, String>) -> Result<Vec<Paragraph>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();

    let mut depth = 0usize;
    let mut tables = 0usize;
    let mut in_text = false;
    let mut text = String::new();
    let mut style_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Eof) => break,
            Err(e) => return Err(DocQaError::Document(format!("Invalid document.xml: {e}"))),
            Ok(XmlEvent::Start(ref e)) if depth == 0 && e.name().as_ref() == b"w:tbl" => {
                tables += 1;
            }
            Ok(XmlEvent::End(ref e)) if depth == 0 && e.name().as_ref() == b"w:tbl" => {
                tables = tables.saturating_sub(1);
            }
            _ if tables > 0 => {}
            Ok(XmlEvent::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => {
                    if depth == 0 {
                        text.clear();
                        style_id = None;
                    }
                    depth += 1;
                }
                b"w:t" if depth > 0 => in_text = true,
                _ => {}
            },
            Ok(XmlEvent::Empty(ref e)) => match e.name().as_ref() {
                b"w:pStyle" if depth == 1 => style_id = attr_value(e, b"val"),
                b"w:tab" if depth > 0 => text.push('\t'),
                b"w:br" | b"w:cr" if depth > 0 => text.push('\n'),
                b"w:p" if depth == 0 => paragraphs.push(Paragraph::body("")),
                _ => {}
            },
            Ok(XmlEvent::Text(e)) if in_text => {
                let chunk = e
                    .unescape()
                    .map_err(|e| DocQaError::Document(format!("Invalid text run: {e}")))?;
                text.push_str(&chunk);
            }
            Ok(XmlEvent::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        let style = style_id
                            .as_deref()
                            .map(|id| style_names.get(id).map(String::as_str).unwrap_or(id))
                            .and_then(heading_level)
                            .map(ParagraphStyle::Heading)
                            .unwrap_or(ParagraphStyle::Body);
                        paragraphs.push(Paragraph { style, text: std::mem::take(&mut text) });
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(paragraphs)
}

// ─── Markdown ────────────────────────────────────────────────────────────────

fn heading_level_to_int(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn flush_body(paragraphs: &mut Vec<Paragraph>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        paragraphs.push(Paragraph::body(text));
    }
    current.clear();
}

/// Parse Markdown into paragraphs: ATX/setext headings keep their level,
/// paragraphs, list items and code blocks become body paragraphs.
pub fn parse_markdown(markdown: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut heading: Option<u8> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_body(&mut paragraphs, &mut current);
                heading = Some(heading_level_to_int(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = heading.take() {
                    paragraphs.push(Paragraph::heading(level, current.trim()));
                }
                current.clear();
            }
            Event::Start(Tag::Item) | Event::End(TagEnd::Item) => {
                flush_body(&mut paragraphs, &mut current);
            }
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::CodeBlock) => {
                flush_body(&mut paragraphs, &mut current);
            }
            Event::Text(t) | Event::Code(t) => current.push_str(&t),
            Event::SoftBreak => current.push(' '),
            Event::HardBreak => current.push('\n'),
            _ => {}
        }
    }
    flush_body(&mut paragraphs, &mut current);

    paragraphs
}

// ─── Plain text ──────────────────────────────────────────────────────────────

/// Parse plain text: each non-empty line is a paragraph; `H1: Title` / `H2: Title`
/// lines are headings of that level.
pub fn parse_plain_text(text: &str) -> Vec<Paragraph> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match plain_heading(line) {
            Some((level, title)) => Paragraph::heading(level, title),
            None => Paragraph::body(line),
        })
        .collect()
}

fn plain_heading(line: &str) -> Option<(u8, &str)> {
    let (marker, title) = line.split_once(':')?;
    let digits = marker.strip_prefix('H')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, title.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Company</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t xml:space="preserve">Mission </w:t></w:r><w:r><w:t>&amp; Vision</w:t></w:r></w:p>
    <w:p><w:r><w:t>We build engines.</w:t></w:r><w:r><w:tab/><w:t>Fast.</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:pPr><w:pStyle w:val="Titre3"/></w:pPr><w:r><w:t>Aside</w:t></w:r></w:p>
    <w:sectPr/>
  </w:body>
</w:document>"#;

    const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
  <w:style w:type="paragraph" w:styleId="Titre3"><w:name w:val="heading 3"/></w:style>
</w:styles>"#;

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("Heading 1"), Some(1));
        assert_eq!(heading_level("heading 2"), Some(2));
        assert_eq!(heading_level("Heading2"), Some(2));
        assert_eq!(heading_level("Normal"), None);
        assert_eq!(heading_level("Heading"), None);
        assert_eq!(heading_level("Heading 1 Char"), None);
    }

    #[test]
    fn test_parse_style_names() {
        let names = parse_style_names(STYLES_XML).unwrap();
        assert_eq!(names.get("Titre3").map(String::as_str), Some("heading 3"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_parse_docx_xml() {
        let names = parse_style_names(STYLES_XML).unwrap();
        let paragraphs = parse_docx_xml(DOCUMENT_XML, &names).unwrap();
        assert_eq!(
            paragraphs,
            vec![
                Paragraph::heading(1, "Company"),
                Paragraph::heading(2, "Mission & Vision"),
                Paragraph::body("We build engines.\tFast."),
                Paragraph::body(""),
                Paragraph::heading(3, "Aside"),
            ]
        );
    }

    #[test]
    fn test_parse_docx_skips_tables() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Pricing</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>nested cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>After the table.</w:t></w:r></w:p>
</w:body></w:document>"#;
        let paragraphs = parse_docx_xml(xml, &HashMap::new()).unwrap();
        assert_eq!(
            paragraphs,
            vec![
                Paragraph::heading(2, "Pricing"),
                Paragraph::body("After the table."),
            ]
        );
    }

    #[test]
    fn test_parse_docx_without_styles_uses_style_id() {
        let paragraphs = parse_docx_xml(DOCUMENT_XML, &HashMap::new()).unwrap();
        assert_eq!(paragraphs[0].style, ParagraphStyle::Heading(1));
        // "Titre3" is not recognisable without styles.xml
        assert_eq!(paragraphs[4].style, ParagraphStyle::Body);
    }

    #[test]
    fn test_parse_markdown() {
        let md = "# Intro\n\n## Overview\n\nBody A\ncontinued.\n\n- item one\n- item two\n\n### Deep\n\nText";
        let paragraphs = parse_markdown(md);
        assert_eq!(
            paragraphs,
            vec![
                Paragraph::heading(1, "Intro"),
                Paragraph::heading(2, "Overview"),
                Paragraph::body("Body A continued."),
                Paragraph::body("item one"),
                Paragraph::body("item two"),
                Paragraph::heading(3, "Deep"),
                Paragraph::body("Text"),
            ]
        );
    }

    #[test]
    fn test_parse_plain_text() {
        let text = "H1: Intro\nH2: Overview\nBody A\n\n  Body A2  \nHello: world\n";
        let paragraphs = parse_plain_text(text);
        assert_eq!(
            paragraphs,
            vec![
                Paragraph::heading(1, "Intro"),
                Paragraph::heading(2, "Overview"),
                Paragraph::body("Body A"),
                Paragraph::body("Body A2"),
                Paragraph::body("Hello: world"),
            ]
        );
    }

    #[test]
    fn test_load_document_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.md");
        std::fs::write(&path, "# A\n## B\ntext\n").unwrap();
        let paragraphs = load_document(&path).unwrap();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[2], Paragraph::body("text"));
    }
}
