//! Text extraction from raw document bytes

use crate::error::ExtractionFailure;
use crate::input::file_detector::DocumentFormat;
use docx_rs::{DocumentChild, ParagraphChild, Run, RunChild};
use log::debug;

/// Document bytes plus the declared format. Lives only for one parse call.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub content: Vec<u8>,
    pub format: DocumentFormat,
}

impl RawDocument {
    pub fn new(content: Vec<u8>, format: DocumentFormat) -> Self {
        Self { content, format }
    }
}

pub trait FormatExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionFailure>;
}

pub struct PdfExtractor;

impl FormatExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionFailure> {
        // pdf-extract walks pages in order and yields nothing for pages without
        // a text layer. It is also known to panic on some malformed files.
        let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionFailure::Pdf(e.to_string())),
            Err(_) => Err(ExtractionFailure::Pdf("parser aborted on malformed input".to_string())),
        }
    }
}

pub struct DocxExtractor;

impl FormatExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionFailure> {
        let docx = docx_rs::read_docx(bytes)
            .map_err(|e| ExtractionFailure::Docx(format!("{:?}", e)))?;

        let mut text = String::new();
        for child in &docx.document.children {
            if let DocumentChild::Paragraph(para) = child {
                text.push_str(&paragraph_text(para));
                text.push('\n');
            }
        }

        Ok(text)
    }
}

/// Runs in a paragraph are fragments of the same line and join with no
/// separator. Hyperlinks contribute their display text; soft breaks become
/// line breaks.
fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    push_children(&para.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, out),
            ParagraphChild::Hyperlink(link) => push_children(&link.children, out),
            _ => {}
        }
    }
}

fn push_run(run: &Run, out: &mut String) {
    for rc in &run.children {
        match rc {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) | RunChild::CarriageReturn(_) => out.push('\n'),
            _ => {}
        }
    }
}

pub struct PlainTextExtractor;

impl FormatExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionFailure> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Route a document to the extractor for its format.
///
/// Empty (or whitespace-only) output is reported as a failure, so a returned
/// string always carries some text.
pub fn extract_text(document: &RawDocument) -> Result<String, ExtractionFailure> {
    let text = match document.format {
        DocumentFormat::Pdf => PdfExtractor.extract(&document.content)?,
        // Legacy binary .doc is not readable as OOXML and fails here.
        DocumentFormat::Docx | DocumentFormat::Doc => DocxExtractor.extract(&document.content)?,
        DocumentFormat::Txt => PlainTextExtractor.extract(&document.content)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionFailure::EmptyText);
    }

    debug!("Extracted {} characters from {} document", text.len(), document.format);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_roundtrips_utf8() {
        let doc = RawDocument::new("Jane Doe\nRésumé".as_bytes().to_vec(), DocumentFormat::Txt);
        let text = extract_text(&doc).unwrap();
        assert_eq!(text, "Jane Doe\nRésumé");
    }

    #[test]
    fn test_invalid_utf8_is_decode_failure() {
        let doc = RawDocument::new(vec![0x4a, 0x61, 0xff, 0xfe], DocumentFormat::Txt);
        let err = extract_text(&doc).unwrap_err();
        assert!(matches!(err, ExtractionFailure::Decode(_)));
    }

    #[test]
    fn test_empty_text_is_failure() {
        for content in [&b""[..], &b"   \n\t "[..]] {
            let doc = RawDocument::new(content.to_vec(), DocumentFormat::Txt);
            assert!(matches!(extract_text(&doc), Err(ExtractionFailure::EmptyText)));
        }
    }

    #[test]
    fn test_corrupt_pdf_is_reported_not_raised() {
        let doc = RawDocument::new(b"%PDF-1.4 this is not a pdf".to_vec(), DocumentFormat::Pdf);
        assert!(matches!(extract_text(&doc), Err(ExtractionFailure::Pdf(_))));
    }

    #[test]
    fn test_corrupt_docx_is_reported_not_raised() {
        for format in [DocumentFormat::Docx, DocumentFormat::Doc] {
            let doc = RawDocument::new(b"PK not really a zip".to_vec(), format);
            assert!(matches!(extract_text(&doc), Err(ExtractionFailure::Docx(_))));
        }
    }

    #[test]
    fn test_docx_paragraphs_end_with_newline() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Jane Doe")))
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Senior Engineer | "))
                    .add_run(Run::new().add_text("Acme Corp | 2019-2022")),
            )
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = DocxExtractor.extract(buf.get_ref()).unwrap();
        assert_eq!(text, "Jane Doe\nSenior Engineer | Acme Corp | 2019-2022\n");
    }

    #[test]
    fn test_docx_keeps_hyperlink_text_and_breaks() {
        use docx_rs::{BreakType, Docx, Hyperlink, HyperlinkType, Paragraph, Run};

        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Jane Doe")))
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Email: "))
                    .add_hyperlink(
                        Hyperlink::new("mailto:jane@example.com", HyperlinkType::External)
                            .add_run(Run::new().add_text("jane@example.com")),
                    ),
            )
            .add_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text("Engineer | Acme | 2020")
                        .add_break(BreakType::TextWrapping)
                        .add_text("• Shipped v2"),
                ),
            )
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = DocxExtractor.extract(buf.get_ref()).unwrap();
        assert_eq!(
            text,
            "Jane Doe\nEmail: jane@example.com\nEngineer | Acme | 2020\n• Shipped v2\n"
        );
    }
}
