#[cfg(test)]
mod tests;

use std::io::Read;
use std::path::Path;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use tracing::debug;

use crate::store::models::DocumentType;
use crate::{DocChatError, Result};

/// Maximum accepted document size: 10 MB.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Determine the document type from a file path's extension.
///
/// Anything outside the supported set is rejected here, before any document
/// or chunk is persisted.
#[inline]
pub fn document_type_from_path(path: &Path) -> Result<DocumentType> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "pdf" => Ok(DocumentType::Pdf),
        "docx" => Ok(DocumentType::Docx),
        "txt" => Ok(DocumentType::Txt),
        "md" | "markdown" => Ok(DocumentType::Md),
        "" => Err(DocChatError::Extraction(format!(
            "File has no extension: {}",
            path.display()
        ))),
        other => Err(DocChatError::Extraction(format!(
            "Unsupported file type: .{other} (supported: pdf, docx, txt, md)"
        ))),
    }
}

/// Convert raw file bytes into plain text for chunking.
#[inline]
pub fn extract_text(bytes: &[u8], doc_type: DocumentType) -> Result<String> {
    if bytes.len() > MAX_DOCUMENT_BYTES {
        return Err(DocChatError::Extraction(format!(
            "File is {} bytes, exceeding the {} byte limit",
            bytes.len(),
            MAX_DOCUMENT_BYTES
        )));
    }

    let text = match doc_type {
        DocumentType::Txt => utf8_text(bytes)?,
        DocumentType::Md => markdown_to_text(&utf8_text(bytes)?),
        DocumentType::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DocChatError::Extraction(format!("PDF parse error: {e}")))?,
        DocumentType::Docx => docx_to_text(bytes)?,
    };

    debug!(
        "Extracted {} chars of text from {} byte {} file",
        text.len(),
        bytes.len(),
        doc_type
    );

    Ok(text)
}

fn utf8_text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| DocChatError::Extraction(format!("File is not valid UTF-8: {e}")))
}

/// Flatten Markdown to plain text, keeping paragraph breaks so the chunker's
/// boundary snapping still has something to work with.
fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => text.push_str("\n\n"),
            Event::Start(Tag::Item) => text.push_str("- "),
            _ => {}
        }
    }

    text.trim_end().to_string()
}

/// Pull the body text out of a DOCX archive. The document body lives in
/// `word/document.xml`; paragraph close tags become paragraph breaks and all
/// other markup is stripped.
fn docx_to_text(bytes: &[u8]) -> Result<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| DocChatError::Extraction(format!("Not a valid DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| DocChatError::Extraction(format!("DOCX has no document body: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| DocChatError::Extraction(format!("Failed to read DOCX body: {e}")))?;

    Ok(strip_document_xml(&xml))
}

fn strip_document_xml(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len() / 4);
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let tag_rest = &rest[open..];
        let Some(close) = tag_rest.find('>') else {
            break;
        };
        let tag = &tag_rest[..=close];
        if tag.starts_with("</w:p>") {
            text.push_str("\n\n");
        } else if tag.starts_with("<w:tab") {
            text.push('\t');
        } else if tag.starts_with("<w:br") {
            text.push('\n');
        }
        rest = &tag_rest[close + 1..];
    }
    text.push_str(rest);

    unescape_xml(text.trim_end())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
