use super::*;
use std::io::Write;
use std::path::PathBuf;
use zip::write::FileOptions;

#[test]
fn type_from_extension() {
    assert_eq!(
        document_type_from_path(&PathBuf::from("report.pdf")).expect("pdf"),
        DocumentType::Pdf
    );
    assert_eq!(
        document_type_from_path(&PathBuf::from("notes.TXT")).expect("txt"),
        DocumentType::Txt
    );
    assert_eq!(
        document_type_from_path(&PathBuf::from("readme.markdown")).expect("markdown"),
        DocumentType::Md
    );
    assert_eq!(
        document_type_from_path(&PathBuf::from("paper.docx")).expect("docx"),
        DocumentType::Docx
    );
}

#[test]
fn unsupported_extension_rejected() {
    let err = document_type_from_path(&PathBuf::from("virus.exe")).expect_err("should reject");
    assert!(matches!(err, DocChatError::Extraction(_)));

    assert!(document_type_from_path(&PathBuf::from("noextension")).is_err());
}

#[test]
fn plain_text_extraction() {
    let text = extract_text(b"Hello, world.\n", DocumentType::Txt).expect("txt extraction");
    assert_eq!(text, "Hello, world.\n");
}

#[test]
fn invalid_utf8_rejected() {
    let err = extract_text(&[0xFF, 0xFE, 0x00], DocumentType::Txt).expect_err("should reject");
    assert!(matches!(err, DocChatError::Extraction(_)));
}

#[test]
fn oversized_file_rejected() {
    let bytes = vec![b'a'; MAX_DOCUMENT_BYTES + 1];
    let err = extract_text(&bytes, DocumentType::Txt).expect_err("should reject");
    assert!(matches!(err, DocChatError::Extraction(_)));
}

#[test]
fn markdown_flattening() {
    let markdown = "# Title\n\nFirst paragraph with `code`.\n\n- one\n- two\n";
    let text = extract_text(markdown.as_bytes(), DocumentType::Md).expect("md extraction");

    assert!(text.contains("Title"));
    assert!(text.contains("First paragraph with code."));
    assert!(text.contains("- one"));
    assert!(!text.contains('#'), "heading markers should be stripped");
    assert!(!text.contains('`'), "code fences should be stripped");
    // Paragraph breaks survive for the chunker's boundary snapping
    assert!(text.contains("\n\n"));
}

#[test]
fn corrupt_pdf_rejected() {
    let err = extract_text(b"definitely not a pdf", DocumentType::Pdf).expect_err("should reject");
    assert!(matches!(err, DocChatError::Extraction(_)));
}

fn build_test_docx(body_xml: &str) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file("word/document.xml", FileOptions::default())
            .expect("start docx entry");
        writer
            .write_all(body_xml.as_bytes())
            .expect("write docx body");
        writer.finish().expect("finish docx archive");
    }
    buffer.into_inner()
}

#[test]
fn docx_extraction() {
    let xml = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p><w:p><w:r><w:t>Second &amp; final.</w:t></w:r></w:p></w:body></w:document>"#;
    let bytes = build_test_docx(xml);

    let text = extract_text(&bytes, DocumentType::Docx).expect("docx extraction");

    assert!(text.contains("First paragraph."));
    assert!(text.contains("Second & final."));
    assert!(
        text.contains("First paragraph.\n\nSecond"),
        "paragraph tags should become paragraph breaks, got: {text:?}"
    );
}

#[test]
fn docx_without_body_rejected() {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file("unrelated.txt", FileOptions::default())
            .expect("start entry");
        writer.write_all(b"nothing here").expect("write entry");
        writer.finish().expect("finish archive");
    }

    let err =
        extract_text(&buffer.into_inner(), DocumentType::Docx).expect_err("should reject");
    assert!(matches!(err, DocChatError::Extraction(_)));
}

#[test]
fn garbage_docx_rejected() {
    let err = extract_text(b"not a zip archive", DocumentType::Docx).expect_err("should reject");
    assert!(matches!(err, DocChatError::Extraction(_)));
}
