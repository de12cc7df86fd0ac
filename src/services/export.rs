use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use serde_json::{Map, Value};
use std::io::{Cursor, Write};
use std::str::FromStr;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ApiError, StorageError};
use crate::storage::ObjectStore;
use crate::utils::{sanitize_filename, truncate_chars};

const DEFAULT_TITLE: &str = "Pitch Deck";
const TITLE_FROM_RAW_CHARS: usize = 40;
const PDF_LINE_CHARS: usize = 120;
const PDF_LINES_PER_PAGE: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(ApiError::Validation(format!(
                "unsupported format {s:?}, expected pdf or docx"
            ))),
        }
    }
}

/// Title shown in the document and used for the object name (before sanitizing).
pub fn deck_title(deck: &Map<String, Value>) -> String {
    if let Some(Value::String(title)) = deck.get("title") {
        if !title.trim().is_empty() {
            return title.clone();
        }
    }
    match deck.get("raw") {
        Some(Value::String(raw)) => truncate_chars(raw, TITLE_FROM_RAW_CHARS).to_string(),
        _ => DEFAULT_TITLE.to_string(),
    }
}

/// The text rendered into the file: raw model output if present, else pretty JSON.
pub fn deck_body(deck: &Map<String, Value>) -> String {
    match deck.get("raw") {
        Some(Value::String(raw)) => raw.clone(),
        Some(other) => other.to_string(),
        None => serde_json::to_string_pretty(deck).unwrap_or_default(),
    }
}

/// Validates the format, renders the deck and stores it. Returns the public URL.
///
/// An unsupported format fails before anything is rendered or written.
pub async fn export_deck(
    store: &dyn ObjectStore,
    deck: &Map<String, Value>,
    format: &str,
) -> Result<String, ApiError> {
    let format: ExportFormat = format.parse()?;
    let title = deck_title(deck);
    let body = deck_body(deck);

    let data = match format {
        ExportFormat::Pdf => render_pdf(&title, &body)?,
        ExportFormat::Docx => render_docx(&title, &body)?,
    };

    let path = format!("exports/{}.{}", sanitize_filename(&title), format.extension());
    let url = store.put(&path, data, format.content_type()).await?;
    Ok(url)
}

/// Maps text to single-byte WinAnsi for the base-14 Helvetica font.
///
/// Latin-1 characters pass through; anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn page_content(lines: &[&str]) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(11)]),
        Operation::new("TL", vec![Object::Integer(18)]),
        Operation::new("Td", vec![Object::Integer(40), Object::Integer(800)]),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(truncate_chars(line, PDF_LINE_CHARS)))],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Text-only A4 PDF: Helvetica 11pt, one line per body line.
pub fn render_pdf(title: &str, body: &str) -> Result<Vec<u8>, StorageError> {
    let lines: Vec<&str> = body.lines().collect();
    let pages: Vec<&[&str]> = if lines.is_empty() {
        vec![&[][..]]
    } else {
        lines.chunks(PDF_LINES_PER_PAGE).collect()
    };

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in &pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages.len() as i64),
            "Resources" => resources_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(win_ansi(title)),
        "Producer" => Object::string_literal("pitchforge"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

const DOCX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const DOCX_PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCX_DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const DOCX_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="56"/></w:rPr></w:style></w:styles>"#;

fn docx_paragraph(text: &str, style: Option<&str>) -> String {
    let props = style
        .map(|s| format!("<w:pPr><w:pStyle w:val=\"{s}\"/></w:pPr>"))
        .unwrap_or_default();
    format!(
        "<w:p>{props}<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        html_escape::encode_text(text)
    )
}

/// Word document with a Title-styled heading and one paragraph per body line.
pub fn render_docx(title: &str, body: &str) -> Result<Vec<u8>, StorageError> {
    let mut document = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    );
    document.push_str(&docx_paragraph(title, Some("Title")));
    for line in body.lines() {
        document.push_str(&docx_paragraph(line, None));
    }
    document.push_str("</w:body></w:document>");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let parts = [
        ("[Content_Types].xml", DOCX_CONTENT_TYPES),
        ("_rels/.rels", DOCX_PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCX_DOCUMENT_RELS),
        ("word/styles.xml", DOCX_STYLES),
        ("word/document.xml", document.as_str()),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}
