//! Local text extraction for PDF and DOCX files
//!
//! Used directly for DOCX and as the fallback when OCR of a PDF fails.

use lopdf::content::Content;
use lopdf::Object;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DocumentType;

/// Upper bound on a single pdf-extract run
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Local file parser
pub struct FileParser;

impl FileParser {
    /// Extract the text of a supported document
    pub fn extract_text(filename: &str, document_type: DocumentType, data: &[u8]) -> Result<String> {
        match document_type {
            DocumentType::Pdf => Self::pdf_text_layer(filename, data),
            DocumentType::Docx => Self::docx_text(filename, data),
        }
    }

    /// Text embedded in the PDF itself, without OCR
    pub fn pdf_text_layer(filename: &str, data: &[u8]) -> Result<String> {
        let text = match Self::extract_pdf_with_timeout(data) {
            Some(text) if !text.trim().is_empty() => text,
            _ => Self::extract_from_content_streams(filename, data)?,
        };
        Ok(normalize_text(&text))
    }

    /// Number of pages, if the file parses as a PDF
    pub fn pdf_page_count(data: &[u8]) -> Option<u32> {
        lopdf::Document::load_mem(data)
            .ok()
            .map(|doc| doc.get_pages().len() as u32)
    }

    /// Paragraph and table text of a DOCX file
    pub fn docx_text(filename: &str, data: &[u8]) -> Result<String> {
        let docx = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut lines = Vec::new();
        for child in docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => lines.push(paragraph_text(&p)),
                docx_rs::DocumentChild::Table(table) => {
                    lines.extend(table.rows.iter().map(row_text));
                }
                _ => {}
            }
        }

        Ok(normalize_text(&lines.join("\n")))
    }

    /// Run pdf-extract on its own thread; a font it chokes on must not stall the request
    fn extract_pdf_with_timeout(data: &[u8]) -> Option<String> {
        let data = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let _ = tx.send(pdf_extract::extract_text_from_mem(&data));
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Some(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed: {}, reading content streams", e);
                None
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!("pdf-extract timed out after {:?}", PDF_EXTRACT_TIMEOUT);
                None
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("pdf-extract thread panicked");
                None
            }
        }
    }

    /// Walk the text-showing operators of every page
    fn extract_from_content_streams(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let content = match doc.get_page_content(page_id) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!("No content for page {}: {}", page_number, e);
                    continue;
                }
            };
            let operations = match Content::decode(&content) {
                Ok(content) => content.operations,
                Err(e) => {
                    tracing::debug!("Undecodable content on page {}: {}", page_number, e);
                    continue;
                }
            };

            let mut text = String::new();
            for op in &operations {
                match op.operator.as_str() {
                    "Tj" | "'" | "\"" => {
                        if let Some(Object::String(bytes, _)) = op.operands.last() {
                            text.push_str(&String::from_utf8_lossy(bytes));
                        }
                    }
                    "TJ" => {
                        if let Some(Object::Array(items)) = op.operands.first() {
                            for item in items {
                                if let Object::String(bytes, _) = item {
                                    text.push_str(&String::from_utf8_lossy(bytes));
                                }
                            }
                        }
                    }
                    "ET" | "T*" | "Td" | "TD" => text.push('\n'),
                    _ => {}
                }
            }
            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        if pages.is_empty() {
            tracing::warn!("'{}' has no text layer; it is probably a scan", filename);
        }
        Ok(pages.join("\n\n"))
    }
}

// Tables and rows currently have a single child kind each
#[allow(irrefutable_let_patterns)]
fn row_text(row: &docx_rs::TableChild) -> String {
    let docx_rs::TableChild::TableRow(row) = row else {
        return String::new();
    };
    let mut cells = Vec::new();
    for cell in &row.cells {
        if let docx_rs::TableRowChild::TableCell(cell) = cell {
            cells.push(cell_text(cell));
        }
    }
    cells.join("\t")
}

fn cell_text(cell: &docx_rs::TableCell) -> String {
    cell.children
        .iter()
        .filter_map(|content| match content {
            docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                match child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    docx_rs::RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// Replace typographic characters with ASCII and drop blank lines
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\u{2010}' | '\u{2011}' | '\u{2013}' => out.push('-'),
            '\u{2014}' => out.push_str("--"),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            c => out.push(c),
        }
    }

    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
