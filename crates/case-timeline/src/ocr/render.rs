//! Page preparation for the OCR model
//!
//! Each page is cut out of the source PDF as a standalone single-page PDF.
//! The model rasterizes it at the requested resolution.

use lopdf::Document;

use crate::error::{Error, Result};

/// MIME type of a rendered page
pub const PAGE_MIME: &str = "application/pdf";

/// One page ready to send to the OCR model
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number in the source document
    pub page_number: u32,
    /// Rasterization resolution in DPI
    pub resolution: u32,
    /// Encoded page
    pub data: Vec<u8>,
    /// MIME type of `data`
    pub mime: &'static str,
}

/// A loaded PDF that can be split into pages
pub struct PdfPages {
    doc: Document,
    page_count: u32,
}

impl PdfPages {
    /// Parse PDF bytes
    pub fn load(filename: &str, data: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;
        if doc.is_encrypted() {
            return Err(Error::file_parse(filename, "PDF is encrypted"));
        }
        let page_count = doc.get_pages().len() as u32;
        Ok(Self { doc, page_count })
    }

    /// Number of pages
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Cut out one 1-based page
    pub fn render(&self, page_number: u32, resolution: u32) -> Result<RenderedPage> {
        if page_number == 0 || page_number > self.page_count {
            return Err(Error::InvalidPageRange(format!(
                "page {} of {}",
                page_number, self.page_count
            )));
        }

        let others: Vec<u32> = (1..=self.page_count).filter(|&p| p != page_number).collect();
        let mut single = self.doc.clone();
        single.delete_pages(&others);
        single.prune_objects();

        let mut data = Vec::new();
        single
            .save_to(&mut data)
            .map_err(|e| Error::ocr(format!("Failed to encode page {}: {}", page_number, e)))?;

        Ok(RenderedPage {
            page_number,
            resolution,
            data,
            mime: PAGE_MIME,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::FileParser;
    use crate::testing::sample_pdf;

    #[test]
    fn test_render_single_page() {
        let pdf = sample_pdf(&["Page one", "Page two", "Page three"]);
        let pages = PdfPages::load("three.pdf", &pdf).unwrap();
        assert_eq!(pages.page_count(), 3);

        let page = pages.render(2, 200).unwrap();
        assert_eq!(page.page_number, 2);
        assert_eq!(page.resolution, 200);
        assert_eq!(page.mime, PAGE_MIME);
        assert_eq!(FileParser::pdf_page_count(&page.data), Some(1));

        let text = FileParser::pdf_text_layer("page.pdf", &page.data).unwrap();
        assert!(text.contains("Page two"));
        assert!(!text.contains("Page one"));
    }

    #[test]
    fn test_render_out_of_range() {
        let pages = PdfPages::load("one.pdf", &sample_pdf(&["only"])).unwrap();
        assert!(matches!(pages.render(0, 200), Err(Error::InvalidPageRange(_))));
        assert!(matches!(pages.render(2, 200), Err(Error::InvalidPageRange(_))));
    }

    #[test]
    fn test_load_rejects_non_pdf() {
        assert!(matches!(
            PdfPages::load("x.pdf", b"hello"),
            Err(Error::FileParse { .. })
        ));
    }
}
