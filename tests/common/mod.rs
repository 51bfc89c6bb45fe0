//! Shared helpers for integration tests

#![allow(dead_code)]

use pdf_guard::{
    Backend, Colorspace, Error, FormatKind, Link, LinkTarget, Location, Matrix, Outline,
    OutlineItem, Pixmap, Rect, Result, Stream, TextBlock, TextChar, TextLine, TextOptions,
    TextPage,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One page of a mock document
#[derive(Debug, Clone)]
pub struct MockPage {
    pub width: f32,
    pub height: f32,
    pub lines: Vec<String>,
    pub links: Vec<Link>,
}

impl MockPage {
    pub fn letter(lines: &[&str]) -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            links: Vec::new(),
        }
    }
}

/// In-memory stand-in for a library document
#[derive(Debug, Clone)]
pub struct MockDocument {
    pub pages: Vec<MockPage>,
    /// Pages per chapter, in order
    pub chapters: Vec<usize>,
    pub outline: Outline,
    pub metadata: HashMap<String, String>,
}

impl MockDocument {
    pub fn with_pages(count: usize) -> Self {
        let pages = (0..count)
            .map(|i| MockPage::letter(&[&format!("Page {}", i + 1)]))
            .collect();
        Self {
            pages,
            chapters: vec![count],
            outline: Outline::default(),
            metadata: HashMap::new(),
        }
    }
}

/// Backend serving documents from memory, with injectable failures.
///
/// Operations named in `failing` return a library error; those in
/// `panicking` panic. Every call is counted in `calls`.
#[derive(Default)]
pub struct MockBackend {
    pub documents: HashMap<PathBuf, MockDocument>,
    /// Document produced by any stream that starts with `%PDF`
    pub stream_document: Option<MockDocument>,
    pub failing: RefCell<HashSet<&'static str>>,
    pub panicking: RefCell<HashSet<&'static str>>,
    pub calls: Cell<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, doc: MockDocument) -> Self {
        self.documents.insert(path.into(), doc);
        self
    }

    pub fn with_stream_document(mut self, doc: MockDocument) -> Self {
        self.stream_document = Some(doc);
        self
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn panic_on(&self, op: &'static str) {
        self.panicking.borrow_mut().insert(op);
    }

    pub fn heal(&self) {
        self.failing.borrow_mut().clear();
        self.panicking.borrow_mut().clear();
    }

    fn enter(&self, op: &'static str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.panicking.borrow().contains(op) {
            panic!("mock library aborted in {}", op);
        }
        if self.failing.borrow().contains(op) {
            return Err(Error::Pdfium {
                reason: format!("injected failure in {}", op),
            });
        }
        Ok(())
    }
}

fn text_line(text: &str, y: f32) -> TextLine {
    let chars: Vec<TextChar> = text
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let x0 = 72.0 + i as f32 * 6.0;
            TextChar {
                c,
                bbox: Rect::new(x0, y, x0 + 6.0, y + 12.0),
            }
        })
        .collect();
    let bbox = chars.iter().fold(Rect::EMPTY, |acc, c| acc.union(&c.bbox));
    TextLine {
        bbox,
        chars,
        hyphenated: false,
    }
}

impl Backend for MockBackend {
    type Document = MockDocument;
    type Page = MockPage;

    fn open_document(&self, path: &Path) -> Result<MockDocument> {
        self.enter("open_document")?;
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| Error::PdfNotFound {
                path: path.display().to_string(),
            })
    }

    fn open_document_with_stream(&self, kind: &str, stream: &Stream) -> Result<MockDocument> {
        self.enter("open_document_with_stream")?;
        let format = FormatKind::resolve(kind)?;
        if format != FormatKind::Pdf {
            return Err(Error::UnsupportedFormat {
                kind: format.name().to_string(),
            });
        }
        if !stream.has_pdf_magic() {
            return Err(Error::InvalidPdf {
                reason: "missing %PDF header".to_string(),
            });
        }
        self.stream_document.clone().ok_or(Error::InvalidPdf {
            reason: "no stream document configured".to_string(),
        })
    }

    fn count_pages(&self, doc: &MockDocument) -> Result<i32> {
        self.enter("count_pages")?;
        Ok(doc.pages.len() as i32)
    }

    fn load_page(&self, doc: &MockDocument, index: i32) -> Result<MockPage> {
        self.enter("load_page")?;
        usize::try_from(index)
            .ok()
            .and_then(|i| doc.pages.get(i))
            .cloned()
            .ok_or(Error::PageOutOfBounds {
                page: index,
                total: doc.pages.len() as i32,
            })
    }

    fn load_outline(&self, doc: &MockDocument) -> Result<Outline> {
        self.enter("load_outline")?;
        Ok(doc.outline.clone())
    }

    fn load_links(&self, page: &MockPage) -> Result<Vec<Link>> {
        self.enter("load_links")?;
        Ok(page.links.clone())
    }

    fn page_number_from_location(&self, doc: &MockDocument, location: Location) -> Result<i32> {
        self.enter("page_number_from_location")?;
        let invalid = || Error::InvalidLocation {
            chapter: location.chapter,
            page: location.page,
        };
        let chapter = usize::try_from(location.chapter).map_err(|_| invalid())?;
        let len = *doc.chapters.get(chapter).ok_or_else(invalid)?;
        if location.page < 0 || location.page as usize >= len {
            return Err(invalid());
        }
        let before: usize = doc.chapters[..chapter].iter().sum();
        Ok((before + location.page as usize) as i32)
    }

    fn new_pixmap_from_page(
        &self,
        page: &MockPage,
        matrix: &Matrix,
        colorspace: Colorspace,
        alpha: bool,
    ) -> Result<Pixmap> {
        self.enter("new_pixmap_from_page")?;
        let target = matrix.transform_rect(&Rect::new(0.0, 0.0, page.width, page.height));
        let width = target.width().ceil() as u32;
        let height = target.height().ceil() as u32;
        let components = colorspace.channels() + usize::from(alpha);
        let stride = width as usize * components;
        Ok(Pixmap {
            x: target.x0.floor() as i32,
            y: target.y0.floor() as i32,
            width,
            height,
            colorspace,
            alpha,
            stride,
            samples: vec![255; stride * height as usize],
        })
    }

    fn new_stext_page_from_page(&self, page: &MockPage, options: &TextOptions) -> Result<TextPage> {
        self.enter("new_stext_page_from_page")?;
        let lines: Vec<TextLine> = page
            .lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let text = if options.inhibit_spaces() {
                    text.replace(' ', "")
                } else {
                    text.clone()
                };
                text_line(&text, 72.0 + i as f32 * 14.0)
            })
            .collect();
        let blocks = if lines.is_empty() {
            Vec::new()
        } else {
            let bbox = lines.iter().fold(Rect::EMPTY, |acc, l| acc.union(&l.bbox));
            vec![TextBlock { bbox, lines }]
        };
        Ok(TextPage {
            bounds: Rect::new(0.0, 0.0, page.width, page.height),
            blocks,
        })
    }

    fn lookup_metadata(&self, doc: &MockDocument, key: &str) -> Result<Option<String>> {
        self.enter("lookup_metadata")?;
        if key == "format" {
            return Ok(Some("PDF".to_string()));
        }
        Ok(doc.metadata.get(key).cloned())
    }

    fn bound_page(&self, page: &MockPage) -> Result<Rect> {
        self.enter("bound_page")?;
        Ok(Rect::new(0.0, 0.0, page.width, page.height))
    }

    fn bound_content(&self, page: &MockPage) -> Result<Rect> {
        self.enter("bound_content")?;
        Ok(page
            .lines
            .iter()
            .enumerate()
            .map(|(i, text)| text_line(text, 72.0 + i as f32 * 14.0).bbox)
            .fold(Rect::EMPTY, |acc, bbox| acc.union(&bbox)))
    }
}

/// Three-page document with an outline, a link and metadata
pub fn sample_document() -> MockDocument {
    let mut doc = MockDocument::with_pages(3);
    doc.pages[0].lines = vec!["Hello world".to_string(), "second line".to_string()];
    doc.pages[0].links = vec![
        Link {
            rect: Rect::new(72.0, 72.0, 200.0, 84.0),
            target: LinkTarget::Uri("https://example.com".to_string()),
        },
        Link {
            rect: Rect::new(72.0, 100.0, 120.0, 112.0),
            target: LinkTarget::Page(2),
        },
    ];
    doc.chapters = vec![2, 1];
    doc.outline = Outline::new(vec![OutlineItem {
        title: "Introduction".to_string(),
        page: Some(0),
        children: vec![OutlineItem {
            title: "Background".to_string(),
            page: Some(1),
            children: Vec::new(),
        }],
    }]);
    doc.metadata
        .insert("info:Title".to_string(), "Sample".to_string());
    doc
}

pub const SAMPLE_PATH: &str = "/docs/sample.pdf";

/// Two-page PDF: page 1 is US Letter with one line of Helvetica text, page 2
/// is a blank 300x400 page. The document title is "Fixture".
pub fn minimal_pdf() -> Vec<u8> {
    let content = "BT /F1 24 Tf 72 700 Td (Hello PDF) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 6 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        "<< /Title (Fixture) >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = pdf.len();
    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        table.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.extend_from_slice(table.as_bytes());
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 7 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    pdf
}

/// Write [`minimal_pdf`] to a temporary file
pub fn minimal_pdf_file() -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .expect("create temp file");
    file.write_all(&minimal_pdf()).expect("write temp pdf");
    file
}
