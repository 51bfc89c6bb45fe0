//! Execution context and the adapted operations
//!
//! Every operation comes in two forms. The plain form never fails: it runs
//! inside a guarded region and returns the operation's sentinel (a null
//! handle, `-1`, `None` or [`Rect::EMPTY`]) when the library signals a
//! failure. The `try_` form returns the library's `Result` untouched for
//! callers that want the cause. The cause of the last sentinel is also kept
//! in [`Context::last_error`].
//!
//! A context is not `Send`. Use one per thread.

use crate::backend::{Backend, Colorspace, Location, Matrix, Rect, TextOptions};
use crate::config::ContextConfig;
use crate::error::{Error, Result};
use crate::guard::{self, ErrorRecord, LastError};
use crate::handle::{
    kind, DocumentHandle, HandleTable, LinksHandle, OutlineHandle, PageHandle, PixmapHandle,
    StreamHandle, TextPageHandle,
};
use crate::model::{Link, Outline, Pixmap, TextPage};
use crate::source::Stream;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Generates the sentinel-returning form of each operation from a table of
/// `name(args) -> type, sentinel => fallible call` rows.
macro_rules! adapt {
    ($(
        $(#[$meta:meta])*
        $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty, $sentinel:expr => $call:ident;
    )*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self, $($arg: $ty),*) -> $ret {
                guard::guarded(&self.last_error, stringify!($name), $sentinel, || {
                    self.$call($($arg),*)
                })
            }
        )*
    };
}

struct PageEntry<P> {
    page: P,
    document: DocumentHandle,
}

/// Per-thread environment for every adapted call
pub struct Context<B: Backend> {
    backend: B,
    config: ContextConfig,
    documents: RefCell<HandleTable<kind::Document, B::Document>>,
    pages: RefCell<HandleTable<kind::Page, PageEntry<B::Page>>>,
    outlines: RefCell<HandleTable<kind::Outline, Outline>>,
    links: RefCell<HandleTable<kind::Links, Vec<Link>>>,
    pixmaps: RefCell<HandleTable<kind::Pixmap, Pixmap>>,
    text_pages: RefCell<HandleTable<kind::TextPage, TextPage>>,
    streams: RefCell<HandleTable<kind::Stream, Stream>>,
    last_error: LastError,
}

impl<B: Backend> Context<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ContextConfig::default())
    }

    pub fn with_config(backend: B, config: ContextConfig) -> Self {
        Self {
            backend,
            config,
            documents: RefCell::new(HandleTable::new()),
            pages: RefCell::new(HandleTable::new()),
            outlines: RefCell::new(HandleTable::new()),
            links: RefCell::new(HandleTable::new()),
            pixmaps: RefCell::new(HandleTable::new()),
            text_pages: RefCell::new(HandleTable::new()),
            streams: RefCell::new(HandleTable::new()),
            last_error: LastError::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Cause of the most recent sentinel returned by this context
    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.last_error.get()
    }

    pub fn clear_last_error(&self) {
        self.last_error.clear();
    }

    pub(crate) fn error_slot(&self) -> &LastError {
        &self.last_error
    }

    adapt! {
        /// Open a document from a file path. Null on failure.
        open_document(path: &Path) -> DocumentHandle, DocumentHandle::NULL
            => try_open_document;

        /// Open a document from a stream with a declared format kind
        /// (extension, MIME type or file name). Null on failure.
        open_document_with_stream(kind: &str, stream: StreamHandle) -> DocumentHandle,
            DocumentHandle::NULL => try_open_document_with_stream;

        /// Copy bytes into a new in-memory stream. Null on failure.
        open_memory(data: &[u8]) -> StreamHandle, StreamHandle::NULL => try_open_memory;

        /// Load a page by zero-based index. Null on failure.
        load_page(doc: DocumentHandle, index: i32) -> PageHandle, PageHandle::NULL
            => try_load_page;

        /// Load the outline tree. Null on failure; a document without
        /// bookmarks yields a valid, empty outline.
        load_outline(doc: DocumentHandle) -> OutlineHandle, OutlineHandle::NULL
            => try_load_outline;

        /// Load the link annotations of a page. Null on failure.
        load_links(page: PageHandle) -> LinksHandle, LinksHandle::NULL => try_load_links;

        /// Number of pages, or -1 on failure.
        count_pages(doc: DocumentHandle) -> i32, -1 => try_count_pages;

        /// Page number addressed by a structured location, or -1 on failure.
        page_number_from_location(doc: DocumentHandle, location: Location) -> i32, -1
            => try_page_number_from_location;

        /// Render a page to pixels. Null on failure, including degenerate
        /// transforms and renders over the configured size limits.
        new_pixmap_from_page(
            page: PageHandle,
            matrix: Matrix,
            colorspace: Colorspace,
            alpha: bool,
        ) -> PixmapHandle, PixmapHandle::NULL => try_new_pixmap_from_page;

        /// Extract structured text from a page. Null on failure.
        new_stext_page_from_page(page: PageHandle, options: TextOptions) -> TextPageHandle,
            TextPageHandle::NULL => try_new_stext_page_from_page;

        /// Document metadata value for `key` (e.g. `info:Title`).
        lookup_metadata(doc: DocumentHandle, key: &str) -> Option<String>, None
            => try_lookup_metadata;

        /// Page bounds in points. [`Rect::EMPTY`] on failure.
        bound_page(page: PageHandle) -> Rect, Rect::EMPTY => try_bound_page;

        /// Box enclosing the page's drawn content. [`Rect::EMPTY`] on
        /// failure and for a blank page.
        bound_content(page: PageHandle) -> Rect, Rect::EMPTY => try_bound_content;
    }

    pub fn try_open_document(&self, path: &Path) -> Result<DocumentHandle> {
        let doc = self.backend.open_document(path)?;
        Ok(self.documents.borrow_mut().insert(doc))
    }

    pub fn try_open_document_with_stream(
        &self,
        kind: &str,
        stream: StreamHandle,
    ) -> Result<DocumentHandle> {
        let stream = self.streams.borrow().get(stream)?;
        let doc = self.backend.open_document_with_stream(kind, &stream)?;
        Ok(self.documents.borrow_mut().insert(doc))
    }

    pub fn try_open_memory(&self, data: &[u8]) -> Result<StreamHandle> {
        Ok(self.streams.borrow_mut().insert(Stream::from_bytes(data)))
    }

    pub fn try_load_page(&self, doc: DocumentHandle, index: i32) -> Result<PageHandle> {
        let document = self.documents.borrow().get(doc)?;
        let page = self.backend.load_page(&document, index)?;
        Ok(self.pages.borrow_mut().insert(PageEntry {
            page,
            document: doc,
        }))
    }

    pub fn try_load_outline(&self, doc: DocumentHandle) -> Result<OutlineHandle> {
        let document = self.documents.borrow().get(doc)?;
        let outline = self.backend.load_outline(&document)?;
        Ok(self.outlines.borrow_mut().insert(outline))
    }

    pub fn try_load_links(&self, page: PageHandle) -> Result<LinksHandle> {
        let entry = self.pages.borrow().get(page)?;
        let links = self.backend.load_links(&entry.page)?;
        Ok(self.links.borrow_mut().insert(links))
    }

    pub fn try_count_pages(&self, doc: DocumentHandle) -> Result<i32> {
        let document = self.documents.borrow().get(doc)?;
        self.backend.count_pages(&document)
    }

    pub fn try_page_number_from_location(
        &self,
        doc: DocumentHandle,
        location: Location,
    ) -> Result<i32> {
        let document = self.documents.borrow().get(doc)?;
        self.backend.page_number_from_location(&document, location)
    }

    pub fn try_new_pixmap_from_page(
        &self,
        page: PageHandle,
        matrix: Matrix,
        colorspace: Colorspace,
        alpha: bool,
    ) -> Result<PixmapHandle> {
        if matrix.is_degenerate() {
            return Err(Error::DegenerateTransform);
        }

        let entry = self.pages.borrow().get(page)?;
        let bounds = self.backend.bound_page(&entry.page)?;
        self.check_render_limits(&matrix, &bounds)?;

        let pixmap = self
            .backend
            .new_pixmap_from_page(&entry.page, &matrix, colorspace, alpha)?;
        Ok(self.pixmaps.borrow_mut().insert(pixmap))
    }

    pub fn try_new_stext_page_from_page(
        &self,
        page: PageHandle,
        options: TextOptions,
    ) -> Result<TextPageHandle> {
        let entry = self.pages.borrow().get(page)?;
        let text_page = self.backend.new_stext_page_from_page(&entry.page, &options)?;
        Ok(self.text_pages.borrow_mut().insert(text_page))
    }

    pub fn try_lookup_metadata(&self, doc: DocumentHandle, key: &str) -> Result<Option<String>> {
        let document = self.documents.borrow().get(doc)?;
        self.backend.lookup_metadata(&document, key)
    }

    pub fn try_bound_page(&self, page: PageHandle) -> Result<Rect> {
        let entry = self.pages.borrow().get(page)?;
        self.backend.bound_page(&entry.page)
    }

    pub fn try_bound_content(&self, page: PageHandle) -> Result<Rect> {
        let entry = self.pages.borrow().get(page)?;
        self.backend.bound_content(&entry.page)
    }

    fn check_render_limits(&self, matrix: &Matrix, bounds: &Rect) -> Result<()> {
        let scale_x = (matrix.a * matrix.a + matrix.b * matrix.b).sqrt();
        let scale_y = (matrix.c * matrix.c + matrix.d * matrix.d).sqrt();
        let scale = scale_x.max(scale_y);
        if scale > self.config.max_render_scale {
            return Err(Error::ImageDimensionExceeded {
                detail: format!(
                    "scale {} exceeds maximum {}",
                    scale, self.config.max_render_scale
                ),
            });
        }

        let target = matrix.transform_rect(bounds);
        let pixel_area =
            (target.width().ceil() as u64).saturating_mul(target.height().ceil() as u64);
        if pixel_area > self.config.max_render_pixels {
            return Err(Error::ImageDimensionExceeded {
                detail: format!(
                    "{}x{} = {} pixels exceeds maximum {}",
                    target.width().ceil(),
                    target.height().ceil(),
                    pixel_area,
                    self.config.max_render_pixels
                ),
            });
        }

        Ok(())
    }

    /// Release a document together with the pages loaded from it.
    pub fn drop_document(&self, doc: DocumentHandle) {
        // PDFium requires pages to be closed before their document
        self.pages.borrow_mut().retain(|entry| entry.document != doc);
        self.documents.borrow_mut().remove(doc);
    }

    pub fn drop_page(&self, page: PageHandle) {
        self.pages.borrow_mut().remove(page);
    }

    pub fn drop_outline(&self, outline: OutlineHandle) {
        self.outlines.borrow_mut().remove(outline);
    }

    pub fn drop_links(&self, links: LinksHandle) {
        self.links.borrow_mut().remove(links);
    }

    pub fn drop_pixmap(&self, pixmap: PixmapHandle) {
        self.pixmaps.borrow_mut().remove(pixmap);
    }

    pub fn drop_stext_page(&self, text_page: TextPageHandle) {
        self.text_pages.borrow_mut().remove(text_page);
    }

    pub fn drop_stream(&self, stream: StreamHandle) {
        self.streams.borrow_mut().remove(stream);
    }

    pub fn outline(&self, outline: OutlineHandle) -> Option<Rc<Outline>> {
        self.outlines.borrow().get(outline).ok()
    }

    pub fn links(&self, links: LinksHandle) -> Option<Rc<Vec<Link>>> {
        self.links.borrow().get(links).ok()
    }

    pub fn pixmap(&self, pixmap: PixmapHandle) -> Option<Rc<Pixmap>> {
        self.pixmaps.borrow().get(pixmap).ok()
    }

    pub fn text_page(&self, text_page: TextPageHandle) -> Option<Rc<TextPage>> {
        self.text_pages.borrow().get(text_page).ok()
    }

    pub fn stream(&self, stream: StreamHandle) -> Option<Rc<Stream>> {
        self.streams.borrow().get(stream).ok()
    }

    /// Number of handles currently alive, all kinds together
    pub fn live_handles(&self) -> usize {
        self.documents.borrow().len()
            + self.pages.borrow().len()
            + self.outlines.borrow().len()
            + self.links.borrow().len()
            + self.pixmaps.borrow().len()
            + self.text_pages.borrow().len()
            + self.streams.borrow().len()
    }
}

impl<B: Backend> Drop for Context<B> {
    fn drop(&mut self) {
        self.pages.get_mut().retain(|_| false);
        self.documents.get_mut().retain(|_| false);
    }
}
