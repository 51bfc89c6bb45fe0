//! PDFium-backed implementation of [`Backend`]

use crate::backend::{Backend, Colorspace, Location, Matrix, Rect, TextOptions};
use crate::config::ContextConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::model::{Link, LinkTarget, Outline, OutlineItem, Pixmap, TextPage};
use crate::pdf::text::{build_text_page, RawChar};
use crate::source::{FormatKind, Stream};
use pdfium_render::prelude::*;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// A thread's PDFium binding and the directory it was requested from
struct BoundPdfium {
    library_path: Option<PathBuf>,
    pdfium: &'static Pdfium,
}

thread_local! {
    static PDFIUM: OnceCell<BoundPdfium> = const { OnceCell::new() };
}

/// Bind to the PDFium library, trying `library_path` or the default locations
fn create_pdfium(library_path: Option<&Path>) -> Result<Pdfium> {
    let bindings = match library_path {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "/opt/pdfium/lib",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Error::LibraryUnavailable {
        reason: format!("Failed to initialize PDFium: {}", e),
    })?;

    Ok(Pdfium::new(bindings))
}

/// A thread binds PDFium once. Later requests may omit the directory, but
/// naming a different one than the first binding is an error.
fn check_rebind(bound: Option<&Path>, requested: Option<&Path>) -> Result<()> {
    match requested {
        Some(requested) if bound != Some(requested) => Err(Error::LibraryUnavailable {
            reason: format!(
                "PDFium already bound on this thread from {}, cannot rebind from {}",
                bound.map_or("the default locations".to_string(), |p| p.display().to_string()),
                requested.display()
            ),
        }),
        _ => Ok(()),
    }
}

/// PDFium instance of the calling thread. Bound on first use and kept for
/// the life of the thread, so documents can borrow it for `'static`.
fn thread_pdfium(library_path: Option<&Path>) -> Result<&'static Pdfium> {
    PDFIUM.with(|cell| {
        if let Some(bound) = cell.get() {
            check_rebind(bound.library_path.as_deref(), library_path)?;
            return Ok(bound.pdfium);
        }

        let pdfium: &'static Pdfium = Box::leak(Box::new(create_pdfium(library_path)?));
        tracing::debug!(library_path = ?library_path, "PDFium bound for current thread");
        let _ = cell.set(BoundPdfium {
            library_path: library_path.map(Path::to_path_buf),
            pdfium,
        });
        Ok(pdfium)
    })
}

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// Backend over the PDFium library
pub struct PdfiumBackend {
    pdfium: &'static Pdfium,
}

impl PdfiumBackend {
    pub fn new() -> Result<Self> {
        Self::with_library_path(None)
    }

    pub fn with_library_path(library_path: Option<&Path>) -> Result<Self> {
        Ok(Self {
            pdfium: thread_pdfium(library_path)?,
        })
    }

    fn collect_bookmarks<'a>(bookmarks: impl Iterator<Item = PdfBookmark<'a>>) -> Vec<OutlineItem> {
        bookmarks
            .map(|bookmark| {
                let title = bookmark.title().unwrap_or_default();
                let page = bookmark
                    .destination()
                    .and_then(|dest| dest.page_index().ok().map(|idx| idx as u32));

                let children = Self::collect_bookmarks(bookmark.iter_direct_children());

                OutlineItem {
                    title,
                    page,
                    children,
                }
            })
            .collect()
    }

    fn link_target(link: &PdfLink) -> Option<LinkTarget> {
        if let Some(action) = link.action() {
            if action.action_type() == PdfActionType::Uri {
                if let Some(uri_action) = action.as_uri_action() {
                    return Some(LinkTarget::Uri(uri_action.uri().unwrap_or_default()));
                }
            }
        }

        link.destination()
            .and_then(|dest| dest.page_index().ok())
            .map(|idx| LinkTarget::Page(idx as u32))
    }
}

/// Convert a PDF-space rectangle (y up) into page space (y down)
fn page_space(rect: &PdfRect, page_height: f32) -> Rect {
    Rect::new(
        rect.left().value,
        page_height - rect.top().value,
        rect.right().value,
        page_height - rect.bottom().value,
    )
}

impl Backend for PdfiumBackend {
    type Document = PdfDocument<'static>;
    type Page = PdfPage<'static>;

    fn open_document(&self, path: &Path) -> Result<Self::Document> {
        if !path.exists() {
            return Err(Error::PdfNotFound {
                path: path.display().to_string(),
            });
        }

        self.pdfium
            .load_pdf_from_file(path, None)
            .map_err(map_pdfium_error)
    }

    fn open_document_with_stream(&self, kind: &str, stream: &Stream) -> Result<Self::Document> {
        let format = FormatKind::resolve(kind)?;
        if format != FormatKind::Pdf {
            return Err(Error::UnsupportedFormat {
                kind: format.name().to_string(),
            });
        }

        if !stream.has_pdf_magic() {
            return Err(Error::InvalidPdf {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        self.pdfium
            .load_pdf_from_byte_vec(stream.as_bytes().to_vec(), None)
            .map_err(map_pdfium_error)
    }

    fn count_pages(&self, doc: &Self::Document) -> Result<i32> {
        Ok(doc.pages().len() as i32)
    }

    fn load_page(&self, doc: &Self::Document, index: i32) -> Result<Self::Page> {
        let total = doc.pages().len() as i32;
        if index < 0 || index >= total {
            return Err(Error::PageOutOfBounds { page: index, total });
        }

        doc.pages().get(index as u16).map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", index, e),
        })
    }

    fn load_outline(&self, doc: &Self::Document) -> Result<Outline> {
        Ok(Outline::new(Self::collect_bookmarks(
            doc.bookmarks().iter(),
        )))
    }

    fn load_links(&self, page: &Self::Page) -> Result<Vec<Link>> {
        let height = page.height().value;

        let targets: Vec<LinkTarget> = page
            .links()
            .iter()
            .filter_map(|link| Self::link_target(&link))
            .collect();

        // PdfLink doesn't expose bounds; pair with link annotations in order
        let rects: Vec<Rect> = page
            .annotations()
            .iter()
            .filter(|annotation| annotation.annotation_type() == PdfPageAnnotationType::Link)
            .filter_map(|annotation| annotation.bounds().ok())
            .map(|bounds| page_space(&bounds, height))
            .collect();

        Ok(targets
            .into_iter()
            .enumerate()
            .map(|(i, target)| Link {
                rect: rects.get(i).copied().unwrap_or(Rect::EMPTY),
                target,
            })
            .collect())
    }

    fn page_number_from_location(&self, doc: &Self::Document, location: Location) -> Result<i32> {
        let total = doc.pages().len() as i32;
        if location.chapter != 0 || location.page < 0 || location.page >= total {
            return Err(Error::InvalidLocation {
                chapter: location.chapter,
                page: location.page,
            });
        }
        Ok(location.page)
    }

    fn new_pixmap_from_page(
        &self,
        page: &Self::Page,
        matrix: &Matrix,
        colorspace: Colorspace,
        alpha: bool,
    ) -> Result<Pixmap> {
        if !matrix.is_axis_aligned() || matrix.a <= 0.0 || matrix.d <= 0.0 {
            return Err(Error::UnsupportedTransform {
                reason: "only positive axis-aligned scaling is supported".to_string(),
            });
        }

        let target_width = (page.width().value * matrix.a).ceil().max(1.0) as i32;
        let target_height = (page.height().value * matrix.d).ceil().max(1.0) as i32;

        let mut config = PdfRenderConfig::new()
            .set_target_size(target_width, target_height)
            .render_form_data(true)
            .render_annotations(true);
        if alpha {
            config = config.set_clear_color(PdfColor::new(255, 255, 255, 0));
        }

        let bitmap = page.render_with_config(&config).map_err(|e| Error::Pdfium {
            reason: format!("Failed to render page: {}", e),
        })?;

        let dynamic_image = bitmap.as_image();
        let width = dynamic_image.width();
        let height = dynamic_image.height();
        let samples = match (colorspace, alpha) {
            (Colorspace::Gray, false) => dynamic_image.to_luma8().into_raw(),
            (Colorspace::Gray, true) => dynamic_image.to_luma_alpha8().into_raw(),
            (Colorspace::Rgb, false) => dynamic_image.to_rgb8().into_raw(),
            (Colorspace::Rgb, true) => dynamic_image.to_rgba8().into_raw(),
        };
        let components = colorspace.channels() + usize::from(alpha);

        Ok(Pixmap {
            x: matrix.e.floor() as i32,
            y: matrix.f.floor() as i32,
            width,
            height,
            colorspace,
            alpha,
            stride: width as usize * components,
            samples,
        })
    }

    fn new_stext_page_from_page(&self, page: &Self::Page, options: &TextOptions) -> Result<TextPage> {
        let height = page.height().value;
        let bounds = Rect::new(0.0, 0.0, page.width().value, height);

        let text_obj = page.text().map_err(|e| Error::Pdfium {
            reason: format!("Failed to load page text: {}", e),
        })?;

        let mut chars = Vec::new();
        for segment in text_obj.segments().iter() {
            if let Ok(segment_chars) = segment.chars() {
                for char_result in segment_chars.iter() {
                    if let Some(c) = char_result.unicode_char() {
                        if let Ok(loose) = char_result.loose_bounds() {
                            chars.push(RawChar {
                                c,
                                bbox: page_space(&loose, height),
                            });
                        }
                    }
                }
            }
        }

        Ok(build_text_page(chars, bounds, options))
    }

    fn lookup_metadata(&self, doc: &Self::Document, key: &str) -> Result<Option<String>> {
        let tag = match key {
            "info:Title" => PdfDocumentMetadataTagType::Title,
            "info:Author" => PdfDocumentMetadataTagType::Author,
            "info:Subject" => PdfDocumentMetadataTagType::Subject,
            "info:Keywords" => PdfDocumentMetadataTagType::Keywords,
            "info:Creator" => PdfDocumentMetadataTagType::Creator,
            "info:Producer" => PdfDocumentMetadataTagType::Producer,
            "info:CreationDate" => PdfDocumentMetadataTagType::CreationDate,
            "info:ModDate" => PdfDocumentMetadataTagType::ModificationDate,
            "format" => return Ok(Some("PDF".to_string())),
            _ => return Ok(None),
        };

        Ok(doc.metadata().get(tag).map(|t| t.value().to_string()))
    }

    fn bound_page(&self, page: &Self::Page) -> Result<Rect> {
        Ok(Rect::new(0.0, 0.0, page.width().value, page.height().value))
    }

    fn bound_content(&self, page: &Self::Page) -> Result<Rect> {
        let height = page.height().value;

        let mut content = Rect::EMPTY;
        for object in page.objects().iter() {
            // Objects PDFium cannot measure add nothing to the box
            if let Ok(quad) = object.bounds() {
                content = content.union(&page_space(&quad.to_rect(), height));
            }
        }
        Ok(content)
    }
}

impl Context<PdfiumBackend> {
    /// Context over the calling thread's PDFium instance
    pub fn pdfium(config: ContextConfig) -> Result<Self> {
        let backend = PdfiumBackend::with_library_path(config.library_path.as_deref())?;
        Ok(Context::with_config(backend, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebind_same_or_unspecified_path() {
        let dir = Path::new("/opt/pdfium/lib");
        assert!(check_rebind(None, None).is_ok());
        assert!(check_rebind(Some(dir), None).is_ok());
        assert!(check_rebind(Some(dir), Some(dir)).is_ok());
    }

    #[test]
    fn test_rebind_different_path_is_rejected() {
        let first = Path::new("/opt/pdfium/lib");
        let other = Path::new("/usr/local/lib");

        let err = check_rebind(Some(first), Some(other)).unwrap_err();
        assert!(matches!(err, Error::LibraryUnavailable { .. }));
        assert!(err.to_string().contains("/usr/local/lib"));

        let err = check_rebind(None, Some(other)).unwrap_err();
        assert!(err.to_string().contains("default locations"));
    }

    #[test]
    fn test_page_space_flips_y() {
        let rect = PdfRect::new_from_values(700.0, 72.0, 724.0, 180.0);
        assert_eq!(page_space(&rect, 792.0), Rect::new(72.0, 68.0, 180.0, 92.0));
    }
}
