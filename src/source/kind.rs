//! Resolution of declared document format kinds

use crate::error::{Error, Result};
use std::path::Path;

/// Document formats the adapter can name. Whether a backend can open one
/// is up to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Pdf,
    Xps,
    Epub,
    ComicBook,
    FictionBook,
    Html,
    Svg,
    Djvu,
    Image,
}

impl FormatKind {
    /// Resolve an extension (`pdf`, `.pdf`), a MIME type
    /// (`application/pdf`) or a file name (`a/b.PDF`).
    ///
    /// A recognised file extension wins over a MIME prefix, so
    /// `image/report.pdf` is a PDF file inside an `image` directory.
    pub fn resolve(kind: &str) -> Result<Self> {
        let lowered = kind.trim().to_lowercase();

        let ext = match lowered.strip_prefix('.') {
            Some(ext) => Some(ext.to_string()),
            None => file_kind(&lowered),
        };
        if let Some(found) = ext.as_deref().and_then(Self::from_extension) {
            return Ok(found);
        }

        Self::from_mime(&lowered)
            .or_else(|| Self::from_extension(&lowered))
            .ok_or_else(|| Error::UnsupportedFormat {
                kind: kind.to_string(),
            })
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let kind = match mime {
            "application/pdf" | "application/x-pdf" => FormatKind::Pdf,
            "application/vnd.ms-xpsdocument" | "application/oxps" => FormatKind::Xps,
            "application/epub+zip" => FormatKind::Epub,
            "application/x-cbz" | "application/x-cbt" => FormatKind::ComicBook,
            "application/x-fictionbook" | "text/xml" => FormatKind::FictionBook,
            "text/html" | "application/xhtml+xml" => FormatKind::Html,
            "image/svg+xml" => FormatKind::Svg,
            "image/vnd.djvu" | "image/x-djvu" => FormatKind::Djvu,
            m if m.starts_with("image/") => FormatKind::Image,
            _ => return None,
        };
        Some(kind)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        let kind = match ext {
            "pdf" => FormatKind::Pdf,
            "xps" | "oxps" => FormatKind::Xps,
            "epub" => FormatKind::Epub,
            "cbz" | "cbt" | "zip" | "tar" => FormatKind::ComicBook,
            "fb2" | "xml" => FormatKind::FictionBook,
            "htm" | "html" | "xhtml" => FormatKind::Html,
            "svg" => FormatKind::Svg,
            "djvu" | "djv" => FormatKind::Djvu,
            "bmp" | "gif" | "hdp" | "j2k" | "jfif" | "jp2" | "jpe" | "jpeg" | "jpg" | "jpx"
            | "jxr" | "pam" | "pbm" | "pgm" | "png" | "pnm" | "ppm" | "tif" | "tiff" | "wdp" => {
                FormatKind::Image
            }
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Pdf => "pdf",
            FormatKind::Xps => "xps",
            FormatKind::Epub => "epub",
            FormatKind::ComicBook => "cbz",
            FormatKind::FictionBook => "fb2",
            FormatKind::Html => "html",
            FormatKind::Svg => "svg",
            FormatKind::Djvu => "djvu",
            FormatKind::Image => "image",
        }
    }
}

/// Lowercase extension of a path
pub fn file_kind<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|os_ext| os_ext.to_str())
        .map(|ext| ext.to_lowercase())
}
