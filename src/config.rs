//! Context configuration

use std::path::PathBuf;

/// Resource limits and library lookup for a [`Context`](crate::Context)
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Directory holding the PDFium shared library (default: search `./`,
    /// `/opt/pdfium/lib`, then the system library path).
    ///
    /// PDFium is bound once per thread. A later context on the same thread
    /// may leave this unset to reuse the binding; naming a different
    /// directory fails with `LibraryUnavailable`.
    pub library_path: Option<PathBuf>,
    /// Maximum scale factor accepted by `new_pixmap_from_page` (default: 10.0)
    pub max_render_scale: f32,
    /// Maximum total pixel area of a rendered pixmap (default: 100_000_000)
    pub max_render_pixels: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            max_render_scale: 10.0,
            max_render_pixels: 100_000_000,
        }
    }
}
