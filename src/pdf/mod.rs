//! PDF backend
//!
//! This module binds the adapter layer to PDFium.

mod pdfium;
mod text;

pub use pdfium::PdfiumBackend;
