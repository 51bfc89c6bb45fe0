//! Sentinel-returning adapter over a native document library
//!
//! Library calls that fail by raising an error are wrapped so that the
//! caller gets a sentinel value instead:
//! - handle-returning operations yield a null handle
//! - integer-returning operations yield `-1`
//! - the cause is kept in a per-context last-error slot
//!
//! The [`Context`] type drives any [`Backend`]; [`PdfiumBackend`] is the
//! bundled one. A C ABI over the PDFium context lives in [`ffi`].

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod guard;
pub mod handle;
pub mod model;
pub mod pdf;
pub mod source;

pub use backend::{Backend, Colorspace, Location, TextOptions};
pub use config::ContextConfig;
pub use context::Context;
pub use error::{Error, ErrorKind, Result};
pub use geometry::{Matrix, Rect};
pub use guard::{guarded, ErrorRecord, LastError};
pub use handle::{
    DocumentHandle, Handle, HandleKind, LinksHandle, OutlineHandle, PageHandle, PixmapHandle,
    StreamHandle, TextPageHandle,
};
pub use model::{Link, LinkTarget, Outline, OutlineItem, Pixmap, TextBlock, TextChar, TextLine, TextPage, Word};
pub use pdf::PdfiumBackend;
pub use source::{FormatKind, Stream};
