//! Error types for pdf-guard

use thiserror::Error;

/// Result type alias for pdf-guard
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pdf-guard
#[derive(Error, Debug)]
pub enum Error {
    /// Document file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF data
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected and no password was provided
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Declared format kind is unknown or not handled by the backend
    #[error("Unsupported document format: {kind}")]
    UnsupportedFormat { kind: String },

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: i32, total: i32 },

    /// Location does not name a page of the document
    #[error("Invalid location: chapter {chapter}, page {page}")]
    InvalidLocation { chapter: i32, page: i32 },

    /// Handle is null, released, or was never issued by this context
    #[error("Invalid {kind} handle: {handle}")]
    InvalidHandle { kind: &'static str, handle: u64 },

    /// Transform matrix is not invertible
    #[error("Degenerate transform matrix")]
    DegenerateTransform,

    /// Transform matrix is valid but the backend cannot render with it
    #[error("Unsupported transform: {reason}")]
    UnsupportedTransform { reason: String },

    /// Image dimension exceeded
    #[error("Image dimension exceeded: {detail}")]
    ImageDimensionExceeded { detail: String },

    /// Caller passed an unusable argument (null pointer, bad UTF-8)
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The native library could not be bound
    #[error("PDFium library unavailable: {reason}")]
    LibraryUnavailable { reason: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// The wrapped call panicked
    #[error("Call panicked: {message}")]
    Panic { message: String },

    /// Image encoding error
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure category, stable across releases and exposed over the C ABI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound = 1,
    Format = 2,
    Password = 3,
    Argument = 4,
    Range = 5,
    Transform = 6,
    Resource = 7,
    Library = 8,
    Io = 9,
    Panic = 10,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl Error {
    /// Category of this error, used by the last-error slot.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PdfNotFound { .. } => ErrorKind::NotFound,
            Error::InvalidPdf { .. } | Error::UnsupportedFormat { .. } => ErrorKind::Format,
            Error::PasswordRequired => ErrorKind::Password,
            Error::InvalidHandle { .. } | Error::InvalidArgument { .. } => ErrorKind::Argument,
            Error::PageOutOfBounds { .. } | Error::InvalidLocation { .. } => ErrorKind::Range,
            Error::DegenerateTransform | Error::UnsupportedTransform { .. } => {
                ErrorKind::Transform
            }
            Error::ImageDimensionExceeded { .. } => ErrorKind::Resource,
            Error::LibraryUnavailable { .. } | Error::Pdfium { .. } | Error::Image(_) => {
                ErrorKind::Library
            }
            Error::Io(_) => ErrorKind::Io,
            Error::Panic { .. } => ErrorKind::Panic,
        }
    }
}
