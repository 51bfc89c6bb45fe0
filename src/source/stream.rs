//! In-memory document sources

use crate::error::{Error, Result};
use std::path::Path;

/// Byte source a document can be opened from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    data: Vec<u8>,
}

impl Stream {
    /// Wrap bytes already in memory
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Read a whole file into a stream
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::PdfNotFound {
                path: path.display().to_string(),
            });
        }

        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the data starts with the `%PDF` signature
    pub fn has_pdf_magic(&self) -> bool {
        self.data.len() >= 4 && &self.data[0..4] == b"%PDF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_pdf_magic() {
        assert!(Stream::from_bytes(b"%PDF-1.7\n".to_vec()).has_pdf_magic());
        assert!(!Stream::from_bytes(b"not a pdf".to_vec()).has_pdf_magic());
        assert!(!Stream::from_bytes(Vec::new()).has_pdf_magic());
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4 data").unwrap();

        let stream = Stream::open_file(file.path()).unwrap();
        assert_eq!(stream.len(), 13);
        assert!(stream.has_pdf_magic());
    }

    #[test]
    fn test_open_missing_file() {
        let result = Stream::open_file("/nonexistent/path/file.pdf");
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }
}
