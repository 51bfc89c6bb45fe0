//! The native-library seam
//!
//! A [`Backend`] is the opaque collaborator the adapter layer wraps. Its
//! document and page objects are owned by the library and never inspected
//! here. Every call reports failure through `Result`, which the adapter
//! turns into a sentinel.

use crate::error::Result;
use crate::model::{Link, Outline, Pixmap, TextPage};
use crate::source::Stream;
use serde::Serialize;
use std::path::Path;

pub use crate::geometry::{Matrix, Rect};

/// Structured position inside a document: chapter plus page within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Location {
    pub chapter: i32,
    pub page: i32,
}

impl Location {
    pub const fn new(chapter: i32, page: i32) -> Self {
        Self { chapter, page }
    }
}

/// Output colour model of a rendered pixmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Colorspace {
    Gray,
    Rgb,
}

impl Colorspace {
    /// Colour channels, not counting alpha.
    pub fn channels(self) -> usize {
        match self {
            Colorspace::Gray => 1,
            Colorspace::Rgb => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Colorspace::Gray),
            3 => Some(Colorspace::Rgb),
            _ => None,
        }
    }
}

/// Structured-text extraction flags.
///
/// `PRESERVE_IMAGES` and `PRESERVE_SPANS` are accepted for compatibility;
/// the text model carries neither images nor style spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextOptions {
    pub flags: u32,
}

impl TextOptions {
    pub const PRESERVE_LIGATURES: u32 = 1;
    pub const PRESERVE_WHITESPACE: u32 = 2;
    pub const PRESERVE_IMAGES: u32 = 4;
    pub const INHIBIT_SPACES: u32 = 8;
    pub const DEHYPHENATE: u32 = 16;
    pub const PRESERVE_SPANS: u32 = 32;
    pub const MEDIABOX_CLIP: u32 = 64;

    pub const fn new(flags: u32) -> Self {
        Self { flags }
    }

    pub const fn with(self, flag: u32) -> Self {
        Self {
            flags: self.flags | flag,
        }
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }

    pub fn preserve_ligatures(&self) -> bool {
        self.contains(Self::PRESERVE_LIGATURES)
    }

    pub fn preserve_whitespace(&self) -> bool {
        self.contains(Self::PRESERVE_WHITESPACE)
    }

    pub fn inhibit_spaces(&self) -> bool {
        self.contains(Self::INHIBIT_SPACES)
    }

    pub fn dehyphenate(&self) -> bool {
        self.contains(Self::DEHYPHENATE)
    }

    pub fn mediabox_clip(&self) -> bool {
        self.contains(Self::MEDIABOX_CLIP)
    }
}

/// Operations the adapter layer forwards to the native library.
///
/// Arguments are passed through unvalidated; range and handle checks are
/// the implementation's business.
pub trait Backend {
    /// Library-owned document object.
    type Document;
    /// Library-owned page object.
    type Page;

    fn open_document(&self, path: &Path) -> Result<Self::Document>;

    fn open_document_with_stream(&self, kind: &str, stream: &Stream) -> Result<Self::Document>;

    fn count_pages(&self, doc: &Self::Document) -> Result<i32>;

    fn load_page(&self, doc: &Self::Document, index: i32) -> Result<Self::Page>;

    fn load_outline(&self, doc: &Self::Document) -> Result<Outline>;

    fn load_links(&self, page: &Self::Page) -> Result<Vec<Link>>;

    fn page_number_from_location(&self, doc: &Self::Document, location: Location) -> Result<i32>;

    fn new_pixmap_from_page(
        &self,
        page: &Self::Page,
        matrix: &Matrix,
        colorspace: Colorspace,
        alpha: bool,
    ) -> Result<Pixmap>;

    fn new_stext_page_from_page(&self, page: &Self::Page, options: &TextOptions)
        -> Result<TextPage>;

    fn lookup_metadata(&self, doc: &Self::Document, key: &str) -> Result<Option<String>>;

    fn bound_page(&self, page: &Self::Page) -> Result<Rect>;

    /// Bounding box of everything drawn on the page, in page space.
    /// [`Rect::EMPTY`] for a page with no content.
    fn bound_content(&self, page: &Self::Page) -> Result<Rect>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_option_flags() {
        let opts = TextOptions::default()
            .with(TextOptions::DEHYPHENATE)
            .with(TextOptions::MEDIABOX_CLIP);
        assert!(opts.dehyphenate());
        assert!(opts.mediabox_clip());
        assert!(!opts.preserve_whitespace());
        assert_eq!(opts.flags, 16 | 64);
    }

    #[test]
    fn test_colorspace_codes() {
        assert_eq!(Colorspace::from_code(1), Some(Colorspace::Gray));
        assert_eq!(Colorspace::from_code(3), Some(Colorspace::Rgb));
        assert_eq!(Colorspace::from_code(4), None);
        assert_eq!(Colorspace::Rgb.channels(), 3);
    }
}
