//! Owned results handed back by a backend

use crate::backend::Colorspace;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use image::{DynamicImage, ImageBuffer, ImageFormat};
use serde::Serialize;

/// Outline entry (bookmark)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineItem {
    pub title: String,
    /// Zero-based target page, when the entry points inside the document
    pub page: Option<u32>,
    pub children: Vec<OutlineItem>,
}

/// Table of contents of a document. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outline {
    pub items: Vec<OutlineItem>,
}

impl Outline {
    pub fn new(items: Vec<OutlineItem>) -> Self {
        Self { items }
    }

    /// Total number of entries, nested ones included.
    pub fn len(&self) -> usize {
        fn count(items: &[OutlineItem]) -> usize {
            items.iter().map(|i| 1 + count(&i.children)).sum()
        }
        count(&self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Where a link points
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    Uri(String),
    /// Zero-based page inside the same document
    Page(u32),
}

/// Link annotation on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub rect: Rect,
    pub target: LinkTarget,
}

/// Rendered page pixels, rows packed top to bottom.
#[derive(Debug, Clone, Serialize)]
pub struct Pixmap {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub colorspace: Colorspace,
    pub alpha: bool,
    pub stride: usize,
    #[serde(skip)]
    pub samples: Vec<u8>,
}

impl Pixmap {
    /// Bytes per pixel.
    pub fn components(&self) -> usize {
        self.colorspace.channels() + usize::from(self.alpha)
    }

    /// Convert into an `image` buffer of the matching pixel type.
    pub fn to_image(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let samples = self.samples.clone();
        let image = match (self.colorspace, self.alpha) {
            (Colorspace::Gray, false) => {
                ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageLuma8)
            }
            (Colorspace::Gray, true) => {
                ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageLumaA8)
            }
            (Colorspace::Rgb, false) => {
                ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageRgb8)
            }
            (Colorspace::Rgb, true) => {
                ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageRgba8)
            }
        };
        image.ok_or_else(|| Error::InvalidArgument {
            reason: format!(
                "{} sample bytes do not fill a {}x{} pixmap with {} components",
                self.samples.len(),
                w,
                h,
                self.components()
            ),
        })
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let image = self.to_image()?;
        let mut png_bytes = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)?;
        Ok(png_bytes)
    }
}

/// One character of extracted text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChar {
    pub c: char,
    pub bbox: Rect,
}

/// One line of extracted text, characters in reading order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLine {
    pub bbox: Rect,
    pub chars: Vec<TextChar>,
    /// A trailing hyphen was removed; the line continues on the next one.
    pub hyphenated: bool,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.c).collect()
    }
}

/// Paragraph-like group of lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub bbox: Rect,
    pub lines: Vec<TextLine>,
}

/// Word with its bounding box
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    pub bbox: Rect,
}

/// Structured text of a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPage {
    pub bounds: Rect,
    pub blocks: Vec<TextBlock>,
}

impl TextPage {
    /// Plain text: lines separated by newlines, blocks by a blank line.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                result.push('\n');
            }
            for line in &block.lines {
                result.push_str(&line.text());
                if !line.hyphenated {
                    result.push('\n');
                }
            }
        }
        result.trim_end().to_string()
    }

    /// Whitespace-separated words of every line.
    pub fn words(&self) -> Vec<Word> {
        let mut words = Vec::new();
        for line in self.blocks.iter().flat_map(|b| b.lines.iter()) {
            let mut text = String::new();
            let mut bbox = Rect::EMPTY;
            for ch in &line.chars {
                if ch.c.is_whitespace() {
                    if !text.is_empty() {
                        words.push(Word {
                            text: std::mem::take(&mut text),
                            bbox,
                        });
                    }
                    bbox = Rect::EMPTY;
                } else {
                    text.push(ch.c);
                    bbox = bbox.union(&ch.bbox);
                }
            }
            if !text.is_empty() {
                words.push(Word { text, bbox });
            }
        }
        words
    }

    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| b.lines.len()).sum()
    }
}
