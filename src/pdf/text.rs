//! Structured text assembly from positioned characters

use crate::backend::TextOptions;
use crate::geometry::Rect;
use crate::model::{TextBlock, TextChar, TextLine, TextPage};

/// Character as reported by the library, in y-down page space
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawChar {
    pub c: char,
    pub bbox: Rect,
}

/// Line spacing multiplier that starts a new block
const PARAGRAPH_THRESHOLD: f32 = 1.5;

/// Assemble characters into blocks of lines, honouring `options`.
pub(crate) fn build_text_page(chars: Vec<RawChar>, bounds: Rect, options: &TextOptions) -> TextPage {
    let chars: Vec<RawChar> = chars
        .into_iter()
        .filter(|ch| !options.mediabox_clip() || inside(&ch.bbox, &bounds))
        .flat_map(|ch| normalize(ch, options))
        .collect();

    if chars.is_empty() {
        return TextPage {
            bounds,
            blocks: Vec::new(),
        };
    }

    let (y_tolerance, space_threshold) = dynamic_thresholds(&chars);
    let lines: Vec<TextLine> = group_into_lines(chars, y_tolerance)
        .into_iter()
        .filter_map(|line| finish_line(line, space_threshold, options))
        .collect();

    let mut blocks = group_into_blocks(lines);
    if options.dehyphenate() {
        for block in &mut blocks {
            dehyphenate(block);
        }
    }

    TextPage { bounds, blocks }
}

fn inside(bbox: &Rect, bounds: &Rect) -> bool {
    let (cx, cy) = bbox.center();
    cx >= bounds.x0 && cx <= bounds.x1 && cy >= bounds.y0 && cy <= bounds.y1
}

fn ligature_expansion(c: char) -> Option<&'static str> {
    match c {
        '\u{FB00}' => Some("ff"),
        '\u{FB01}' => Some("fi"),
        '\u{FB02}' => Some("fl"),
        '\u{FB03}' => Some("ffi"),
        '\u{FB04}' => Some("ffl"),
        '\u{FB05}' | '\u{FB06}' => Some("st"),
        _ => None,
    }
}

/// Apply whitespace and ligature options to one character.
fn normalize(ch: RawChar, options: &TextOptions) -> Vec<RawChar> {
    if !options.preserve_whitespace() && ch.c.is_whitespace() {
        return vec![RawChar { c: ' ', ..ch }];
    }

    if !options.preserve_ligatures() {
        if let Some(expanded) = ligature_expansion(ch.c) {
            let n = expanded.chars().count() as f32;
            let step = ch.bbox.width() / n;
            return expanded
                .chars()
                .enumerate()
                .map(|(i, c)| RawChar {
                    c,
                    bbox: Rect::new(
                        ch.bbox.x0 + step * i as f32,
                        ch.bbox.y0,
                        ch.bbox.x0 + step * (i as f32 + 1.0),
                        ch.bbox.y1,
                    ),
                })
                .collect();
        }
    }

    vec![ch]
}

/// Line-grouping tolerance and word-gap threshold from the median glyph height
fn dynamic_thresholds(chars: &[RawChar]) -> (f32, f32) {
    let mut heights: Vec<f32> = chars
        .iter()
        .map(|c| c.bbox.height())
        .filter(|h| *h > 0.0)
        .collect();

    if heights.is_empty() {
        return (5.0, 10.0);
    }

    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_height = heights[heights.len() / 2];

    let y_tolerance = median_height * 0.4;
    let space_threshold = median_height * 0.3;

    (y_tolerance.max(2.0), space_threshold.max(3.0))
}

fn group_into_lines(mut chars: Vec<RawChar>, y_tolerance: f32) -> Vec<Vec<RawChar>> {
    chars.sort_by(|a, b| {
        a.bbox
            .y0
            .partial_cmp(&b.bbox.y0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bbox
                    .x0
                    .partial_cmp(&b.bbox.x0)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut lines: Vec<Vec<RawChar>> = Vec::new();
    let mut current: Vec<RawChar> = Vec::new();
    let mut current_y: Option<f32> = None;

    for ch in chars {
        match current_y {
            Some(y) if (ch.bbox.y0 - y).abs() <= y_tolerance => current.push(ch),
            _ => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_y = Some(ch.bbox.y0);
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Order a line left to right, insert gap spaces and trim. Lines with no
/// visible characters are dropped.
fn finish_line(mut chars: Vec<RawChar>, space_threshold: f32, options: &TextOptions) -> Option<TextLine> {
    chars.sort_by(|a, b| {
        a.bbox
            .x0
            .partial_cmp(&b.bbox.x0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out: Vec<TextChar> = Vec::with_capacity(chars.len());
    for ch in chars {
        if let Some(prev) = out.last() {
            let gap = ch.bbox.x0 - prev.bbox.x1;
            let needs_space = !options.inhibit_spaces()
                && gap > space_threshold
                && !prev.c.is_whitespace()
                && !ch.c.is_whitespace();
            if needs_space {
                let bbox = Rect::new(prev.bbox.x1, prev.bbox.y0, ch.bbox.x0, prev.bbox.y1);
                out.push(TextChar { c: ' ', bbox });
            }
        }

        let collapse = !options.preserve_whitespace()
            && ch.c == ' '
            && out.last().map_or(true, |prev| prev.c == ' ');
        if !collapse {
            out.push(TextChar {
                c: ch.c,
                bbox: ch.bbox,
            });
        }
    }

    if !options.preserve_whitespace() {
        while out.last().is_some_and(|c| c.c == ' ') {
            out.pop();
        }
    }

    if out.iter().all(|c| c.c.is_whitespace()) {
        return None;
    }

    let bbox = out
        .iter()
        .filter(|c| !c.c.is_whitespace())
        .fold(Rect::EMPTY, |acc, c| acc.union(&c.bbox));

    Some(TextLine {
        bbox,
        chars: out,
        hyphenated: false,
    })
}

/// Split lines into blocks where the vertical gap exceeds normal spacing.
fn group_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut prev: Option<Rect> = None;

    for line in lines {
        let starts_block = match prev {
            Some(p) => {
                let line_gap = line.bbox.y0 - p.y0;
                let normal_gap = p.height().max(line.bbox.height());
                line_gap > normal_gap * PARAGRAPH_THRESHOLD
            }
            None => true,
        };

        prev = Some(line.bbox);
        match blocks.last_mut() {
            Some(block) if !starts_block => {
                block.bbox = block.bbox.union(&line.bbox);
                block.lines.push(line);
            }
            _ => blocks.push(TextBlock {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    blocks
}

fn is_hyphen(c: char) -> bool {
    matches!(c, '-' | '\u{00AD}' | '\u{2010}')
}

/// Remove the trailing hyphen of a word broken across lines.
fn dehyphenate(block: &mut TextBlock) {
    let count = block.lines.len();
    for line in block.lines.iter_mut().take(count.saturating_sub(1)) {
        let n = line.chars.len();
        if n >= 2 && is_hyphen(line.chars[n - 1].c) && line.chars[n - 2].c.is_alphabetic() {
            line.chars.pop();
            line.hyphenated = true;
        }
    }
}
