//! Text layout: greedy word wrap and vertical placement.
//!
//! Glyph widths are not measured. The wrap width assumes an average glyph
//! is `0.6 * font_size` wide, so wrapping is approximate and depends on the
//! font the rasterizer ends up using.

use crate::{CanvasDimensions, HorizontalAlign, StyleOptions, VerticalPosition};

/// Average glyph width as a fraction of the font size
pub const GLYPH_WIDTH_RATIO: f64 = 0.6;
/// Line height as a multiple of the font size
pub const LINE_HEIGHT_RATIO: f64 = 1.2;
/// Gap kept between the text block and the top/bottom edge
pub const EDGE_MARGIN: f64 = 50.0;

/// One wrapped line: words joined by single spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub y: f64,
}

impl TextLine {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub lines: Vec<TextLine>,
    pub max_line_chars: usize,
    pub line_height: f64,
    pub total_height: f64,
    pub start_y: f64,
    /// Anchor x shared by every line
    pub anchor_x: f64,
    pub align: HorizontalAlign,
}

impl LayoutResult {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// All words in output order.
    pub fn words(&self) -> Vec<&str> {
        self.lines.iter().flat_map(|l| l.words()).collect()
    }
}

/// Maximum characters per line for a canvas width and font size.
pub fn max_line_chars(canvas_width: u32, font_size_pt: u32) -> usize {
    let glyph = font_size_pt as f64 * GLYPH_WIDTH_RATIO;
    if glyph <= 0.0 {
        return usize::MAX;
    }
    (canvas_width as f64 / glyph).floor() as usize
}

/// Greedy fill of whitespace-separated words into lines of at most
/// `max_chars` characters. A word longer than `max_chars` gets a line of
/// its own and is never split.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if cur.is_empty() {
            cur.push_str(word);
            cur_len = word_len;
        } else if cur_len + 1 + word_len <= max_chars {
            cur.push(' ');
            cur.push_str(word);
            cur_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut cur));
            cur.push_str(word);
            cur_len = word_len;
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// First-line baseline for a block of `total_height` on a canvas of `canvas_height`.
pub fn start_y(
    position: VerticalPosition,
    font_size_pt: u32,
    total_height: f64,
    canvas_height: u32,
) -> f64 {
    let font_size = font_size_pt as f64;
    let canvas_height = canvas_height as f64;
    // Not clamped: oversized blocks may run off the canvas.
    match position {
        VerticalPosition::Top => font_size + EDGE_MARGIN,
        VerticalPosition::Bottom => canvas_height - total_height - EDGE_MARGIN,
        VerticalPosition::Middle => (canvas_height - total_height) / 2.0 + font_size,
    }
}

/// Wrap `text` and position every line on the canvas.
///
/// Blank text yields an empty layout; callers reject it before getting here.
pub fn layout(text: &str, style: &StyleOptions, canvas: CanvasDimensions) -> LayoutResult {
    let max_chars = max_line_chars(canvas.width, style.font_size_pt);
    let wrapped = wrap_words(text, max_chars);

    let line_height = style.font_size_pt as f64 * LINE_HEIGHT_RATIO;
    let total_height = wrapped.len() as f64 * line_height;
    let first_y = start_y(
        style.vertical_position,
        style.font_size_pt,
        total_height,
        canvas.height,
    );

    let lines: Vec<TextLine> = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextLine {
            text,
            y: first_y + i as f64 * line_height,
        })
        .collect();

    log::debug!(
        "layout: {} line(s), wrap width {} chars, start y {}",
        lines.len(),
        max_chars,
        first_y
    );

    LayoutResult {
        lines,
        max_line_chars: max_chars,
        line_height,
        total_height,
        start_y: first_y,
        anchor_x: canvas.width as f64 / 2.0,
        align: style.horizontal_align,
    }
}
