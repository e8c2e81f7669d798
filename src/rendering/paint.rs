//! Paint commands and their SVG serialization
//!
//! Everything user-controlled is escaped while the markup is built, so the
//! rasterizer never sees raw `< > & ' "` from request input.

use super::layout::{layout, LayoutResult};
use crate::{CanvasDimensions, HorizontalAlign, StyleOptions};

pub const FONT_FAMILY: &str = "Arial, sans-serif";
pub const FONT_WEIGHT: &str = "bold";

/// SVG `text-anchor` mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

impl From<HorizontalAlign> for TextAnchor {
    fn from(align: HorizontalAlign) -> Self {
        match align {
            HorizontalAlign::Left => TextAnchor::Start,
            HorizontalAlign::Center => TextAnchor::Middle,
            HorizontalAlign::Right => TextAnchor::End,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    Text {
        x: f64,
        y: f64,
        anchor: TextAnchor,
        fill: String,
        font_size: u32,
        text: String,
    },
}

impl LayoutResult {
    /// One text command per line, all anchored at `anchor_x`.
    pub fn paint_commands(&self, style: &StyleOptions) -> Vec<PaintCommand> {
        let anchor = TextAnchor::from(self.align);
        self.lines
            .iter()
            .map(|line| PaintCommand::Text {
                x: self.anchor_x,
                y: line.y,
                anchor,
                fill: style.color_hex.clone(),
                font_size: style.font_size_pt,
                text: line.text.clone(),
            })
            .collect()
    }
}

/// Replace XML-reserved characters with their entities.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize paint commands into an SVG document sized to `canvas`.
pub fn to_svg(commands: &[PaintCommand], canvas: CanvasDimensions) -> String {
    let elements: Vec<String> = commands
        .iter()
        .map(|cmd| match cmd {
            PaintCommand::Text { x, y, anchor, fill, font_size, text } => format!(
                r#"<text x="{}" y="{}" text-anchor="{}" fill="{}" font-size="{}" font-family="{}" font-weight="{}">{}</text>"#,
                x,
                y,
                anchor.as_str(),
                escape_xml(fill),
                font_size,
                FONT_FAMILY,
                FONT_WEIGHT,
                escape_xml(text)
            ),
        })
        .collect();

    format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n  {}\n</svg>",
        canvas.width,
        canvas.height,
        elements.join("\n    ")
    )
}

/// Layout, paint and serialize in one step.
pub fn render_markup(text: &str, style: &StyleOptions, canvas: CanvasDimensions) -> String {
    let result = layout(text, style, canvas);
    to_svg(&result.paint_commands(style), canvas)
}
