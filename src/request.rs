//! Request bodies for `/generate` and their coercion into [`StyleOptions`].
//!
//! The browser form posts every field as a string while API clients send
//! JSON numbers, so parsing here is lenient: anything unusable falls back to
//! its default (with a warning) instead of failing the request. Only missing
//! text is an error.

use serde::Deserialize;

use crate::{
    Error, HorizontalAlign, Result, StyleOptions, VerticalPosition, DEFAULT_COLOR_HEX,
    DEFAULT_FONT_SIZE_PT,
};

pub const TEXT_REQUIRED: &str = "Text is required";

/// `fontSize` as sent by clients: a JSON number or a form string like `"48"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FontSizeField {
    Number(f64),
    Text(String),
}

impl FontSizeField {
    /// Positive integer font size, truncating like a leading-integer parse.
    pub fn to_points(&self) -> Option<u32> {
        let value = match self {
            FontSizeField::Number(n) if n.is_finite() => n.trunc(),
            FontSizeField::Number(_) => return None,
            FontSizeField::Text(s) => parse_leading_int(s)? as f64,
        };
        if value >= 1.0 {
            Some(value.min(u32::MAX as f64) as u32)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub font_size: Option<FontSizeField>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub align: Option<String>,
}

impl GenerateRequest {
    /// Parse a body according to its `Content-Type`.
    ///
    /// Form-encoded bodies are decoded as such; anything else is treated as
    /// JSON. An empty body parses to an empty request.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Self> {
        let is_form = content_type
            .map(|ct| {
                ct.trim()
                    .to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            })
            .unwrap_or(false);

        if is_form {
            return Ok(Self::from_form(body));
        }
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| Error::ValidationError(format!("Invalid request body: {}", e)))
    }

    pub fn from_form(body: &[u8]) -> Self {
        let mut req = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            let value = value.into_owned();
            match key.as_ref() {
                "text" => req.text = Some(value),
                "fontSize" => req.font_size = Some(FontSizeField::Text(value)),
                "color" => req.color = Some(value),
                "position" => req.position = Some(value),
                "align" => req.align = Some(value),
                _ => {}
            }
        }
        req
    }

    /// Validate the text and resolve every option to a concrete value.
    pub fn into_parts(self) -> Result<(String, StyleOptions)> {
        let text = match self.text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(Error::ValidationError(TEXT_REQUIRED.into())),
        };

        let font_size_pt = match &self.font_size {
            None => DEFAULT_FONT_SIZE_PT,
            Some(field) => field.to_points().unwrap_or_else(|| {
                log::warn!("ignoring invalid fontSize {:?}", field);
                DEFAULT_FONT_SIZE_PT
            }),
        };

        let color_hex = match self.color {
            None => DEFAULT_COLOR_HEX.to_string(),
            Some(c) if is_hex_color(c.trim()) => c.trim().to_string(),
            Some(c) => {
                log::warn!("ignoring invalid color {:?}", c);
                DEFAULT_COLOR_HEX.to_string()
            }
        };

        let style = StyleOptions {
            font_size_pt,
            color_hex,
            vertical_position: self
                .position
                .as_deref()
                .map(VerticalPosition::parse_lenient)
                .unwrap_or_default(),
            horizontal_align: self
                .align
                .as_deref()
                .map(HorizontalAlign::parse_lenient)
                .unwrap_or_default(),
        };
        Ok((text.trim().to_string(), style))
    }
}

/// `#RGB` or `#RRGGBB`
pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Leading signed integer of `s`, ignoring leading whitespace and any trailing junk.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}
