//! Textstamp
//!
//! Stamps user-supplied text onto a fixed template image and returns the
//! result as PNG bytes. Text is wrapped with a character-width heuristic,
//! placed according to a vertical position policy, serialized to SVG and
//! rasterized over the template.
//!
//! # Features
//!
//! - **Layout**: greedy word wrap sized from the canvas width and font size
//! - **Compositing**: SVG overlay rendered with `resvg` onto a copy of the template
//! - **HTTP**: a small `tiny_http` server exposing `/check-template` and `/generate`
//!
//! # Example
//!
//! ```no_run
//! use textstamp::{ServerConfig, StampService, StyleOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = StampService::new(&ServerConfig::default());
//! service.check_template()?;
//! let image = service.generate("Hello world", &StyleOptions::default())?;
//! std::fs::write("hello.png", &image.png_data)?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

// Layout, markup and rasterization
pub mod rendering;

// Process-wide template slot
pub mod template;

// Loosely-typed request bodies coerced into `StyleOptions`
pub mod request;

pub mod service;
pub use service::StampService;

pub mod server;

// Async-friendly facade (worker-thread backed)
pub mod async_api;
pub use async_api::Stamper;

/// Vertical placement of the text block on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalPosition {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl VerticalPosition {
    /// Parse a request value; anything unrecognised falls back to `Middle`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => VerticalPosition::Top,
            "bottom" => VerticalPosition::Bottom,
            _ => VerticalPosition::Middle,
        }
    }
}

/// Horizontal alignment of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl HorizontalAlign {
    /// Parse a request value; anything unrecognised falls back to `Center`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => HorizontalAlign::Left,
            "right" => HorizontalAlign::Right,
            _ => HorizontalAlign::Center,
        }
    }
}

/// Styling applied to a single generate request.
///
/// Constructed once per request at the HTTP boundary (see
/// [`request::GenerateRequest`]) and never mutated afterwards.
///
/// # Examples
///
/// ```
/// let style = textstamp::StyleOptions::default();
/// assert_eq!(style.font_size_pt, 48);
/// assert_eq!(style.color_hex, "#FFFFFF");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StyleOptions {
    /// Font size in points, always positive
    pub font_size_pt: u32,
    /// Fill color as `#RGB` or `#RRGGBB`
    pub color_hex: String,
    /// Where the text block sits vertically
    pub vertical_position: VerticalPosition,
    /// Text anchor mode for every line
    pub horizontal_align: HorizontalAlign,
}

pub const DEFAULT_FONT_SIZE_PT: u32 = 48;
pub const DEFAULT_COLOR_HEX: &str = "#FFFFFF";

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            font_size_pt: DEFAULT_FONT_SIZE_PT,
            color_hex: DEFAULT_COLOR_HEX.to_string(),
            vertical_position: VerticalPosition::default(),
            horizontal_align: HorizontalAlign::default(),
        }
    }
}

/// Canvas dimensions, always taken from the template image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasDimensions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Configuration for the HTTP server and the service behind it
///
/// The defaults mirror a typical deployment: listen on every interface at
/// port 9000, read the template from `public/template.png` and serve the
/// browser form from `public/`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind (0 picks a free port)
    pub port: u16,
    /// Optional template image on disk; synthesized in memory when missing
    pub template_path: PathBuf,
    /// Directory with the static browser client, if any
    pub public_dir: Option<PathBuf>,
    /// Extra font directories loaded on top of the system fonts
    pub font_dirs: Vec<PathBuf>,
    /// Whether to skip system font discovery (tests, minimal containers)
    pub skip_system_fonts: bool,
    /// Number of request-handling threads
    pub workers: usize,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
    /// Initialize the template at startup instead of on the first `/check-template`
    pub eager_template: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            template_path: PathBuf::from("public/template.png"),
            public_dir: Some(PathBuf::from("public")),
            font_dirs: Vec::new(),
            skip_system_fonts: false,
            workers: num_cpus::get().max(1),
            max_body_bytes: 1024 * 1024,
            eager_template: false,
        }
    }
}

impl ServerConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::ConfigError("workers must be at least 1".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::ConfigError("max_body_bytes must be positive".into()));
        }
        Ok(())
    }

    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
