//! Rendering pipeline: text layout, SVG markup and rasterization

pub mod layout;
pub mod paint;
pub mod raster;

pub use layout::{layout, LayoutResult, TextLine};
pub use paint::{escape_xml, render_markup, to_svg, PaintCommand, TextAnchor};
pub use raster::{BaseImage, Compositor, FontLibrary, SANS_FALLBACKS};

use sha2::{Digest, Sha256};

/// A composited image ready to be sent to a client.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl RenderedImage {
    /// Hex-encoded SHA-256 of the PNG bytes.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.png_data))
    }
}
