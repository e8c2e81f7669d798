//! Rasterization: template images, fonts and the SVG compositor

use std::path::{Path, PathBuf};
use std::sync::Arc;

use resvg::tiny_skia::{self, Pixmap, Transform};
use resvg::usvg::{self, fontdb};

use crate::rendering::RenderedImage;
use crate::{CanvasDimensions, Error, Result};

/// A decoded raster image. Never mutated once built; compositing works on a copy.
#[derive(Debug, Clone)]
pub struct BaseImage {
    pixmap: Pixmap,
}

impl BaseImage {
    /// Decode and validate PNG bytes.
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let pixmap = Pixmap::decode_png(bytes)
            .map_err(|e| Error::TemplateError(format!("Invalid template image: {}", e)))?;
        Ok(Self { pixmap })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_png(&bytes)
    }

    /// A solid, opaque canvas.
    pub fn solid(width: u32, height: u32, rgb: (u8, u8, u8)) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::TemplateError(format!("Cannot allocate a {}x{} canvas", width, height))
        })?;
        pixmap.fill(tiny_skia::Color::from_rgba8(rgb.0, rgb.1, rgb.2, 255));
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn dimensions(&self) -> CanvasDimensions {
        CanvasDimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| Error::RenderError(format!("PNG encode failed: {}", e)))
    }
}

/// Families tried, in order, for `sans-serif` when Arial is missing.
pub const SANS_FALLBACKS: &[&str] = &[
    "Liberation Sans",
    "Arimo",
    "Helvetica",
    "DejaVu Sans",
    "Noto Sans",
    "FreeSans",
];

/// The font database handed to the SVG parser.
///
/// Built once and shared: system font discovery is slow and the set of
/// fonts does not change while the process runs.
#[derive(Clone)]
pub struct FontLibrary {
    db: Arc<fontdb::Database>,
}

impl FontLibrary {
    pub fn load(font_dirs: &[PathBuf], system_fonts: bool) -> Self {
        let mut db = fontdb::Database::new();
        if system_fonts {
            db.load_system_fonts();
        }
        for dir in font_dirs {
            db.load_fonts_dir(dir);
        }

        // Markup asks for "Arial, sans-serif"; without Arial, route the
        // generic family to the closest installed sans face.
        if !has_family(&db, "Arial") {
            match pick_sans_family(&db, SANS_FALLBACKS) {
                Some(name) => {
                    log::info!("Arial not found, using '{}' for sans-serif", name);
                    db.set_sans_serif_family(name);
                }
                None => {
                    log::warn!("No fonts available; text will not be visible in generated images")
                }
            }
        }

        log::debug!("font library loaded with {} face(s)", db.len());
        Self { db: Arc::new(db) }
    }

    /// An empty library, for markup without text.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
        }
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Family of the face bold "Arial, sans-serif" text resolves to.
    pub fn resolved_family(&self) -> Option<String> {
        let query = fontdb::Query {
            families: &[fontdb::Family::Name("Arial"), fontdb::Family::SansSerif],
            weight: fontdb::Weight::BOLD,
            ..Default::default()
        };
        let id = self.db.query(&query)?;
        let face = self.db.face(id)?;
        face.families.first().map(|(name, _)| name.clone())
    }
}

fn has_family(db: &fontdb::Database, name: &str) -> bool {
    let query = fontdb::Query {
        families: &[fontdb::Family::Name(name)],
        ..Default::default()
    };
    db.query(&query).is_some()
}

/// Sans family to stand in for Arial.
///
/// Known metric-compatible families first, then any proportional face whose
/// family says "Sans", then whatever is installed.
fn pick_sans_family(db: &fontdb::Database, preferred: &[&str]) -> Option<String> {
    if let Some(name) = preferred.iter().find(|name| has_family(db, name)) {
        return Some(name.to_string());
    }

    let proportional_sans = db.faces().filter(|face| !face.monospaced).find_map(|face| {
        face.families
            .iter()
            .map(|(name, _)| name)
            .find(|name| name.contains("Sans") && !name.contains("Mono"))
            .cloned()
    });

    proportional_sans.or_else(|| {
        db.faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
    })
}

/// Overlays SVG markup on a base image and encodes the result as PNG.
#[derive(Clone)]
pub struct Compositor {
    fonts: FontLibrary,
}

impl Compositor {
    pub fn new(fonts: FontLibrary) -> Self {
        Self { fonts }
    }

    /// Render `markup` at the base image's size onto a copy of it.
    ///
    /// The output always has the same dimensions as `base`.
    pub fn composite(&self, base: &BaseImage, markup: &str) -> Result<RenderedImage> {
        let mut opt = usvg::Options::default();
        opt.fontdb = self.fonts.db.clone();
        if let Some(size) = usvg::Size::from_wh(base.width() as f32, base.height() as f32) {
            opt.default_size = size;
        }

        let tree = usvg::Tree::from_str(markup, &opt)
            .map_err(|e| Error::RenderError(format!("Invalid markup: {}", e)))?;

        let mut canvas = base.pixmap.clone();
        let tree_size = tree.size();
        let transform = Transform::from_scale(
            base.width() as f32 / tree_size.width(),
            base.height() as f32 / tree_size.height(),
        );
        resvg::render(&tree, transform, &mut canvas.as_mut());

        let png_data = canvas
            .encode_png()
            .map_err(|e| Error::RenderError(format!("PNG encode failed: {}", e)))?;

        log::debug!(
            "composited {}x{} image ({} bytes)",
            canvas.width(),
            canvas.height(),
            png_data.len()
        );

        Ok(RenderedImage {
            width: canvas.width(),
            height: canvas.height(),
            png_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_RECT: &str = r##"<svg width="4" height="4" xmlns="http://www.w3.org/2000/svg"><rect x="0" y="0" width="2" height="4" fill="#FF0000"/></svg>"##;

    #[test]
    fn solid_canvas_has_requested_size() {
        let img = BaseImage::solid(16, 8, (99, 102, 241)).expect("solid");
        assert_eq!(img.dimensions(), CanvasDimensions { width: 16, height: 8 });
        let px = img.pixmap().pixel(3, 3).expect("pixel");
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (99, 102, 241, 255));
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert!(matches!(BaseImage::solid(0, 10, (0, 0, 0)), Err(Error::TemplateError(_))));
    }

    #[test]
    fn png_roundtrip_preserves_size() {
        let img = BaseImage::solid(5, 7, (1, 2, 3)).unwrap();
        let decoded = BaseImage::from_png(&img.to_png().unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), img.dimensions());
    }

    #[test]
    fn garbage_png_is_a_template_error() {
        assert!(matches!(BaseImage::from_png(b"not a png"), Err(Error::TemplateError(_))));
    }

    #[test]
    fn composite_overlays_at_origin() {
        let base = BaseImage::solid(4, 4, (0, 0, 255)).unwrap();
        let out = Compositor::new(FontLibrary::empty()).composite(&base, RED_RECT).unwrap();
        assert_eq!((out.width, out.height), (4, 4));

        let decoded = BaseImage::from_png(&out.png_data).unwrap();
        let left = decoded.pixmap().pixel(0, 1).unwrap();
        let right = decoded.pixmap().pixel(3, 1).unwrap();
        assert_eq!((left.red(), left.blue()), (255, 0));
        assert_eq!((right.red(), right.blue()), (0, 255));
    }

    #[test]
    fn composite_leaves_base_untouched() {
        let base = BaseImage::solid(4, 4, (0, 0, 255)).unwrap();
        let before = base.to_png().unwrap();
        Compositor::new(FontLibrary::empty()).composite(&base, RED_RECT).unwrap();
        assert_eq!(base.to_png().unwrap(), before);
    }

    fn fixture(file: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fonts").join(file)
    }

    fn fixture_fonts(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            std::fs::copy(fixture(file), dir.path().join(file)).unwrap();
        }
        dir
    }

    // Faces are listed in load order.
    fn database(files: &[&str]) -> fontdb::Database {
        let mut db = fontdb::Database::new();
        for file in files {
            db.load_font_file(fixture(file)).unwrap();
        }
        db
    }

    #[test]
    fn sans_face_wins_over_serif_and_math() {
        let dir = fixture_fonts(&["DejaVuSerif.ttf", "DejaVuMathTeXGyre.ttf", "DejaVuSans-Bold.ttf"]);
        let fonts = FontLibrary::load(&[dir.path().to_path_buf()], false);
        assert_eq!(fonts.face_count(), 3);
        assert_eq!(fonts.resolved_family().as_deref(), Some("DejaVu Sans"));
    }

    #[test]
    fn unknown_sans_family_is_found_by_name() {
        let db = database(&["DejaVuSerif.ttf", "DejaVuMathTeXGyre.ttf", "DejaVuSans-Bold.ttf"]);
        assert_eq!(pick_sans_family(&db, &[]).as_deref(), Some("DejaVu Sans"));
        assert_eq!(pick_sans_family(&db, &["Liberation Sans"]).as_deref(), Some("DejaVu Sans"));
    }

    #[test]
    fn any_face_is_used_as_a_last_resort() {
        let db = database(&["DejaVuSerif.ttf"]);
        assert_eq!(pick_sans_family(&db, SANS_FALLBACKS).as_deref(), Some("DejaVu Serif"));
        assert_eq!(pick_sans_family(&fontdb::Database::new(), SANS_FALLBACKS), None);
        assert_eq!(FontLibrary::empty().resolved_family(), None);
    }

    #[test]
    fn malformed_markup_is_a_render_error() {
        let base = BaseImage::solid(4, 4, (0, 0, 0)).unwrap();
        let err = Compositor::new(FontLibrary::empty())
            .composite(&base, "<svg><text>unterminated")
            .unwrap_err();
        assert!(matches!(err, Error::RenderError(_)));
    }
}
