//! The two operations behind the HTTP surface: initialize the template and
//! stamp text onto it.

use crate::rendering::{render_markup, Compositor, FontLibrary, RenderedImage};
use crate::template::{TemplateCache, TemplateStatus};
use crate::{Error, Result, ServerConfig, StyleOptions};

pub struct StampService {
    templates: TemplateCache,
    compositor: Compositor,
}

impl StampService {
    /// Build a service from configuration, loading fonts up front.
    pub fn new(config: &ServerConfig) -> Self {
        let fonts = FontLibrary::load(&config.font_dirs, !config.skip_system_fonts);
        Self::with_parts(TemplateCache::new(&config.template_path), Compositor::new(fonts))
    }

    pub fn with_parts(templates: TemplateCache, compositor: Compositor) -> Self {
        Self { templates, compositor }
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    /// Load or synthesize the template if needed.
    pub fn check_template(&self) -> Result<TemplateStatus> {
        self.templates.ensure()
    }

    /// Stamp `text` onto the template.
    ///
    /// Fails with [`Error::NotInitialized`] until [`check_template`](Self::check_template)
    /// has succeeded once.
    pub fn generate(&self, text: &str, style: &StyleOptions) -> Result<RenderedImage> {
        if text.trim().is_empty() {
            return Err(Error::ValidationError(crate::request::TEXT_REQUIRED.into()));
        }
        let template = self.templates.get().ok_or(Error::NotInitialized)?;
        let markup = render_markup(text, style, template.dimensions());
        self.compositor.composite(&template, &markup)
    }
}
