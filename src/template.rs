//! The process-wide template slot.
//!
//! The template is loaded (or synthesized) at most once. A single mutex is
//! held across the check-then-set so concurrent first callers cannot both
//! initialize it, and nobody observes a half-built image. A failed
//! initialization leaves the slot empty so a later call can retry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::rendering::BaseImage;
use crate::Result;

/// Size of the synthesized template
pub const DEFAULT_TEMPLATE_WIDTH: u32 = 800;
pub const DEFAULT_TEMPLATE_HEIGHT: u32 = 600;
/// Background of the synthesized template (indigo)
pub const DEFAULT_TEMPLATE_RGB: (u8, u8, u8) = (99, 102, 241);

/// Outcome of [`TemplateCache::ensure`]
#[derive(Debug, Clone)]
pub struct TemplateStatus {
    pub image: Arc<BaseImage>,
    /// True only on the call that synthesized the default template
    pub created: bool,
}

pub struct TemplateCache {
    path: PathBuf,
    slot: Mutex<Option<Arc<BaseImage>>>,
    initializations: AtomicUsize,
}

impl TemplateCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: Mutex::new(None),
            initializations: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached template, if initialized.
    pub fn get(&self) -> Option<Arc<BaseImage>> {
        self.lock().clone()
    }

    /// Return the template, loading or synthesizing it on first use.
    pub fn ensure(&self) -> Result<TemplateStatus> {
        let mut slot = self.lock();
        if let Some(image) = slot.as_ref() {
            return Ok(TemplateStatus {
                image: image.clone(),
                created: false,
            });
        }

        let (image, created) = if self.path.exists() {
            let image = BaseImage::from_file(&self.path)?;
            log::info!(
                "loaded template {} ({}x{})",
                self.path.display(),
                image.width(),
                image.height()
            );
            (image, false)
        } else {
            let image = BaseImage::solid(
                DEFAULT_TEMPLATE_WIDTH,
                DEFAULT_TEMPLATE_HEIGHT,
                DEFAULT_TEMPLATE_RGB,
            )?;
            log::info!(
                "no template at {}, synthesized {}x{} default",
                self.path.display(),
                DEFAULT_TEMPLATE_WIDTH,
                DEFAULT_TEMPLATE_HEIGHT
            );
            (image, true)
        };

        let image = Arc::new(image);
        *slot = Some(image.clone());
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(TemplateStatus { image, created })
    }

    /// How many times the template was actually loaded or synthesized.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<BaseImage>>> {
        // The slot only ever goes from None to Some, so a poisoned guard is still consistent.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
