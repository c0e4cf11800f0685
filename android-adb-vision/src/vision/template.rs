//! Template loading and the per-screen template cache

use super::region::Region;
use crate::error::{VisionError, VisionResult};
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A named reference image, stored grayscale for matching
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    path: PathBuf,
    image: GrayImage,
}

impl Template {
    /// Load a template from disk.
    ///
    /// A file name carrying `[x,y,width,height]` (e.g. `img-[300,1682,50,50].png`)
    /// holds a full screenshot; only that rectangle becomes the template.
    pub fn load(name: &str, path: &Path) -> VisionResult<Self> {
        let image = image::open(path).map_err(|source| VisionError::TemplateDecode {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

        let image = match Region::parse_from_filename(name) {
            Some(crop) => {
                if crop.is_empty() || crop.right() > image.width() || crop.bottom() > image.height() {
                    return Err(VisionError::configuration(format!(
                        "Template crop region {} exceeds image bounds ({}x{}) for '{}'",
                        crop,
                        image.width(),
                        image.height(),
                        name
                    )));
                }
                log::debug!("Cropping template '{}' to {}", name, crop);
                image
                    .crop_imm(crop.x, crop.y, crop.width, crop.height)
                    .to_luma8()
            }
            None => image.to_luma8(),
        };

        Self::from_image(name, path, image)
    }

    pub fn from_image(name: &str, path: &Path, image: GrayImage) -> VisionResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::configuration(format!(
                "Template '{name}' is empty"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            image,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Templates resolved against a bundle directory, cached by resolved path
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    cache: HashMap<PathBuf, Arc<Template>>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` inside `bundle_path`.
    ///
    /// No bundle path is a configuration error. A file missing from the
    /// bundle is `FindFailed`: the template simply is not there.
    pub fn resolve(&mut self, bundle_path: Option<&Path>, name: &str) -> VisionResult<Arc<Template>> {
        let bundle = bundle_path.ok_or_else(|| {
            VisionError::configuration(format!(
                "BundlePath is not set; cannot resolve template '{name}'"
            ))
        })?;
        let path = bundle.join(name);

        if let Some(template) = self.cache.get(&path) {
            return Ok(Arc::clone(template));
        }
        if !path.is_file() {
            log::debug!("Template '{}' not present at {}", name, path.display());
            return Err(VisionError::missing_asset(name, &path));
        }

        let template = Arc::new(Template::load(name, &path)?);
        log::debug!(
            "Loaded template '{}' ({}x{}) from {}",
            name,
            template.width(),
            template.height(),
            path.display()
        );
        self.cache.insert(path, Arc::clone(&template));
        Ok(template)
    }

    /// Get template count
    pub fn count(&self) -> usize {
        self.cache.len()
    }
}
