use crate::adb::AdbError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for automation operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// The error type for screen, matcher and device-controller operations.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Configuration error: {description}")]
    Configuration { description: String },

    #[error("Template '{name}' could not be decoded from {path:?}: {source}")]
    TemplateDecode {
        name: String,
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Device unavailable: {source}")]
    DeviceUnavailable {
        #[from]
        source: AdbError,
    },

    #[error("Device returned an unusable frame: {description}")]
    BadFrame { description: String },

    #[error("FindFailed: '{template}' {detail}")]
    FindFailed { template: String, detail: String },

    #[error("Character {character:?} has no key mapping ({skipped} character(s) skipped in total)")]
    UnsupportedInput { character: char, skipped: usize },

    #[error("Unsupported key '{key}'")]
    UnsupportedKey { key: String },

    #[error("Failed to write image to {path:?}: {source}")]
    ImageWrite {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl VisionError {
    pub fn configuration(description: impl Into<String>) -> Self {
        VisionError::Configuration {
            description: description.into(),
        }
    }

    pub(crate) fn not_found_within(template: &str, timeout: Duration) -> Self {
        VisionError::FindFailed {
            template: template.to_string(),
            detail: format!("not found within {timeout:?}"),
        }
    }

    pub(crate) fn missing_asset(template: &str, path: &std::path::Path) -> Self {
        VisionError::FindFailed {
            template: template.to_string(),
            detail: format!("has no image file at {}", path.display()),
        }
    }

    /// The expected, recoverable "template not there" outcome
    pub fn is_find_failed(&self) -> bool {
        matches!(self, VisionError::FindFailed { .. })
    }

    /// Transport failure or an unusable frame from the device
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            VisionError::DeviceUnavailable { .. } | VisionError::BadFrame { .. }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VisionError::Configuration { .. } | VisionError::TemplateDecode { .. }
        )
    }
}
