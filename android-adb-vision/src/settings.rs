//! Engine configuration owned by a [`Screen`](crate::screen::Screen)

use crate::error::{VisionError, VisionResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_AUTO_WAIT_TIMEOUT: Duration = Duration::from_secs(3);

pub const ENV_BUNDLE_PATH: &str = "ADB_VISION_BUNDLE_PATH";
pub const ENV_AUTO_WAIT_TIMEOUT: &str = "ADB_VISION_AUTO_WAIT_TIMEOUT";
pub const ENV_MOVE_MOUSE_DELAY: &str = "ADB_VISION_MOVE_MOUSE_DELAY";

/// Where templates live and how long implicit waits take.
///
/// Changes apply to every later operation on the owning screen; nothing
/// resets them behind the caller's back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory template names are resolved against
    pub bundle_path: Option<PathBuf>,
    /// Spacing between the motion events of a drag
    pub move_mouse_delay: Duration,
    /// Upper bound for every implicit wait (`find`, `click`, ...)
    pub auto_wait_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bundle_path: None,
            move_mouse_delay: Duration::ZERO,
            auto_wait_timeout: DEFAULT_AUTO_WAIT_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `ADB_VISION_*` environment variables
    pub fn from_env() -> VisionResult<Self> {
        let mut settings = Self::default();
        if let Ok(path) = env::var(ENV_BUNDLE_PATH)
            && !path.trim().is_empty()
        {
            settings.bundle_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = env_seconds(ENV_AUTO_WAIT_TIMEOUT)? {
            settings.set_auto_wait_timeout(secs)?;
        }
        if let Some(secs) = env_seconds(ENV_MOVE_MOUSE_DELAY)? {
            settings.set_move_mouse_delay(secs)?;
        }
        Ok(settings)
    }

    pub fn with_bundle_path(mut self, path: impl AsRef<Path>) -> Self {
        self.bundle_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn set_bundle_path(&mut self, path: impl AsRef<Path>) {
        self.bundle_path = Some(path.as_ref().to_path_buf());
    }

    pub fn bundle_path(&self) -> Option<&Path> {
        self.bundle_path.as_deref()
    }

    /// Seconds, fractional allowed. Negative or non-finite values are rejected.
    pub fn set_auto_wait_timeout(&mut self, secs: f64) -> VisionResult<()> {
        self.auto_wait_timeout = seconds("AutoWaitTimeout", secs)?;
        Ok(())
    }

    pub fn set_move_mouse_delay(&mut self, secs: f64) -> VisionResult<()> {
        self.move_mouse_delay = seconds("MoveMouseDelay", secs)?;
        Ok(())
    }
}

fn seconds(setting: &str, secs: f64) -> VisionResult<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(VisionError::configuration(format!(
            "{setting} must be a non-negative number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| VisionError::configuration(format!("{setting} out of range: {e}")))
}

fn env_seconds(var: &str) -> VisionResult<Option<f64>> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| VisionError::configuration(format!("{var}='{raw}' is not a number of seconds"))),
        _ => Ok(None),
    }
}
