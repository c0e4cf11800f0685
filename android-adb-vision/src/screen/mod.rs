// Screen - the public automation verbs
// Binds one device to its settings, a matcher and a template cache. Every
// lookup resolves a template name against the bundle path, then polls the
// device until the template shows up or `auto_wait_timeout` runs out.

use crate::adb::{AdbBackend, AdbImpl, DeviceTransport};
use crate::device::Device;
use crate::error::{VisionError, VisionResult};
use crate::input::{KeyAction, KeyCode};
use crate::settings::Settings;
use crate::vision::{
    self, Frame, Match, PollState, Region, Template, TemplateLibrary, TemplateMatcher,
};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Upper bound on matches returned by [`Screen::find_all`]
pub const FIND_ALL_LIMIT: usize = 100;

pub struct Screen<T: DeviceTransport> {
    device: Device<T>,
    settings: Settings,
    matcher: TemplateMatcher,
    templates: TemplateLibrary,
    roi: Option<Region>,
    last_match: Option<Match>,
    last_matches: Option<Vec<Match>>,
}

impl Screen<AdbBackend> {
    /// Bind to the first device the chosen ADB implementation reports
    pub async fn connect(imp: AdbImpl, settings: Settings) -> VisionResult<Self> {
        let backend = AdbBackend::connect_first(imp).await?;
        Ok(Self::new(Device::new(backend), settings))
    }
}

impl<T: DeviceTransport> Screen<T> {
    pub fn new(device: Device<T>, settings: Settings) -> Self {
        Self {
            device,
            settings,
            matcher: TemplateMatcher::default(),
            templates: TemplateLibrary::new(),
            roi: None,
            last_match: None,
            last_matches: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes take effect on the next operation
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn device(&self) -> &Device<T> {
        &self.device
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Restrict searches to part of the screen; `None` searches everywhere
    pub fn set_roi(&mut self, roi: Option<Region>) {
        self.roi = roi;
    }

    pub fn roi(&self) -> Option<Region> {
        self.roi
    }

    /// Result of the most recent successful lookup, cleared when one fails
    pub fn last_match(&self) -> Option<Match> {
        self.last_match
    }

    /// Result of the most recent successful `find_all`, cleared when one fails
    pub fn last_matches(&self) -> Option<&[Match]> {
        self.last_matches.as_deref()
    }

    pub fn into_device(self) -> Device<T> {
        self.device
    }

    /// Full screen area, origin (0, 0)
    pub async fn get_bounds(&self) -> VisionResult<Region> {
        vision::bounds(self.device.transport()).await
    }

    pub async fn capture(&self) -> VisionResult<Frame> {
        vision::capture(self.device.transport()).await
    }

    /// Whether `name` appears within `auto_wait_timeout`.
    ///
    /// Only a failed lookup becomes `false`; configuration and device errors
    /// still propagate.
    pub async fn exists(&mut self, name: &str) -> VisionResult<bool> {
        let timeout = self.settings.auto_wait_timeout;
        match self.wait(name, timeout).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_find_failed() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Locate `name`, waiting up to `auto_wait_timeout`
    pub async fn find(&mut self, name: &str) -> VisionResult<Match> {
        let timeout = self.settings.auto_wait_timeout;
        self.wait(name, timeout).await
    }

    /// Locate `name`, waiting up to `timeout`
    pub async fn wait(&mut self, name: &str, timeout: Duration) -> VisionResult<Match> {
        let template = self.lookup(name)?;
        let result = vision::wait_for(
            self.device.transport(),
            &self.matcher,
            &template,
            self.roi,
            timeout,
        )
        .await;
        self.record(name, timeout, result)
    }

    /// Every non-overlapping occurrence of `name`, best first, once at least
    /// one shows up within `auto_wait_timeout`
    pub async fn find_all(&mut self, name: &str) -> VisionResult<Vec<Match>> {
        self.last_matches = None;
        let timeout = self.settings.auto_wait_timeout;
        let template = self.lookup(name)?;
        let (matcher, roi) = (&self.matcher, self.roi);
        let state = vision::poll_until(self.device.transport(), timeout, name, |frame| {
            let all = matcher.locate_all(frame, &template, roi, FIND_ALL_LIMIT);
            (!all.is_empty()).then_some(all)
        })
        .await;

        let all = match state {
            Ok(PollState::Found(all)) => all,
            Ok(_) => {
                self.last_match = None;
                return Err(VisionError::not_found_within(name, timeout));
            }
            Err(e) => {
                self.last_match = None;
                return Err(e);
            }
        };
        log::info!("Found {} x '{}'", all.len(), name);
        self.last_match = all.first().copied();
        self.last_matches = Some(all.clone());
        Ok(all)
    }

    /// Wait up to `timeout` for `name` to disappear
    pub async fn wait_vanish(&mut self, name: &str, timeout: Duration) -> VisionResult<bool> {
        let template = self.lookup(name)?;
        let gone = vision::wait_vanish(
            self.device.transport(),
            &self.matcher,
            &template,
            self.roi,
            timeout,
        )
        .await?;
        if gone {
            self.last_match = None;
        }
        Ok(gone)
    }

    /// Find `name` and tap its center
    pub async fn click(&mut self, name: &str) -> VisionResult<Match> {
        let found = self.find(name).await?;
        self.device.tap(found.region).await?;
        log::info!("Clicked '{}' at {:?}", name, found.center());
        Ok(found)
    }

    /// Find both templates, then drag from the first onto the second
    pub async fn drag_drop(&mut self, source: &str, target: &str) -> VisionResult<()> {
        let from = self.find(source).await?;
        let to = self.find(target).await?;
        let delay = self.settings.move_mouse_delay;
        self.device.drag(from.region, to.region, delay).await?;
        log::info!("Dragged '{}' {} onto '{}' {}", source, from.region, target, to.region);
        Ok(())
    }

    pub async fn type_text(&mut self, text: &str) -> VisionResult<()> {
        self.device.type_text(text).await
    }

    pub async fn press(&mut self, key: KeyCode, action: KeyAction) -> VisionResult<()> {
        self.device.press(key, action).await
    }

    fn lookup(&mut self, name: &str) -> VisionResult<Arc<Template>> {
        let resolved = self.templates.resolve(self.settings.bundle_path(), name);
        if resolved.is_err() {
            self.last_match = None;
        }
        resolved
    }

    fn record(
        &mut self,
        name: &str,
        timeout: Duration,
        result: VisionResult<Option<Match>>,
    ) -> VisionResult<Match> {
        self.last_match = result.as_ref().ok().copied().flatten();
        match result? {
            Some(found) => {
                log::info!("Found '{}' at {}", name, found);
                Ok(found)
            }
            None => Err(VisionError::not_found_within(name, timeout)),
        }
    }
}
