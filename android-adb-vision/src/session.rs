//! One automation session: setup, the screen it owns, and teardown

use crate::adb::{AdbBackend, AdbImpl, DeviceTransport};
use crate::device::Device;
use crate::error::VisionResult;
use crate::screen::Screen;
use crate::settings::Settings;
use std::time::Instant;

pub struct Session<T: DeviceTransport> {
    screen: Screen<T>,
    opened: Instant,
}

impl Session<AdbBackend> {
    /// Open a session on the first device the ADB implementation reports
    pub async fn connect(imp: AdbImpl, settings: Settings) -> VisionResult<Self> {
        let backend = AdbBackend::connect_first(imp).await?;
        Ok(Self::open(backend, settings))
    }
}

impl<T: DeviceTransport> Session<T> {
    pub fn open(transport: T, settings: Settings) -> Self {
        log::info!(
            "Session opened on {} (bundle: {:?}, auto wait {:?})",
            transport.device_name(),
            settings.bundle_path(),
            settings.auto_wait_timeout
        );
        Self {
            screen: Screen::new(Device::new(transport), settings),
            opened: Instant::now(),
        }
    }

    pub fn screen(&mut self) -> &mut Screen<T> {
        &mut self.screen
    }

    pub fn device(&self) -> &Device<T> {
        self.screen.device()
    }

    /// End the session and hand back the transport
    pub fn close(self) -> T {
        let device = self.screen.into_device();
        log::info!(
            "Session closed on {} after {:?}, {} input event(s) sent",
            device.name(),
            self.opened.elapsed(),
            device.events_sent()
        );
        device.into_transport()
    }
}
