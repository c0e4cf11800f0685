use super::error::AdbResult;
use super::rust_impl::RustAdb;
use super::shell::AdbShell;
use super::types::{AdbDevice, DeviceTransport, ImageCapture};
use crate::input::InputEvent;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which ADB implementation drives the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdbImpl {
    /// Pure Rust client talking to the ADB server
    #[default]
    Rust,
    /// External `adb` binary
    Shell,
}

impl AdbImpl {
    /// Reads `ADB_IMPL` (`rust` or `shell`), defaulting to rust
    pub fn from_env() -> Self {
        std::env::var("ADB_IMPL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdbImpl::Rust => "rust",
            AdbImpl::Shell => "shell",
        }
    }
}

impl FromStr for AdbImpl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rust" => Ok(AdbImpl::Rust),
            "shell" => Ok(AdbImpl::Shell),
            other => Err(format!("Unknown impl '{other}', expected 'rust' or 'shell'")),
        }
    }
}

pub enum AdbBackend {
    Shell(AdbShell),
    Rust(RustAdb),
}

impl AdbBackend {
    pub async fn list_devices(imp: AdbImpl) -> AdbResult<Vec<AdbDevice>> {
        match imp {
            AdbImpl::Rust => RustAdb::list_devices().await,
            AdbImpl::Shell => AdbShell::list_devices().await,
        }
    }

    pub async fn connect_first(imp: AdbImpl) -> AdbResult<Self> {
        let devices = Self::list_devices(imp).await?;
        let first = devices
            .into_iter()
            .next()
            .ok_or(super::error::AdbError::NoDevices)?;
        Self::new_with_device(&first.name, imp).await
    }

    pub async fn new_with_device(name: &str, imp: AdbImpl) -> AdbResult<Self> {
        match imp {
            AdbImpl::Rust => Ok(AdbBackend::Rust(RustAdb::new_with_device(name).await?)),
            AdbImpl::Shell => Ok(AdbBackend::Shell(AdbShell::new_with_device(name).await?)),
        }
    }
}

impl DeviceTransport for AdbBackend {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        match self {
            AdbBackend::Shell(s) => s.screen_capture_bytes().await,
            AdbBackend::Rust(r) => r.screen_capture_bytes().await,
        }
    }

    async fn screen_capture(&self) -> AdbResult<ImageCapture> {
        match self {
            AdbBackend::Shell(s) => <AdbShell as DeviceTransport>::screen_capture(s).await,
            AdbBackend::Rust(r) => <RustAdb as DeviceTransport>::screen_capture(r).await,
        }
    }

    async fn screen_size(&self) -> AdbResult<(u32, u32)> {
        match self {
            AdbBackend::Shell(s) => s.screen_size().await,
            AdbBackend::Rust(r) => r.screen_size().await,
        }
    }

    async fn send_event(&self, event: &InputEvent) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.send_event(event).await,
            AdbBackend::Rust(r) => r.send_event(event).await,
        }
    }

    fn device_name(&self) -> &str {
        match self {
            AdbBackend::Shell(s) => s.device_name(),
            AdbBackend::Rust(r) => r.device_name(),
        }
    }
}
