use super::error::{AdbError, AdbResult};
use super::types::{AdbDevice, DeviceTransport, HeldKeys, parse_screen_size};
use crate::input::InputEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;

/// Transport driving the external `adb` binary
pub struct AdbShell {
    pub device: AdbDevice,
    pub transport_id: u32,
    held_keys: HeldKeys,
    captures: AtomicU64,
}

impl AdbShell {
    async fn ensure_adb_available() -> AdbResult<()> {
        Self::classify_adb_version_check(Command::new("adb").arg("version").output().await)
    }

    /// Turn the outcome of `adb version` into install guidance
    fn classify_adb_version_check(outcome: std::io::Result<std::process::Output>) -> AdbResult<()> {
        let description = match outcome {
            Ok(out) if out.status.success() => return Ok(()),
            Ok(out) => format!("'adb version' returned non-zero ({})", out.status),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "'adb' binary not found in PATH".to_string()
            }
            Err(e) => format!("failed to invoke 'adb': {e}"),
        };
        Err(AdbError::AdbNotInstalled { description })
    }

    pub async fn new(transport_id: Option<&str>) -> AdbResult<Self> {
        // Provide early backend guidance if adb unavailable
        Self::ensure_adb_available().await?;
        let devices = Self::list_devices().await?;
        if devices.is_empty() {
            return Err(AdbError::NoDevices);
        }
        let device = match transport_id {
            Some(tid) => devices
                .into_iter()
                .find(|d| d.transport_id.as_deref() == Some(tid)),
            None => devices.into_iter().next(),
        }
        .ok_or_else(|| AdbError::DeviceNotFound {
            name: format!("transport_id:{}", transport_id.unwrap_or("?")),
        })?;
        let transport_id = device
            .transport_id
            .as_deref()
            .and_then(|tid| tid.parse::<u32>().ok())
            .ok_or_else(|| AdbError::DeviceNotFound {
                name: format!("{} (missing transport_id)", device.name),
            })?;
        log::info!("AdbShell: using device {} (transport {})", device.name, transport_id);
        Ok(Self {
            device,
            transport_id,
            held_keys: HeldKeys::default(),
            captures: AtomicU64::new(0),
        })
    }

    pub async fn new_with_device(device_name: &str) -> AdbResult<Self> {
        let devices = Self::list_devices().await?;
        if let Some(device) = devices.iter().find(|d| d.name == device_name) {
            return Self::new(device.transport_id.as_deref()).await;
        }
        let output = Command::new("adb")
            .arg("connect")
            .arg(device_name)
            .output()
            .await
            .map_err(|source| AdbError::CommandSpawnFailed {
                command: "adb connect".into(),
                source,
            })?;
        let stdout_str = String::from_utf8_lossy(&output.stdout);
        let stderr_str = String::from_utf8_lossy(&output.stderr);
        if !output.status.success()
            || stdout_str.contains("Connection refused")
            || stderr_str.contains("Connection refused")
        {
            return Err(AdbError::CommandFailed {
                command: format!("adb connect {device_name}"),
                stderr: format!("Out:{stdout_str} Err:{stderr_str} Try: 'adb tcpip 5555'"),
            });
        }
        let devices = Self::list_devices().await?;
        if let Some(device) = devices.iter().find(|d| d.name == device_name) {
            return Self::new(device.transport_id.as_deref()).await;
        }
        Err(AdbError::DeviceNotFound {
            name: device_name.to_string(),
        })
    }

    pub fn parse_devices(output: &str) -> Vec<AdbDevice> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 && parts[1] == "device" {
                    let name = parts[0].to_string();
                    let transport_id = line.split_whitespace().find_map(|part| {
                        part.strip_prefix("transport_id:").map(str::to_string)
                    });
                    Some(AdbDevice { name, transport_id })
                } else {
                    None
                }
            })
            .collect()
    }

    pub async fn list_devices() -> AdbResult<Vec<AdbDevice>> {
        Self::ensure_adb_available().await?;
        let output = Command::new("adb")
            .arg("devices")
            .arg("-l")
            .output()
            .await
            .map_err(|source| AdbError::CommandSpawnFailed {
                command: "adb devices".into(),
                source,
            })?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command: "adb devices".into(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Self::parse_devices(&stdout))
    }

    /// Run `adb -t <transport> <args..>` and return stdout
    async fn run(&self, args: &[&str]) -> AdbResult<Vec<u8>> {
        let command = format!("adb {}", args.join(" "));
        let output = Command::new("adb")
            .arg("-t")
            .arg(self.transport_id.to_string())
            .args(args)
            .output()
            .await
            .map_err(|source| AdbError::CommandSpawnFailed {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }

    async fn get_screen_size(&self) -> AdbResult<(u32, u32)> {
        let stdout = self.run(&["shell", "wm", "size"]).await?;
        parse_screen_size(&String::from_utf8_lossy(&stdout)).ok_or(AdbError::ScreenSizeParseFailed)
    }

    pub async fn capture_screen_bytes_internal(&self) -> AdbResult<Vec<u8>> {
        let bytes = self.run(&["exec-out", "screencap", "-p"]).await?;
        if bytes.is_empty() {
            return Err(AdbError::EmptyCapture);
        }
        Ok(bytes)
    }
}

impl DeviceTransport for AdbShell {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        self.capture_screen_bytes_internal().await
    }

    async fn screen_size(&self) -> AdbResult<(u32, u32)> {
        self.get_screen_size().await
    }

    async fn send_event(&self, event: &InputEvent) -> AdbResult<()> {
        let Some(args) = self.held_keys.shell_args(event) else {
            log::debug!("AdbShell: holding {:?} until release", event);
            return Ok(());
        };
        let mut full: Vec<&str> = vec!["shell"];
        full.extend(args.iter().map(String::as_str));
        self.run(&full).await?;
        Ok(())
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }

    fn next_capture_index(&self) -> u64 {
        self.captures.fetch_add(1, Ordering::Relaxed)
    }
}
