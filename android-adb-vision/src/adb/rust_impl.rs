// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{AdbDevice, DeviceTransport, HeldKeys, parse_screen_size};
use crate::input::InputEvent;
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

const SHELL_TIMEOUT: Duration = Duration::from_secs(5);
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport talking to the ADB server through the `adb_client` crate
pub struct RustAdb {
    device: AdbDevice,
    server_device: Arc<Mutex<ADBServerDevice>>,
    held_keys: HeldKeys,
    captures: AtomicU64,
}

impl RustAdb {
    pub async fn list_devices() -> AdbResult<Vec<AdbDevice>> {
        let mut server = ADBServer::default();
        let device_list = tokio::task::spawn_blocking(move || server.devices()).await??;
        Ok(device_list
            .into_iter()
            .map(|d| AdbDevice {
                name: d.identifier,
                transport_id: None,
            })
            .collect())
    }

    pub async fn new_with_device(device_name: &str) -> AdbResult<Self> {
        let mut server = ADBServer::default();
        let name = device_name.to_string();
        // get_device_by_name or get_device depending on provided name
        let server_device = tokio::task::spawn_blocking(move || {
            if name.is_empty() {
                server.get_device()
            } else {
                server.get_device_by_name(&name)
            }
        })
        .await??;
        log::info!("RustAdb: opened device '{}'", device_name);
        Ok(RustAdb {
            device: AdbDevice {
                name: device_name.to_string(),
                transport_id: None,
            },
            server_device: Arc::new(Mutex::new(server_device)),
            held_keys: HeldKeys::default(),
            captures: AtomicU64::new(0),
        })
    }

    /// Run a shell command on the device, bounded by `timeout`
    async fn shell(&self, args: Vec<String>, timeout: Duration) -> AdbResult<Vec<u8>> {
        let command = args.join(" ");
        // Clone Arc for move into spawn_blocking
        let server_device = Arc::clone(&self.server_device);

        // Wrap the blocking shell_command in spawn_blocking so timeout can work
        let shell_future = tokio::task::spawn_blocking(move || -> AdbResult<Vec<u8>> {
            let mut out: Vec<u8> = Vec::new();
            let mut dev = server_device.blocking_lock();
            let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
            dev.shell_command(&refs, &mut out)
                .map_err(|source| AdbError::ShellCommandFailed {
                    command: args.join(" "),
                    source,
                })?;
            Ok(out)
        });

        match tokio::time::timeout(timeout, shell_future).await {
            Ok(joined) => joined?,
            Err(_) => Err(AdbError::Timeout {
                duration: timeout,
                description: format!("'{command}' (device may be disconnected)"),
            }),
        }
    }
}

impl DeviceTransport for RustAdb {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        let bytes = self
            .shell(vec!["screencap".into(), "-p".into()], CAPTURE_TIMEOUT)
            .await?;
        if bytes.is_empty() {
            return Err(AdbError::EmptyCapture);
        }
        Ok(bytes)
    }

    async fn screen_size(&self) -> AdbResult<(u32, u32)> {
        let out = self
            .shell(vec!["wm".into(), "size".into()], SHELL_TIMEOUT)
            .await?;
        parse_screen_size(&String::from_utf8_lossy(&out)).ok_or(AdbError::ScreenSizeParseFailed)
    }

    async fn send_event(&self, event: &InputEvent) -> AdbResult<()> {
        let Some(args) = self.held_keys.shell_args(event) else {
            log::debug!("RustAdb: holding {:?} until release", event);
            return Ok(());
        };
        self.shell(args, SHELL_TIMEOUT).await?;
        Ok(())
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }

    fn next_capture_index(&self) -> u64 {
        self.captures.fetch_add(1, Ordering::Relaxed)
    }
}
