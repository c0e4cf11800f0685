// Core transport types and the capability trait every device backend implements
use super::error::AdbResult;
use crate::input::InputEvent;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ImageCapture {
    /// Encoded screenshot (PNG from `screencap -p`)
    pub bytes: Vec<u8>,
    pub duration_ms: u128,
    /// Sequential capture count (per transport instance)
    pub index: u64,
}

// Trait defining device capabilities (shell, rust or in-memory implementations)
#[allow(async_fn_in_trait)]
pub trait DeviceTransport: Send + Sync {
    /// Raw backend-specific capture (implemented per backend)
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>>;

    /// Default high-level capture with timing
    async fn screen_capture(&self) -> AdbResult<ImageCapture> {
        let start = std::time::Instant::now();
        let bytes = self.screen_capture_bytes().await?;
        let dur = start.elapsed().as_millis();
        Ok(ImageCapture {
            bytes,
            duration_ms: dur,
            index: self.next_capture_index(),
        })
    }

    /// Addressable screen size without transferring pixels
    async fn screen_size(&self) -> AdbResult<(u32, u32)>;

    async fn send_event(&self, event: &InputEvent) -> AdbResult<()>;

    fn device_name(&self) -> &str;

    /// Index handed to the next capture; backends without a counter report 0
    fn next_capture_index(&self) -> u64 {
        0
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct AdbDevice {
    pub name: String,
    pub transport_id: Option<String>,
}

/// Parse `wm size` output, preferring an override size over the physical one
pub fn parse_screen_size(stdout: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    let mut overridden = None;
    for line in stdout.lines() {
        let line = line.trim();
        let (slot, size_str) = if let Some(rest) = line.strip_prefix("Physical size: ") {
            (&mut physical, rest)
        } else if let Some(rest) = line.strip_prefix("Override size: ") {
            (&mut overridden, rest)
        } else {
            continue;
        };
        let parts: Vec<&str> = size_str.trim().split('x').collect();
        if parts.len() == 2
            && let (Ok(x), Ok(y)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>())
            && x > 0
            && y > 0
        {
            *slot = Some((x, y));
        }
    }
    overridden.or(physical)
}

/// Android `input` shell arguments for an event.
///
/// Returns `None` for a bare key-down: `input keyevent` can only deliver a
/// full press, so the press is sent when the matching release arrives.
pub fn input_command_args(event: &InputEvent, long_press: bool) -> Option<Vec<String>> {
    use crate::input::{KeyAction, KeyCode};

    let args: Vec<String> = match *event {
        InputEvent::Key {
            action: KeyAction::Down,
            ..
        } => return None,
        InputEvent::Key { key, shift: true, .. } => vec![
            "input".into(),
            "keycombination".into(),
            KeyCode::ShiftLeft.android_name().into(),
            key.android_name().into(),
        ],
        InputEvent::Key { key, .. } => {
            let mut args = vec!["input".to_string(), "keyevent".to_string()];
            if long_press {
                args.push("--longpress".into());
            }
            args.push(key.android_name().into());
            args
        }
        InputEvent::PointerDown { x, y } => motion_args("DOWN", x, y),
        InputEvent::PointerMove { x, y } => motion_args("MOVE", x, y),
        InputEvent::PointerUp { x, y } => motion_args("UP", x, y),
    };
    Some(args)
}

fn motion_args(action: &str, x: u32, y: u32) -> Vec<String> {
    vec![
        "input".into(),
        "motionevent".into(),
        action.into(),
        x.to_string(),
        y.to_string(),
    ]
}

/// Android treats a key held this long as a long press
pub const LONG_PRESS: std::time::Duration = std::time::Duration::from_millis(500);

/// Tracks keys sent as `Down` so the matching `Up` can be delivered as one
/// `input keyevent`, with `--longpress` when the key was held long enough
#[derive(Debug, Default)]
pub struct HeldKeys {
    pressed: std::sync::Mutex<std::collections::HashMap<crate::input::KeyCode, std::time::Instant>>,
}

impl HeldKeys {
    pub fn shell_args(&self, event: &InputEvent) -> Option<Vec<String>> {
        use crate::input::KeyAction;

        let mut pressed = self
            .pressed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *event {
            InputEvent::Key {
                key,
                action: KeyAction::Down,
                ..
            } => {
                pressed.insert(key, std::time::Instant::now());
                None
            }
            InputEvent::Key {
                key,
                action: KeyAction::Up,
                ..
            } => {
                let long_press = pressed
                    .remove(&key)
                    .map(|since| since.elapsed() >= LONG_PRESS)
                    .unwrap_or(false);
                input_command_args(event, long_press)
            }
            _ => input_command_args(event, false),
        }
    }
}
