//! In-memory device for driving the engine without hardware.
//!
//! Frames are scripted: the n-th capture returns the n-th frame and the last
//! frame repeats once the script runs out. Every input event is recorded.

use super::error::{AdbError, AdbResult};
use super::types::DeviceTransport;
use crate::input::InputEvent;
use image::RgbaImage;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub struct MockDevice {
    name: String,
    frames: Mutex<Vec<RgbaImage>>,
    events: Mutex<Vec<InputEvent>>,
    captures: AtomicU64,
    size_queries: AtomicU64,
    reachable: AtomicBool,
    capture_latency: Mutex<Duration>,
}

impl MockDevice {
    pub fn new(frame: RgbaImage) -> Self {
        Self::with_frames(vec![frame])
    }

    pub fn with_frames(frames: Vec<RgbaImage>) -> Self {
        Self {
            name: "mock-device".to_string(),
            frames: Mutex::new(frames),
            events: Mutex::new(Vec::new()),
            captures: AtomicU64::new(0),
            size_queries: AtomicU64::new(0),
            reachable: AtomicBool::new(true),
            capture_latency: Mutex::new(Duration::ZERO),
        }
    }

    /// A device showing a single flat frame
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255])))
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Simulate an unplugged or unauthorized device
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Time each capture takes before returning
    pub fn set_capture_latency(&self, latency: Duration) {
        *lock(&self.capture_latency) = latency;
    }

    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn size_query_count(&self) -> u64 {
        self.size_queries.load(Ordering::SeqCst)
    }

    /// Events received so far, in order
    pub fn events(&self) -> Vec<InputEvent> {
        lock(&self.events).clone()
    }

    pub fn clear_events(&self) {
        lock(&self.events).clear();
    }

    fn ensure_reachable(&self) -> AdbResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AdbError::Unreachable {
                name: self.name.clone(),
            })
        }
    }

    /// The frame the next capture will return
    fn current_frame(&self) -> AdbResult<RgbaImage> {
        let frames = lock(&self.frames);
        let index = self.captures.load(Ordering::SeqCst) as usize;
        frames
            .get(index.min(frames.len().saturating_sub(1)))
            .cloned()
            .ok_or(AdbError::EmptyCapture)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DeviceTransport for MockDevice {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        let latency = *lock(&self.capture_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.ensure_reachable()?;
        let frame = self.current_frame()?;
        self.captures.fetch_add(1, Ordering::SeqCst);

        let mut data = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .map_err(|e| AdbError::CommandFailed {
                command: "mock screencap".into(),
                stderr: e.to_string(),
            })?;
        Ok(data)
    }

    async fn screen_size(&self) -> AdbResult<(u32, u32)> {
        self.ensure_reachable()?;
        self.size_queries.fetch_add(1, Ordering::SeqCst);
        let frame = self.current_frame()?;
        Ok(frame.dimensions())
    }

    async fn send_event(&self, event: &InputEvent) -> AdbResult<()> {
        self.ensure_reachable()?;
        lock(&self.events).push(*event);
        Ok(())
    }

    fn device_name(&self) -> &str {
        &self.name
    }

    fn next_capture_index(&self) -> u64 {
        self.captures.load(Ordering::SeqCst).saturating_sub(1)
    }
}
