//! Frame and geometry acquisition

use super::frame::Frame;
use super::region::Region;
use crate::adb::{AdbError, DeviceTransport};
use crate::error::{VisionError, VisionResult};

/// Grab the current screen as a full-screen frame.
///
/// Transport failures and undecodable captures are returned as-is, never retried.
pub async fn capture<T: DeviceTransport>(device: &T) -> VisionResult<Frame> {
    let capture = device.screen_capture().await?;
    if capture.bytes.is_empty() {
        return Err(AdbError::EmptyCapture.into());
    }
    let frame = Frame::from_capture(&capture)?;
    log::debug!(
        "Captured #{} {}x{} from {} in {}ms",
        frame.index(),
        frame.width(),
        frame.height(),
        device.device_name(),
        frame.capture_ms()
    );
    Ok(frame)
}

/// Addressable screen area, without transferring pixels
pub async fn bounds<T: DeviceTransport>(device: &T) -> VisionResult<Region> {
    let (width, height) = device.screen_size().await?;
    if width == 0 || height == 0 {
        return Err(VisionError::BadFrame {
            description: format!("device reported a {width}x{height} screen"),
        });
    }
    Ok(Region::full_screen(width, height))
}
