// Tests for the in-memory transport
// Focus: frame scripting, event recording, reachability

#[cfg(test)]
mod mock_device_tests {
    use super::super::{AdbError, DeviceTransport, MockDevice};
    use crate::input::{InputEvent, KeyAction, KeyCode};
    use image::{Rgba, RgbaImage};
    use std::time::Duration;

    fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[tokio::test]
    async fn test_frames_play_in_order_then_stick() {
        let device = MockDevice::with_frames(vec![solid(4, 4, 10), solid(4, 4, 20)]);

        let first = decode(&device.screen_capture_bytes().await.unwrap());
        let second = decode(&device.screen_capture_bytes().await.unwrap());
        let third = decode(&device.screen_capture_bytes().await.unwrap());

        assert_eq!(first.get_pixel(0, 0)[0], 10);
        assert_eq!(second.get_pixel(0, 0)[0], 20);
        assert_eq!(third.get_pixel(0, 0)[0], 20, "last frame repeats");
        assert_eq!(device.capture_count(), 3);
    }

    #[tokio::test]
    async fn test_screen_size_does_not_capture() {
        let device = MockDevice::blank(320, 480);
        assert_eq!(device.screen_size().await.unwrap(), (320, 480));
        assert_eq!(device.capture_count(), 0);
        assert_eq!(device.size_query_count(), 1);
    }

    #[tokio::test]
    async fn test_events_are_recorded_in_order() {
        let device = MockDevice::blank(10, 10);
        let events = [
            InputEvent::key(KeyCode::Power, KeyAction::DownAndUp),
            InputEvent::PointerDown { x: 1, y: 2 },
            InputEvent::PointerUp { x: 3, y: 4 },
        ];
        for event in &events {
            device.send_event(event).await.unwrap();
        }
        assert_eq!(device.events(), events.to_vec());

        device.clear_events();
        assert!(device.events().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_device_fails_everything() {
        let device = MockDevice::blank(10, 10).named("pixel-7");
        device.set_reachable(false);

        let err = device.screen_capture_bytes().await.unwrap_err();
        assert!(matches!(err, AdbError::Unreachable { ref name } if name == "pixel-7"));
        assert!(device.screen_size().await.is_err());
        assert!(
            device
                .send_event(&InputEvent::PointerDown { x: 0, y: 0 })
                .await
                .is_err()
        );
        assert_eq!(device.capture_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_latency_consumes_time() {
        let device = MockDevice::blank(10, 10);
        device.set_capture_latency(Duration::from_millis(300));

        let start = tokio::time::Instant::now();
        let capture = device.screen_capture().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(capture.index, 0);
    }

    #[tokio::test]
    async fn test_empty_script_reports_empty_capture() {
        let device = MockDevice::with_frames(Vec::new());
        let err = device.screen_capture_bytes().await.unwrap_err();
        assert!(matches!(err, AdbError::EmptyCapture));
    }
}
