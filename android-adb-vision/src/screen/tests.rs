// Tests for the Screen verbs against a scripted device
// Focus: lookup/wait semantics, error classification, gesture coordinates

#[cfg(test)]
mod screen_tests {
    use super::super::Screen;
    use crate::adb::MockDevice;
    use crate::device::Device;
    use crate::error::VisionError;
    use crate::input::{InputEvent, KeyAction, KeyCode};
    use crate::settings::Settings;
    use crate::vision::Region;
    use image::{Rgba, RgbaImage, imageops};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::Instant;

    const WIDTH: u32 = 240;
    const HEIGHT: u32 = 160;
    const LOCK: Region = Region { x: 20, y: 30, width: 24, height: 20 };
    const SPEAKER: Region = Region { x: 150, y: 100, width: 24, height: 20 };

    fn patch(seed: u32) -> RgbaImage {
        RgbaImage::from_fn(24, 20, |x, y| {
            let v = ((x * (31 + seed) + y * (57 + 3 * seed) + (x * y * seed) % 11 * 19) % 256) as u8;
            Rgba([v, v.wrapping_add(40), v, 255])
        })
    }

    fn background() -> RgbaImage {
        RgbaImage::from_fn(WIDTH, HEIGHT, |x, y| {
            let v = ((x / 6 + y / 9) % 2 * 50 + 100) as u8;
            Rgba([v, v, v, 255])
        })
    }

    fn with(patches: &[(u32, Region)]) -> RgbaImage {
        let mut frame = background();
        for (seed, at) in patches {
            imageops::replace(&mut frame, &patch(*seed), at.x as i64, at.y as i64);
        }
        frame
    }

    fn home_screen() -> RgbaImage {
        with(&[(1, LOCK), (2, SPEAKER)])
    }

    fn bundle() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        patch(1).save(dir.path().join("lock.png")).unwrap();
        patch(2).save(dir.path().join("speaker.png")).unwrap();
        home_screen()
            .save(dir.path().join(format!(
                "lock-[{},{},{},{}].png",
                LOCK.x, LOCK.y, LOCK.width, LOCK.height
            )))
            .unwrap();
        dir
    }

    fn screen(device: MockDevice, bundle: &TempDir) -> Screen<MockDevice> {
        let settings = Settings::new().with_bundle_path(bundle.path());
        Screen::new(Device::new(device), settings)
    }

    #[tokio::test]
    async fn test_bounds_start_at_origin() {
        let bundle = bundle();
        let screen = screen(MockDevice::new(home_screen()), &bundle);

        let bounds = screen.get_bounds().await.unwrap();
        assert_eq!((bounds.x, bounds.y), (0, 0));
        assert!(bounds.width > 0 && bounds.height > 0);

        let frame = screen.capture().await.unwrap();
        assert_eq!(frame.region(), bounds);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exists_and_find_agree() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);

        assert!(screen.exists("lock.png").await.unwrap());
        let found = screen.find("lock.png").await.unwrap();
        assert_eq!(found.region, LOCK);
        assert_eq!(screen.last_match(), Some(found));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_template_is_false_then_find_failed() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(with(&[(1, LOCK)])), &bundle);
        screen.settings_mut().set_auto_wait_timeout(1.0).unwrap();
        let start = Instant::now();

        assert!(!screen.exists("speaker.png").await.unwrap());
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        let err = screen.find("speaker.png").await.unwrap_err();
        assert!(err.is_find_failed(), "{err}");
        assert!(err.to_string().contains("speaker.png"));
        assert_eq!(screen.last_match(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exists_turns_true_when_template_appears() {
        let bundle = bundle();
        let device = MockDevice::with_frames(vec![background(), background(), home_screen()]);
        let mut screen = screen(device, &bundle);
        let start = Instant::now();

        assert!(screen.exists("speaker.png").await.unwrap());
        assert_eq!(screen.device().transport().capture_count(), 3);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_asset_is_not_found_without_polling() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);

        assert!(!screen.exists("missing.png").await.unwrap());
        let err = screen.find("missing.png").await.unwrap_err();
        assert!(err.is_find_failed());
        assert_eq!(screen.device().transport().capture_count(), 0);
    }

    #[tokio::test]
    async fn test_unset_bundle_path_is_configuration_error() {
        let mut screen = Screen::new(Device::new(MockDevice::new(home_screen())), Settings::default());
        let err = screen.exists("lock.png").await.unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bundle_path_change_applies_to_next_lookup() {
        let bundle = bundle();
        let empty = tempfile::tempdir().unwrap();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);
        assert!(screen.exists("lock.png").await.unwrap());

        screen.settings_mut().set_bundle_path(empty.path());
        assert!(!screen.exists("lock.png").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_checks_once() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(background()), &bundle);
        screen.settings_mut().set_auto_wait_timeout(0.0).unwrap();

        assert!(!screen.exists("lock.png").await.unwrap());
        assert_eq!(screen.device().transport().capture_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_errors_are_not_swallowed() {
        let bundle = bundle();
        let device = MockDevice::new(home_screen());
        device.set_reachable(false);
        let mut screen = screen(device, &bundle);

        let err = screen.exists("lock.png").await.unwrap_err();
        assert!(err.is_device_unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_taps_match_center() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);

        screen.click("speaker.png").await.unwrap();
        let (x, y) = SPEAKER.center();
        assert_eq!(
            screen.device().transport().events(),
            vec![InputEvent::PointerDown { x, y }, InputEvent::PointerUp { x, y }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_on_absent_template_sends_nothing() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(background()), &bundle);
        screen.settings_mut().set_auto_wait_timeout(0.5).unwrap();

        assert!(screen.click("lock.png").await.unwrap_err().is_find_failed());
        assert!(screen.device().transport().events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_drop_path() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);
        screen.settings_mut().set_move_mouse_delay(0.02).unwrap();

        screen.drag_drop("lock.png", "speaker.png").await.unwrap();

        let events = screen.device().transport().events();
        let (ax, ay) = LOCK.center();
        let (bx, by) = SPEAKER.center();
        assert_eq!(events.first(), Some(&InputEvent::PointerDown { x: ax, y: ay }));
        assert_eq!(events.last(), Some(&InputEvent::PointerUp { x: bx, y: by }));

        let path: Vec<(u32, u32)> = events[1..events.len() - 1]
            .iter()
            .map(|e| match e {
                InputEvent::PointerMove { x, y } => (*x, *y),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert!(!path.is_empty());
        assert!(path.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1));
        assert_eq!(path.last(), Some(&(bx, by)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_drop_propagates_missing_target() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(with(&[(1, LOCK)])), &bundle);
        screen.settings_mut().set_auto_wait_timeout(0.0).unwrap();

        let err = screen.drag_drop("lock.png", "speaker.png").await.unwrap_err();
        assert!(matches!(err, VisionError::FindFailed { ref template, .. } if template == "speaker.png"));
        assert!(screen.device().transport().events().is_empty());
    }

    #[tokio::test]
    async fn test_type_sends_one_event_per_character() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);

        screen.type_text("abc").await.unwrap();
        let keys: Vec<KeyCode> = screen
            .device()
            .transport()
            .events()
            .iter()
            .map(|e| match e {
                InputEvent::Key { key, action: KeyAction::DownAndUp, .. } => *key,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(keys, vec![KeyCode::A, KeyCode::B, KeyCode::C]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_roi_restricts_lookups() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);
        screen.settings_mut().set_auto_wait_timeout(0.0).unwrap();

        screen.set_roi(Some(Region::new(120, 80, 120, 80)));
        assert!(screen.exists("speaker.png").await.unwrap());
        assert!(!screen.exists("lock.png").await.unwrap());

        screen.set_roi(None);
        assert_eq!(screen.roi(), None);
        assert!(screen.exists("lock.png").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_all_and_wait_vanish() {
        let bundle = bundle();
        let second_lock = Region::new(100, 10, 24, 20);
        let device = MockDevice::with_frames(vec![
            with(&[(1, LOCK), (1, second_lock)]),
            with(&[(1, LOCK), (1, second_lock)]),
            background(),
        ]);
        let mut screen = screen(device, &bundle);

        let all = screen.find_all("lock.png").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|m| m.region == LOCK));
        assert!(all.iter().any(|m| m.region == second_lock));

        assert!(screen.wait_vanish("lock.png", Duration::from_secs(2)).await.unwrap());
        assert_eq!(screen.last_match(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_matches_hold_find_all_result() {
        let bundle = bundle();
        let second_lock = Region::new(100, 10, 24, 20);
        let mut screen = screen(MockDevice::new(with(&[(1, LOCK), (1, second_lock)])), &bundle);
        assert!(screen.last_matches().is_none());

        let all = screen.find_all("lock.png").await.unwrap();
        assert_eq!(screen.last_matches(), Some(all.as_slice()));
        assert_eq!(screen.last_match(), all.first().copied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_matches_cleared_when_find_all_fails() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::with_frames(vec![with(&[(1, LOCK)]), background()]), &bundle);
        screen.settings_mut().set_auto_wait_timeout(0.0).unwrap();

        assert_eq!(screen.find_all("lock.png").await.unwrap().len(), 1);
        assert!(screen.last_matches().is_some());

        let err = screen.find_all("lock.png").await.unwrap_err();
        assert!(err.is_find_failed());
        assert!(screen.last_matches().is_none());
        assert!(screen.last_match().is_none());

        // A missing asset fails the same way
        assert!(screen.find_all("missing.png").await.unwrap_err().is_find_failed());
        assert!(screen.last_matches().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cropped_screenshot_template() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);

        let name = format!("lock-[{},{},{},{}].png", LOCK.x, LOCK.y, LOCK.width, LOCK.height);
        let found = screen.find(&name).await.unwrap();
        assert_eq!(found.region, LOCK);
        assert_eq!(screen.templates().count(), 1);
    }

    #[tokio::test]
    async fn test_press_reaches_device() {
        let bundle = bundle();
        let mut screen = screen(MockDevice::new(home_screen()), &bundle);
        screen.press(KeyCode::Home, KeyAction::DownAndUp).await.unwrap();
        assert_eq!(
            screen.device().transport().events(),
            vec![InputEvent::key(KeyCode::Home, KeyAction::DownAndUp)]
        );
    }
}
