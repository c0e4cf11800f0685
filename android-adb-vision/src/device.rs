//! Device controller: turns high-level gestures into transport input events

use crate::adb::DeviceTransport;
use crate::error::{VisionError, VisionResult};
use crate::input::{InputEvent, KeyAction, KeyCode, char_to_key};
use crate::vision::Region;
use std::time::Duration;

/// Distance covered by one motion event of a drag
pub const DRAG_STEP_PIXELS: f64 = 40.0;
pub const MAX_DRAG_STEPS: u32 = 50;

/// A device handle owning one transport
pub struct Device<T: DeviceTransport> {
    transport: T,
    events_sent: u64,
}

impl<T: DeviceTransport> Device<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            events_sent: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn name(&self) -> &str {
        self.transport.device_name()
    }

    /// Input events delivered through this handle
    pub fn events_sent(&self) -> u64 {
        self.events_sent
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    async fn send(&mut self, event: InputEvent) -> VisionResult<()> {
        log::debug!("{}: {:?}", self.transport.device_name(), event);
        self.transport.send_event(&event).await?;
        self.events_sent += 1;
        Ok(())
    }

    pub async fn press(&mut self, key: KeyCode, action: KeyAction) -> VisionResult<()> {
        self.send(InputEvent::key(key, action)).await
    }

    /// Touch down and up at the center of `region`
    pub async fn tap(&mut self, region: Region) -> VisionResult<()> {
        let (x, y) = region.center();
        self.send(InputEvent::PointerDown { x, y }).await?;
        self.send(InputEvent::PointerUp { x, y }).await
    }

    /// Drag from the center of `from` to the center of `to`.
    ///
    /// Emits down, at least one interpolated move ending on the target, then
    /// up. `move_delay` separates consecutive events.
    pub async fn drag(&mut self, from: Region, to: Region, move_delay: Duration) -> VisionResult<()> {
        let (x0, y0) = from.center();
        let (x1, y1) = to.center();
        let path = drag_path((x0, y0), (x1, y1));
        log::debug!(
            "Drag ({x0},{y0}) -> ({x1},{y1}) in {} step(s), delay {:?}",
            path.len(),
            move_delay
        );

        self.send(InputEvent::PointerDown { x: x0, y: y0 }).await?;
        for (x, y) in path {
            pause(move_delay).await;
            self.send(InputEvent::PointerMove { x, y }).await?;
        }
        pause(move_delay).await;
        self.send(InputEvent::PointerUp { x: x1, y: y1 }).await
    }

    /// Type `text` one key event per character.
    ///
    /// Characters without a key mapping are skipped; the rest are still
    /// typed and the first skipped one is reported afterwards.
    pub async fn type_text(&mut self, text: &str) -> VisionResult<()> {
        let mut first_skipped = None;
        let mut skipped = 0;

        for c in text.chars() {
            match char_to_key(c) {
                Some((key, shift)) => {
                    self.send(InputEvent::Key {
                        key,
                        action: KeyAction::DownAndUp,
                        shift,
                    })
                    .await?
                }
                None => {
                    log::warn!("No key mapping for {c:?}, skipping");
                    first_skipped.get_or_insert(c);
                    skipped += 1;
                }
            }
        }

        match first_skipped {
            Some(character) => Err(VisionError::UnsupportedInput { character, skipped }),
            None => Ok(()),
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Intermediate points of a straight drag, the last one being `to`
pub fn drag_path(from: (u32, u32), to: (u32, u32)) -> Vec<(u32, u32)> {
    let dx = to.0 as f64 - from.0 as f64;
    let dy = to.1 as f64 - from.1 as f64;
    let distance = (dx * dx + dy * dy).sqrt();
    let steps = ((distance / DRAG_STEP_PIXELS).ceil() as u32).clamp(1, MAX_DRAG_STEPS);

    (1..=steps)
        .map(|i| {
            if i == steps {
                return to;
            }
            let t = i as f64 / steps as f64;
            (
                (from.0 as f64 + dx * t).round() as u32,
                (from.1 as f64 + dy * t).round() as u32,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::MockDevice;
    use tokio::time::Instant;

    fn device() -> Device<MockDevice> {
        Device::new(MockDevice::blank(100, 100))
    }

    #[tokio::test]
    async fn press_sends_one_key_event() {
        let mut device = device();
        device.press(KeyCode::Power, KeyAction::DownAndUp).await.unwrap();
        assert_eq!(
            device.transport().events(),
            vec![InputEvent::key(KeyCode::Power, KeyAction::DownAndUp)]
        );
        assert_eq!(device.events_sent(), 1);
    }

    #[tokio::test]
    async fn tap_hits_region_center() {
        let mut device = device();
        device.tap(Region::new(10, 20, 30, 40)).await.unwrap();
        assert_eq!(
            device.transport().events(),
            vec![
                InputEvent::PointerDown { x: 25, y: 40 },
                InputEvent::PointerUp { x: 25, y: 40 },
            ]
        );
    }

    #[tokio::test]
    async fn drag_ends_on_target_center() {
        let mut device = device();
        let from = Region::new(0, 0, 20, 20);
        let to = Region::new(200, 100, 20, 20);
        device.drag(from, to, Duration::ZERO).await.unwrap();

        let events = device.transport().events();
        assert_eq!(events.first(), Some(&InputEvent::PointerDown { x: 10, y: 10 }));
        assert_eq!(events.last(), Some(&InputEvent::PointerUp { x: 210, y: 110 }));
        let moves: Vec<_> = events[1..events.len() - 1].to_vec();
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|e| matches!(e, InputEvent::PointerMove { .. })));
        assert_eq!(moves.last(), Some(&InputEvent::PointerMove { x: 210, y: 110 }));
    }

    #[tokio::test]
    async fn drag_onto_itself_still_moves_once() {
        let mut device = device();
        let spot = Region::new(5, 5, 10, 10);
        device.drag(spot, spot, Duration::ZERO).await.unwrap();
        assert_eq!(
            device.transport().events(),
            vec![
                InputEvent::PointerDown { x: 10, y: 10 },
                InputEvent::PointerMove { x: 10, y: 10 },
                InputEvent::PointerUp { x: 10, y: 10 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drag_spaces_events_by_move_delay() {
        let mut device = device();
        let delay = Duration::from_millis(100);
        let start = Instant::now();
        device
            .drag(Region::new(0, 0, 2, 2), Region::new(0, 60, 2, 2), delay)
            .await
            .unwrap();

        let moves = device
            .transport()
            .events()
            .iter()
            .filter(|e| matches!(e, InputEvent::PointerMove { .. }))
            .count() as u32;
        assert_eq!(moves, 2);
        assert_eq!(start.elapsed(), delay * (moves + 1));
    }

    #[test]
    fn drag_path_is_monotonic_and_bounded() {
        let path = drag_path((0, 0), (4000, 0));
        assert_eq!(path.len(), MAX_DRAG_STEPS as usize);
        assert!(path.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(path.last(), Some(&(4000, 0)));
    }

    #[tokio::test]
    async fn type_text_preserves_order_and_shift() {
        let mut device = device();
        device.type_text("aB1").await.unwrap();
        assert_eq!(
            device.transport().events(),
            vec![
                InputEvent::Key { key: KeyCode::A, action: KeyAction::DownAndUp, shift: false },
                InputEvent::Key { key: KeyCode::B, action: KeyAction::DownAndUp, shift: true },
                InputEvent::Key { key: KeyCode::Num1, action: KeyAction::DownAndUp, shift: false },
            ]
        );
    }

    #[tokio::test]
    async fn type_text_skips_and_reports_unmappable() {
        let mut device = device();
        let err = device.type_text("a€b✓").await.unwrap_err();
        assert!(matches!(
            err,
            VisionError::UnsupportedInput { character: '€', skipped: 2 }
        ));
        assert_eq!(device.transport().events().len(), 2, "mappable characters were sent");
    }

    #[tokio::test]
    async fn empty_text_sends_nothing() {
        let mut device = device();
        device.type_text("").await.unwrap();
        assert!(device.transport().events().is_empty());
    }

    #[tokio::test]
    async fn unreachable_device_is_reported() {
        let device_mock = MockDevice::blank(10, 10);
        device_mock.set_reachable(false);
        let mut device = Device::new(device_mock);
        let err = device.tap(Region::new(0, 0, 4, 4)).await.unwrap_err();
        assert!(err.is_device_unavailable());
        assert_eq!(device.events_sent(), 0);
    }
}
