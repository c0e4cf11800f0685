//! Polling search: capture, match, sleep, until found or out of time

use super::capture::capture;
use super::frame::Frame;
use super::matcher::{Match, TemplateMatcher};
use super::region::Region;
use super::template::Template;
use crate::adb::DeviceTransport;
use crate::error::VisionResult;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on the sleep between polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of a polling search
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollState<T = Match> {
    Polling { attempt: u32 },
    Found(T),
    TimedOut { attempts: u32 },
}

/// Sleep between polls: a quarter of the timeout at most, so any nonzero
/// timeout leaves room for a retry
pub fn poll_interval(timeout: Duration) -> Duration {
    POLL_INTERVAL.min(timeout / 4)
}

/// Poll until `template` shows up or `timeout` has elapsed.
///
/// The first poll happens immediately and a zero timeout means exactly one
/// poll. Device errors end the wait at once.
pub async fn wait_for<T: DeviceTransport>(
    device: &T,
    matcher: &TemplateMatcher,
    template: &Template,
    roi: Option<Region>,
    timeout: Duration,
) -> VisionResult<Option<Match>> {
    let state = poll_until(device, timeout, template.name(), |frame| {
        matcher.locate_in(frame, template, roi)
    })
    .await?;
    Ok(match state {
        PollState::Found(m) => Some(m),
        _ => None,
    })
}

/// Poll until `template` can no longer be located. Returns `true` once it is
/// gone, `false` if it was still visible when time ran out.
pub async fn wait_vanish<T: DeviceTransport>(
    device: &T,
    matcher: &TemplateMatcher,
    template: &Template,
    roi: Option<Region>,
    timeout: Duration,
) -> VisionResult<bool> {
    let state = poll_until(device, timeout, template.name(), |frame| {
        match matcher.locate_in(frame, template, roi) {
            Some(_) => None,
            None => Some(()),
        }
    })
    .await?;
    Ok(matches!(state, PollState::Found(_)))
}

/// Capture and run `check` until it yields a value or `timeout` elapses.
/// The loop behind [`wait_for`] and [`wait_vanish`].
pub async fn poll_until<T, F, R>(device: &T, timeout: Duration, label: &str, mut check: F) -> VisionResult<PollState<R>>
where
    T: DeviceTransport,
    F: FnMut(&Frame) -> Option<R>,
{
    let started = Instant::now();
    let interval = poll_interval(timeout);
    let mut state = PollState::Polling { attempt: 1 };

    while let PollState::Polling { attempt } = state {
        let frame = capture(device).await?;
        let found = check(&frame);
        // Sampled after the match so its cost counts against the budget
        let elapsed = started.elapsed();
        log::debug!(
            "Poll #{attempt} for '{label}' on frame #{} ({:?}/{:?})",
            frame.index(),
            elapsed,
            timeout
        );

        state = if let Some(found) = found {
            PollState::Found(found)
        } else if elapsed >= timeout {
            PollState::TimedOut { attempts: attempt }
        } else {
            let remaining = timeout.saturating_sub(elapsed);
            let nap = if interval.is_zero() {
                remaining
            } else {
                interval.min(remaining)
            };
            tokio::time::sleep(nap).await;
            PollState::Polling { attempt: attempt + 1 }
        };
    }

    if let PollState::TimedOut { attempts } = state {
        log::debug!("'{label}' timed out after {attempts} poll(s) in {timeout:?}");
    }
    Ok(state)
}
