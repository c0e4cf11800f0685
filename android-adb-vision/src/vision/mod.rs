// Vision module - frames, templates and the matcher
// Captured frames are searched for named reference images; the polling wait
// repeats capture + match until a template appears (or disappears).

pub mod capture;
pub mod frame;
pub mod matcher;
pub mod region;
pub mod template;
pub mod wait;


pub use capture::{bounds, capture};
pub use frame::Frame;
pub use matcher::{DEFAULT_SIMILARITY, Match, TemplateMatcher};
pub use region::Region;
pub use template::{Template, TemplateLibrary};
pub use wait::{POLL_INTERVAL, PollState, poll_interval, poll_until, wait_for, wait_vanish};
