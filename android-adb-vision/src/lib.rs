pub mod adb;
pub mod device;
pub mod error;
pub mod input;
pub mod screen;
pub mod session;
pub mod settings;
pub mod vision;

pub use adb::{AdbBackend, AdbImpl, DeviceTransport, MockDevice};
pub use device::Device;
pub use error::{VisionError, VisionResult};
pub use input::{InputEvent, KeyAction, KeyCode};
pub use screen::Screen;
pub use session::Session;
pub use settings::Settings;
pub use vision::{Frame, Match, Region, TemplateMatcher};
