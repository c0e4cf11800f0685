// ADB module - device transports
// Everything the engine needs from a device goes through `DeviceTransport`:
// geometry, screen capture and input events. ADB backends drive real
// hardware or emulators; `MockDevice` replays scripted frames.

pub mod backend;
pub mod error;
pub mod mock;
pub mod rust_impl;
pub mod shell;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export the main types and functions for easy access
pub use backend::{AdbBackend, AdbImpl};
pub use error::{AdbError, AdbResult};
pub use mock::MockDevice;
pub use rust_impl::RustAdb;
pub use shell::AdbShell;
pub use types::{AdbDevice, DeviceTransport, ImageCapture};
