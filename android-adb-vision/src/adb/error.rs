use thiserror::Error;

/// A specialized `Result` type for ADB transport operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for everything that talks to a device.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error(
        "'adb' binary not usable: {description}. Install Android Platform Tools or switch to --impl=rust."
    )]
    AdbNotInstalled { description: String },

    #[error("Failed to run '{command}': {source}")]
    CommandSpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' exited with failure: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Shell command '{command}' failed: {source}")]
    ShellCommandFailed {
        command: String,
        source: adb_client::RustADBError,
    },

    #[error("Failed to talk to the ADB server: {source}")]
    ServerFailed {
        #[from]
        source: adb_client::RustADBError,
    },

    #[error("No devices found")]
    NoDevices,

    #[error("Device '{name}' not found")]
    DeviceNotFound { name: String },

    #[error("Device '{name}' is not reachable")]
    Unreachable { name: String },

    #[error("Operation timed out after {duration:?}: {description}")]
    Timeout {
        duration: std::time::Duration,
        description: String,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("Could not parse screen size from 'wm size' output.")]
    ScreenSizeParseFailed,

    #[error("Screen capture returned no data")]
    EmptyCapture,
}
