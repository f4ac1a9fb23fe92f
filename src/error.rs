//! Errors found throughout this crate

use thiserror::Error;
use x11rb::errors::ConnectError;

/// Errors that occur from interacting with the X-Server or the configuration
#[derive(Debug, Error)]
pub(crate) enum Error {
    /// Failure to connect to the server
    #[error("failed to connect to the X11 server: {0}")]
    Connection(#[from] ConnectError),

    /// Substructure redirection on the root is owned by someone else
    #[error("another window manager is already running on screen {0}")]
    AnotherWmRunning(usize),

    /// A key binding names a keysym that is not known
    #[error("unknown keysym name: {0:?}")]
    UnknownKeysym(String),

    /// A color could not be parsed
    #[error("invalid color {0:?}, expected `#rrggbb`")]
    InvalidColor(String),

    /// No keycode produces the given keysym with the current keyboard mapping
    #[error("keysym {0:#x} is not on the keyboard")]
    UnmappedKeysym(u32),
}
