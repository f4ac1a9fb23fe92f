//! Base types used throughout [`slwm`]

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

// Re-export
pub(crate) use x11rb::protocol::xproto::{Atom, Colormap, Keycode, Window};

/// A keyboard symbol, as found in `X11/keysymdef.h`
pub(crate) type Keysym = u32;
/// A color value as understood by the server
pub(crate) type Pixel = u32;

/// Window manager's name
pub(crate) const WM_NAME: &str = "slwm";

/// Distance moved by a single keyboard nudge
pub(crate) const MOVE_STEP: i32 = 16;
/// Resize step used when a client gives no useful increment
pub(crate) const DEFAULT_INCREMENT: i32 = 16;
/// Raw `_NET_WM_DESKTOP` value of a window shown on every desktop
pub(crate) const DESKTOP_FIXED_RAW: u32 = 0xFFFF_FFFF;

// ============================== Desktop ============================= [[[

/// Virtual desktop membership of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Desktop {
    /// Shown only while this desktop is current
    Index(u32),
    /// Shown on every desktop
    Fixed,
}

impl Desktop {
    /// Convert from the `_NET_WM_DESKTOP` representation
    pub(crate) const fn from_raw(raw: u32) -> Self {
        if raw == DESKTOP_FIXED_RAW {
            Self::Fixed
        } else {
            Self::Index(raw)
        }
    }

    /// Convert to the `_NET_WM_DESKTOP` representation
    pub(crate) const fn to_raw(self) -> u32 {
        match self {
            Self::Index(idx) => idx,
            Self::Fixed => DESKTOP_FIXED_RAW,
        }
    }

    /// Is this the sticky pseudo-desktop
    pub(crate) const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed)
    }
}

impl fmt::Display for Desktop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "{}", idx),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

// ]]] === Desktop ===

// ============================== Action ============================== [[[

/// Something a key binding can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab_case")]
pub(crate) enum Action {
    /// Launch the configured terminal
    Spawn,
    /// Cycle focus through visible windows while the key is held
    Next,
    /// Show or hide windows that identify as docks
    DockToggle,
    /// Switch to a desktop by index
    Desktop(u32),
    /// Switch to the desktop before the current one
    PrevDesktop,
    /// Switch to the desktop after the current one
    NextDesktop,
    /// Switch back to the previously shown desktop
    ToggleDesktop,
    /// Move left, or shrink horizontally with the alt modifier
    MoveLeft,
    /// Move down, or grow vertically with the alt modifier
    MoveDown,
    /// Move up, or shrink vertically with the alt modifier
    MoveUp,
    /// Move right, or grow horizontally with the alt modifier
    MoveRight,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Ask the client to close; with the alt modifier, kill it
    Kill,
    /// Put the client at the bottom of the stack
    Lower,
    /// Toggle maximisation in both directions
    Maximise,
    /// Toggle vertical maximisation
    MaximiseVert,
    /// Toggle between the current desktop and every desktop
    Fix,
}

impl Action {
    /// Does this action operate on the focused client
    pub(crate) const fn needs_client(self) -> bool {
        !matches!(
            self,
            Self::Spawn
                | Self::Next
                | Self::DockToggle
                | Self::Desktop(_)
                | Self::PrevDesktop
                | Self::NextDesktop
                | Self::ToggleDesktop
        )
    }
}

// ]]] === Action ===

// ============================= Maximise ============================= [[[

bitflags! {
    /// Axes a client is maximised along
    #[derive(Default)]
    pub(crate) struct Maximise: u8 {
        const HORZ = 0b01;
        const VERT = 0b10;
    }
}

/// What a `_NET_WM_STATE` request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    /// Convert the first data word of a `_NET_WM_STATE` message
    pub(crate) const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// The `_NET_WM_STATE` properties this window manager acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NetState {
    MaximizedVert,
    MaximizedHorz,
    Fullscreen,
}

impl NetState {
    /// The axes implied by this state
    pub(crate) const fn axes(self) -> Maximise {
        match self {
            Self::MaximizedVert => Maximise::VERT,
            Self::MaximizedHorz => Maximise::HORZ,
            Self::Fullscreen => Maximise::all(),
        }
    }
}

// ]]] === Maximise ===

#[cfg(test)]
mod tests {
    use super::{Action, Desktop, Maximise, NetState, StateAction};

    #[test]
    fn desktop_raw_conversion() {
        assert_eq!(Desktop::from_raw(0xFFFF_FFFF), Desktop::Fixed);
        assert_eq!(Desktop::from_raw(3), Desktop::Index(3));
        assert_eq!(Desktop::Fixed.to_raw(), 0xFFFF_FFFF);
        assert!(!Desktop::Index(0).is_fixed());
    }

    #[test]
    fn fullscreen_is_both_axes() {
        assert_eq!(
            NetState::Fullscreen.axes(),
            NetState::MaximizedVert.axes() | NetState::MaximizedHorz.axes()
        );
        assert_eq!(NetState::Fullscreen.axes(), Maximise::HORZ | Maximise::VERT);
    }

    #[test]
    fn state_actions() {
        assert_eq!(StateAction::from_raw(0), Some(StateAction::Remove));
        assert_eq!(StateAction::from_raw(2), Some(StateAction::Toggle));
        assert_eq!(StateAction::from_raw(3), None);
    }

    #[test]
    fn action_names() {
        assert_eq!(Action::MaximiseVert.to_string(), "maximise-vert");
        assert!(Action::Lower.needs_client());
        assert!(!Action::Desktop(2).needs_client());
    }
}
