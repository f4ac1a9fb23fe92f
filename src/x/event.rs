//! X11 Events
//!
//! Everything the server sends is translated into an [`XEvent`] before the
//! window manager sees it. Atoms are already resolved at that point, so
//! handlers only ever match on plain Rust values.

use crate::{
    core::{Atom, Colormap, Keycode, NetState, Window},
    geometry::{ConfigMask, Point, WindowChanges},
};

// ============================== XEvent ==============================

/// Low-level wrapper around X-server events
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XEvent {
    /// A key combination was pressed
    KeyPress(KeyEvent),
    /// A key was released
    KeyRelease(KeyEvent),
    /// A mouse button was pressed
    ButtonPress(ButtonEvent),
    /// A mouse button was released
    ButtonRelease(ButtonEvent),
    /// The pointer moved while grabbed
    Motion(MotionEvent),
    /// Request for configuration from a client
    ConfigureRequest(ConfigureRequest),
    /// A client is requesting to be mapped
    MapRequest(Window),
    /// A window (client or frame) was unmapped
    UnmapNotify(Window),
    /// A client installed a colormap
    ColormapNotify {
        window:   Window,
        colormap: Colormap,
        new:      bool,
    },
    /// A window property was changed
    PropertyNotify { window: Window, kind: PropertyKind },
    /// The pointer has entered a window
    EnterNotify(Window),
    /// The keyboard or modifier mapping changed
    MappingNotify { keyboard: bool },
    /// A client message was received
    ClientMessage {
        window:  Window,
        request: ClientRequest,
    },
    /// The bounding shape of a window changed
    ShapeNotify(Window),
    /// The size of a screen changed
    ScreenChange {
        root:   Window,
        width:  i32,
        height: i32,
    },
    /// Unknown event type, used as a catchall for events not tracked
    Unknown(u8),
}

/// Data associated with a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyEvent {
    /// Root window of the screen the event happened on
    pub(crate) root:    Window,
    /// Window the event was reported relative to
    pub(crate) window:  Window,
    /// The physical key
    pub(crate) keycode: Keycode,
    /// Modifier and button state at the time of the event
    pub(crate) state:   u16,
}

/// Data associated with a button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ButtonEvent {
    pub(crate) root:     Window,
    pub(crate) window:   Window,
    pub(crate) button:   u8,
    pub(crate) state:    u16,
    /// Pointer position relative to the root
    pub(crate) root_pos: Point,
}

/// Data associated with pointer motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MotionEvent {
    pub(crate) root:     Window,
    /// Pointer position relative to the root
    pub(crate) root_pos: Point,
}

/// Data associated with a configure request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfigureRequest {
    /// The window asking to be configured
    pub(crate) window:  Window,
    /// Fields of `changes` that were requested
    pub(crate) mask:    ConfigMask,
    pub(crate) changes: WindowChanges,
}

/// Properties whose changes are acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyKind {
    /// `WM_NORMAL_HINTS`
    NormalHints,
    /// `_NET_WM_WINDOW_TYPE`
    WindowType,
    /// Anything else
    Other,
}

// ========================== EventFilter =============================

/// Restricts which events a nested loop consumes. Events that don't pass are
/// kept for the main loop in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventFilter {
    /// Key presses and releases
    Keyboard,
    /// Button presses, releases and motion
    Pointer,
}

impl EventFilter {
    /// Does the event pass the filter
    pub(crate) const fn matches(self, event: &XEvent) -> bool {
        match self {
            Self::Keyboard => matches!(event, XEvent::KeyPress(_) | XEvent::KeyRelease(_)),
            Self::Pointer => matches!(
                event,
                XEvent::ButtonPress(_) | XEvent::ButtonRelease(_) | XEvent::Motion(_)
            ),
        }
    }
}

// ======================= Source Indication ==========================

/// Who sent an EWMH request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceIndication {
    /// Clients that predate source indications
    Unspecified,
    /// A normal application
    Application,
    /// A pager or task bar acting on behalf of the user
    Pager,
    /// Reserved values
    Reserved(u32),
}

impl SourceIndication {
    /// Convert the raw protocol value
    pub(crate) const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Unspecified,
            1 => Self::Application,
            2 => Self::Pager,
            other => Self::Reserved(other),
        }
    }

    /// The raw protocol value
    pub(crate) const fn to_raw(self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Application => 1,
            Self::Pager => 2,
            Self::Reserved(other) => other,
        }
    }

    /// Requests are only honoured when they came from direct user action
    pub(crate) const fn is_user_action(self) -> bool {
        matches!(self, Self::Pager)
    }
}

// ========================= MoveResizeFlags ==========================

/// The first data word of `_NET_MOVERESIZE_WINDOW`.
///
/// Bits `0-7` are the gravity, bits `8-11` say which of x/y/width/height are
/// present and bits `12-13` are the source indication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MoveResizeFlags {
    /// Protocol gravity value, `0` meaning the client's own
    pub(crate) gravity: u32,
    /// Fields present in the message, always a subset of `X|Y|WIDTH|HEIGHT`
    pub(crate) mask:    ConfigMask,
    pub(crate) source:  SourceIndication,
}

impl MoveResizeFlags {
    /// Unpack from the raw data word
    pub(crate) fn decode(raw: u32) -> Self {
        Self {
            gravity: raw & 0xff,
            mask:    ConfigMask::from_bits_truncate(((raw >> 8) & 0x0f) as u16),
            source:  SourceIndication::from_raw((raw >> 12) & 0x03),
        }
    }

    /// Pack into the raw data word
    pub(crate) fn encode(self) -> u32 {
        (self.gravity & 0xff)
            | (u32::from(self.mask.bits() & 0x0f) << 8)
            | ((self.source.to_raw() & 0x03) << 12)
    }
}

// =========================== ClientRequest ==========================

/// EWMH client message types this window manager answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    CurrentDesktop,
    RequestFrameExtents,
    ActiveWindow,
    CloseWindow,
    MoveResizeWindow,
    RestackWindow,
    WmDesktop,
    WmState,
}

/// A decoded client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientRequest {
    /// `_NET_CURRENT_DESKTOP`
    CurrentDesktop(u32),
    /// `_NET_REQUEST_FRAME_EXTENTS`
    RequestFrameExtents,
    /// `_NET_ACTIVE_WINDOW`
    ActiveWindow { source: SourceIndication },
    /// `_NET_CLOSE_WINDOW`
    CloseWindow { source: SourceIndication },
    /// `_NET_MOVERESIZE_WINDOW`
    MoveResize {
        flags:   MoveResizeFlags,
        changes: WindowChanges,
    },
    /// `_NET_RESTACK_WINDOW`
    Restack {
        source:     SourceIndication,
        sibling:    Window,
        stack_mode: u32,
    },
    /// `_NET_WM_DESKTOP`
    WmDesktop {
        desktop: u32,
        source:  SourceIndication,
    },
    /// `_NET_WM_STATE`, with up to two properties
    WmState {
        action: u32,
        first:  Option<NetState>,
        second: Option<NetState>,
    },
    /// Any other message type
    Unknown(Atom),
}

impl ClientRequest {
    /// Decode the 32-bit data words of a message of a known type.
    /// `net_state` maps a property atom to the state it names
    pub(crate) fn decode<F>(kind: MessageKind, data: [u32; 5], net_state: F) -> Self
    where
        F: Fn(Atom) -> Option<NetState>,
    {
        match kind {
            MessageKind::CurrentDesktop => Self::CurrentDesktop(data[0]),
            MessageKind::RequestFrameExtents => Self::RequestFrameExtents,
            MessageKind::ActiveWindow => Self::ActiveWindow {
                source: SourceIndication::from_raw(data[0]),
            },
            MessageKind::CloseWindow => Self::CloseWindow {
                source: SourceIndication::from_raw(data[1]),
            },
            MessageKind::MoveResizeWindow => Self::MoveResize {
                flags:   MoveResizeFlags::decode(data[0]),
                changes: WindowChanges {
                    x: coordinate(data[1]),
                    y: coordinate(data[2]),
                    width: extent(data[3]),
                    height: extent(data[4]),
                    ..WindowChanges::default()
                },
            },
            MessageKind::RestackWindow => Self::Restack {
                source:     SourceIndication::from_raw(data[0]),
                sibling:    data[1],
                stack_mode: data[2],
            },
            MessageKind::WmDesktop => Self::WmDesktop {
                desktop: data[0],
                source:  SourceIndication::from_raw(data[1]),
            },
            MessageKind::WmState => Self::WmState {
                action: data[0],
                first:  net_state(data[1]),
                second: net_state(data[2]),
            },
        }
    }
}

/// A position from a 32 bit message word. Positions are 16 bits on the wire
fn coordinate(raw: u32) -> i32 {
    (raw as i32).clamp(i16::MIN.into(), i16::MAX.into())
}

/// A size from a 32 bit message word. Sizes are unsigned 16 bits on the wire
fn extent(raw: u32) -> i32 {
    (raw as i32).clamp(0, u16::MAX.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Maximise;

    #[test]
    fn moveresize_flags_boundaries() {
        let zero = MoveResizeFlags::decode(0);
        assert_eq!(zero.gravity, 0);
        assert!(zero.mask.is_empty());
        assert_eq!(zero.source, SourceIndication::Unspecified);

        let gravity_only = MoveResizeFlags::decode(0xff);
        assert_eq!(gravity_only.gravity, 0xff);
        assert!(gravity_only.mask.is_empty());
        assert_eq!(gravity_only.source, SourceIndication::Unspecified);

        let mask_only = MoveResizeFlags::decode(0x0f << 8);
        assert_eq!(mask_only.gravity, 0);
        assert_eq!(mask_only.mask, ConfigMask::POSITION | ConfigMask::SIZE);

        let full = MoveResizeFlags::decode(0x2f_ff | (1 << 14));
        assert_eq!(full.gravity, 0xff);
        assert_eq!(full.mask, ConfigMask::POSITION | ConfigMask::SIZE);
        assert_eq!(full.source, SourceIndication::Pager);
    }

    #[test]
    fn moveresize_flags_reencode() {
        for raw in [0_u32, 0xff, 0x0f00, 0x1a05, 0x2305, 0x3fff] {
            assert_eq!(MoveResizeFlags::decode(raw).encode(), raw);
        }

        let flags = MoveResizeFlags {
            gravity: 9,
            mask:    ConfigMask::WIDTH | ConfigMask::HEIGHT,
            source:  SourceIndication::Pager,
        };
        assert_eq!(flags.encode(), 0x2c09);
    }

    #[test]
    fn decode_moveresize_message() {
        let request = ClientRequest::decode(
            MessageKind::MoveResizeWindow,
            [0x2305, 10, (-20_i32) as u32, 300, 200],
            |_| None,
        );

        match request {
            ClientRequest::MoveResize { flags, changes } => {
                assert_eq!(flags.gravity, 5);
                assert_eq!(flags.mask, ConfigMask::POSITION);
                assert!(flags.source.is_user_action());
                assert_eq!((changes.x, changes.y), (10, -20));
                assert_eq!((changes.width, changes.height), (300, 200));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn moveresize_values_fit_the_wire() {
        let request = ClientRequest::decode(
            MessageKind::MoveResizeWindow,
            [0x2f01, 0x8000_0000, 0x7fff_ffff, 0x8000_0000, 0x1_0000],
            |_| None,
        );

        match request {
            ClientRequest::MoveResize { changes, .. } => {
                assert_eq!((changes.x, changes.y), (-32768, 32767));
                assert_eq!((changes.width, changes.height), (0, 65535));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_wm_state_message() {
        let net_state = |atom| match atom {
            100 => Some(NetState::MaximizedVert),
            101 => Some(NetState::MaximizedHorz),
            102 => Some(NetState::Fullscreen),
            _ => None,
        };

        let request = ClientRequest::decode(MessageKind::WmState, [2, 100, 101, 1, 0], net_state);
        assert_eq!(request, ClientRequest::WmState {
            action: 2,
            first:  Some(NetState::MaximizedVert),
            second: Some(NetState::MaximizedHorz),
        });

        let request = ClientRequest::decode(MessageKind::WmState, [1, 102, 0, 0, 0], net_state);
        if let ClientRequest::WmState { first, second, .. } = request {
            let axes = first.map_or(Maximise::empty(), NetState::axes)
                | second.map_or(Maximise::empty(), NetState::axes);
            assert_eq!(axes, Maximise::all());
        } else {
            panic!("expected a state request");
        }
    }

    #[test]
    fn source_indications_use_the_right_word() {
        let close = ClientRequest::decode(MessageKind::CloseWindow, [0, 2, 0, 0, 0], |_| None);
        assert_eq!(close, ClientRequest::CloseWindow {
            source: SourceIndication::Pager,
        });

        let desktop = ClientRequest::decode(MessageKind::WmDesktop, [3, 1, 0, 0, 0], |_| None);
        assert_eq!(desktop, ClientRequest::WmDesktop {
            desktop: 3,
            source:  SourceIndication::Application,
        });

        let active = ClientRequest::decode(MessageKind::ActiveWindow, [7, 0, 0, 0, 0], |_| None);
        assert_eq!(active, ClientRequest::ActiveWindow {
            source: SourceIndication::Reserved(7),
        });
    }

    #[test]
    fn filters() {
        let key = XEvent::KeyRelease(KeyEvent {
            root:    1,
            window:  1,
            keycode: 23,
            state:   0,
        });
        let motion = XEvent::Motion(MotionEvent {
            root:     1,
            root_pos: Point::new(0, 0),
        });

        assert!(EventFilter::Keyboard.matches(&key));
        assert!(!EventFilter::Keyboard.matches(&motion));
        assert!(EventFilter::Pointer.matches(&motion));
        assert!(!EventFilter::Pointer.matches(&XEvent::EnterNotify(4)));
    }
}
