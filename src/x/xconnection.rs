//! The connection to the X-Server
//!
//! [`XConn`] is the only way the window manager talks to the display. The
//! real implementation, [`XConnection`], wraps an [`x11rb`] connection; tests
//! use a recording mock instead.

use crate::{
    core::{Atom, Colormap, Desktop, Keycode, Keysym, Maximise, NetState, Pixel, Window, WM_NAME},
    error::Error,
    geometry::{ConfigMask, Dimension, Geometry, Point, WindowChanges},
    x::{
        event::{
            ButtonEvent,
            ClientRequest,
            ConfigureRequest,
            EventFilter,
            KeyEvent,
            MessageKind,
            MotionEvent,
            PropertyKind,
            XEvent,
        },
        input::{lock_variants, KeyboardMapping},
        property::{IcccmWindowState, SizeHints, WindowAttributes},
    },
};
use anyhow::{anyhow, Context, Result};
use nix::{
    errno::Errno,
    poll::{poll, PollFd, PollFlags},
};
use std::{cell::RefCell, collections::VecDeque, os::unix::io::AsRawFd};
use x11rb::{
    atom_manager,
    connection::{Connection, RequestConnection},
    cursor::Handle as CursorHandle,
    errors::ReplyError,
    properties::{WmSizeHints, WmSizeHintsSpecification},
    protocol::{
        xproto::{
            self,
            AtomEnum,
            ButtonIndex,
            ChangeWindowAttributesAux,
            ClientMessageEvent,
            ConfigureNotifyEvent,
            ConfigureWindowAux,
            ConnectionExt as _,
            CreateWindowAux,
            EventMask,
            Grab,
            GrabMode,
            GrabStatus,
            InputFocus,
            MapState,
            Mapping,
            ModMask,
            PropMode,
            SetMode,
            StackMode,
            WindowClass,
        },
        ErrorKind,
        Event,
    },
    resource_manager::Database,
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
};

#[cfg(feature = "randr")]
use x11rb::protocol::randr::{self, ConnectionExt as _};
#[cfg(feature = "shape")]
use x11rb::protocol::shape::{self, ConnectionExt as _};

// === Atoms === [[[

// Every `Atom` the window manager reads or writes. See the EWMH
// (https://specifications.freedesktop.org/wm-spec/wm-spec-latest.html) and
// ICCCM (https://tronche.com/gui/x/icccm/) documents for their meaning
atom_manager! {
    pub(crate) Atoms: AtomsCookie {
        UTF8_STRING,
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        WM_STATE,
        WM_NORMAL_HINTS,

        _NET_SUPPORTED,
        _NET_SUPPORTING_WM_CHECK,
        _NET_WM_NAME,
        _NET_CLIENT_LIST,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_CURRENT_DESKTOP,
        _NET_ACTIVE_WINDOW,
        _NET_CLOSE_WINDOW,
        _NET_MOVERESIZE_WINDOW,
        _NET_RESTACK_WINDOW,
        _NET_REQUEST_FRAME_EXTENTS,
        _NET_FRAME_EXTENTS,
        _NET_WM_DESKTOP,
        _NET_WM_STATE,
        _NET_WM_STATE_MAXIMIZED_VERT,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
    }
}

impl Atoms {
    /// The message kind a client message type names
    fn message_kind(&self, atom: Atom) -> Option<MessageKind> {
        let kinds = [
            (self._NET_CURRENT_DESKTOP, MessageKind::CurrentDesktop),
            (self._NET_REQUEST_FRAME_EXTENTS, MessageKind::RequestFrameExtents),
            (self._NET_ACTIVE_WINDOW, MessageKind::ActiveWindow),
            (self._NET_CLOSE_WINDOW, MessageKind::CloseWindow),
            (self._NET_MOVERESIZE_WINDOW, MessageKind::MoveResizeWindow),
            (self._NET_RESTACK_WINDOW, MessageKind::RestackWindow),
            (self._NET_WM_DESKTOP, MessageKind::WmDesktop),
            (self._NET_WM_STATE, MessageKind::WmState),
        ];

        kinds.iter().find(|(a, _)| *a == atom).map(|(_, k)| *k)
    }

    /// The state a `_NET_WM_STATE` property atom names
    fn net_state(&self, atom: Atom) -> Option<NetState> {
        if atom == self._NET_WM_STATE_MAXIMIZED_VERT {
            Some(NetState::MaximizedVert)
        } else if atom == self._NET_WM_STATE_MAXIMIZED_HORZ {
            Some(NetState::MaximizedHorz)
        } else if atom == self._NET_WM_STATE_FULLSCREEN {
            Some(NetState::Fullscreen)
        } else {
            None
        }
    }
}

// ]]] === Atoms ===

// ============================== XConn =============================== [[[

/// Root window and size of one screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RootInfo {
    pub(crate) root:   Window,
    pub(crate) width:  i32,
    pub(crate) height: i32,
}

/// Everything the window manager asks of the display server
pub(crate) trait XConn {
    // ========================== Events ========================== [[[

    /// Block until the next event. `None` when the wait was interrupted by a
    /// signal
    fn wait_for_event(&self) -> Result<Option<XEvent>>;

    /// Block until the next event that passes `filter`. Other events are kept,
    /// in order, for [`wait_for_event`](XConn::wait_for_event)
    fn wait_for_masked(&self, filter: EventFilter) -> Result<Option<XEvent>>;

    /// Drop every pointer crossing event generated so far
    fn discard_enter_events(&self) -> Result<()>;

    /// Flush all pending requests to the server
    fn flush(&self) -> bool;

    // ]]] === Events ===

    // ========================== Setup =========================== [[[

    /// The screens of the display
    fn screens(&self) -> Vec<RootInfo>;

    /// Take substructure redirection on `root` and publish EWMH support
    fn become_wm(&self, screen: usize, root: Window, num_desktops: u32) -> Result<()>;

    /// Top-level windows on `root` that are mapped and want to be managed
    fn existing_windows(&self, root: Window) -> Result<Vec<Window>>;

    // ]]] === Setup ===

    // ========================= Keyboard ========================= [[[

    /// The unshifted keysym of a keycode
    fn keycode_to_keysym(&self, code: Keycode) -> Keysym;

    /// Reload the keycode to keysym table
    fn refresh_keyboard_mapping(&self) -> Result<()>;

    /// Replace all passive key grabs on `root`
    fn grab_keys(&self, root: Window, bindings: &[(Keysym, u16)]) -> Result<()>;

    /// Actively grab the keyboard. `false` if someone else holds it
    fn grab_keyboard(&self, root: Window) -> Result<bool>;

    /// Release an active keyboard grab
    fn ungrab_keyboard(&self) -> Result<()>;

    // ]]] === Keyboard ===

    // ========================== Pointer ========================= [[[

    /// Actively grab the pointer. `false` if someone else holds it
    fn grab_pointer(&self, root: Window) -> Result<bool>;

    /// Release an active pointer grab
    fn ungrab_pointer(&self) -> Result<()>;

    /// Pointer position, if it is on the screen of `root`
    fn query_pointer(&self, root: Window) -> Result<Option<Point>>;

    /// Move the pointer to a position relative to `window`
    fn warp_pointer(&self, window: Window, pnt: Point) -> Result<()>;

    // ]]] === Pointer ===

    // ========================== Windows ========================= [[[

    fn window_attributes(&self, window: Window) -> Result<WindowAttributes>;

    /// `WM_NORMAL_HINTS`, empty when unset
    fn size_hints(&self, window: Window) -> SizeHints;

    /// Does `_NET_WM_WINDOW_TYPE` contain the dock type
    fn is_dock(&self, window: Window) -> bool;

    /// Raw `_NET_WM_DESKTOP` of a window
    fn window_desktop(&self, window: Window) -> Option<u32>;

    /// Create the frame a client will be reparented into
    fn create_frame(
        &self,
        root: Window,
        geom: &Geometry,
        border_color: Pixel,
        mouse_mask: u16,
    ) -> Result<Window>;

    fn reparent_window(&self, window: Window, parent: Window, pnt: Point) -> Result<()>;

    /// Add to (or remove from) the save-set
    fn change_save_set(&self, window: Window, insert: bool) -> Result<()>;

    /// Listen for the client events the window manager cares about
    fn select_client_input(&self, window: Window) -> Result<()>;

    fn map_window(&self, window: Window) -> Result<()>;

    fn unmap_window(&self, window: Window) -> Result<()>;

    fn destroy_window(&self, window: Window) -> Result<()>;

    fn raise_window(&self, window: Window) -> Result<()>;

    fn lower_window(&self, window: Window) -> Result<()>;

    /// Apply the fields of `changes` selected by `mask`
    fn configure_window(&self, window: Window, mask: ConfigMask, changes: &WindowChanges)
        -> Result<()>;

    fn move_resize_window(&self, window: Window, pnt: Point, dim: Dimension) -> Result<()>;

    /// Tell a client its real position with a synthetic `ConfigureNotify`
    fn send_configure_notify(&self, window: Window, geom: &Geometry) -> Result<()>;

    fn set_border_color(&self, window: Window, color: Pixel) -> Result<()>;

    fn set_border_width(&self, window: Window, width: i32) -> Result<()>;

    fn focus_window(&self, window: Window) -> Result<()>;

    /// Return input focus to whatever is under the pointer
    fn clear_focus(&self) -> Result<()>;

    fn install_colormap(&self, colormap: Colormap) -> Result<()>;

    /// Copy the bounding shape of `window` onto `frame`
    fn apply_shape(&self, window: Window, frame: Window) -> Result<()>;

    /// Ask a client to close, or disconnect it when `force` is set or it does
    /// not speak `WM_DELETE_WINDOW`
    fn close_window(&self, window: Window, force: bool) -> Result<()>;

    // ]]] === Windows ===

    // ======================== Properties ======================== [[[

    fn set_wm_state(&self, window: Window, state: IcccmWindowState) -> Result<()>;

    fn set_frame_extents(&self, window: Window, border: i32) -> Result<()>;

    fn set_active_window(&self, root: Window, window: Option<Window>) -> Result<()>;

    fn set_current_desktop(&self, root: Window, desktop: u32) -> Result<()>;

    fn set_window_desktop(&self, window: Window, desktop: Desktop) -> Result<()>;

    fn set_client_list(&self, root: Window, windows: &[Window]) -> Result<()>;

    fn set_net_wm_state(&self, window: Window, maximised: Maximise) -> Result<()>;

    /// Remove the EWMH properties owned by the window manager
    fn remove_window_properties(&self, window: Window) -> Result<()>;

    // ]]] === Properties ===
}

// ]]] === XConn ===

// =========================== XConnection ============================ [[[

/// Events delivered on the root and frames
const ROOT_EVENT_MASK: u32 = 0x0010_0000 // SUBSTRUCTURE_REDIRECT
    | 0x0008_0000 // SUBSTRUCTURE_NOTIFY
    | 0x0000_0010 // ENTER_WINDOW
    | 0x0080_0000 // COLOR_MAP_CHANGE
    | 0x0040_0000; // PROPERTY_CHANGE

/// The main connection to the X-Server
pub(crate) struct XConnection {
    /// Connection to the X-Server
    conn:    RustConnection,
    /// Interned atoms
    atoms:   Atoms,
    /// The keycode to keysym table
    mapping: RefCell<KeyboardMapping>,
    /// Events read while a nested loop was filtering
    pending: RefCell<VecDeque<XEvent>>,
}

impl XConnection {
    /// Connect to `display` (or `$DISPLAY`)
    pub(crate) fn new(display: Option<&str>) -> Result<Self> {
        log::trace!("creating a new `XConnection`");
        let (conn, _screen_num) = x11rb::connect(display).map_err(Error::Connection)?;

        Self::check_extensions(&conn).context("failed to query extensions")?;

        let atoms = Atoms::new(&conn)
            .context("failed to intern atoms")?
            .reply()
            .context("failed to get interned atoms")?;

        let xconn = Self {
            mapping: RefCell::new(Self::load_mapping(&conn)?),
            pending: RefCell::new(VecDeque::new()),
            conn,
            atoms,
        };

        Ok(xconn)
    }

    // ========================= Accessor ========================= [[[

    /// Return the connection to the X-Server
    pub(crate) const fn aux(&self) -> &RustConnection {
        &self.conn
    }

    /// Return the interned atoms
    pub(crate) const fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    // ]]] === Accessor ===

    // ======================== Initialize ======================== [[[

    /// Check that the extensions compiled in are available on the server
    fn check_extensions(conn: &RustConnection) -> Result<()> {
        log::debug!("checking that extensions are installed");

        #[cfg(feature = "shape")]
        {
            if conn.extension_information(shape::X11_EXTENSION_NAME)?.is_none() {
                return Err(anyhow!("the `shape` X11 extension is unsupported"));
            }
            conn.shape_query_version()
                .context("failed to query `shape` version")?
                .reply()
                .context("failed to get `shape` version")?;
            log::debug!("`shape` extension is available");
        }

        #[cfg(feature = "randr")]
        {
            if conn.extension_information(randr::X11_EXTENSION_NAME)?.is_none() {
                return Err(anyhow!("the `randr` X11 extension is unsupported"));
            }
            let (min, max) = randr::X11_XML_VERSION;
            conn.randr_query_version(min, max)
                .context("failed to query `randr` version")?
                .reply()
                .context("failed to get `randr` version")?;
            log::debug!("`randr` extension is up to date: {}-{}", min, max);
        }

        Ok(())
    }

    /// Fetch the keyboard mapping for every keycode
    fn load_mapping(conn: &RustConnection) -> Result<KeyboardMapping> {
        let setup = conn.setup();
        let count = setup.max_keycode - setup.min_keycode + 1;

        let reply = conn
            .get_keyboard_mapping(setup.min_keycode, count)
            .context("failed to request the keyboard mapping")?
            .reply()
            .context("failed to get the keyboard mapping")?;

        Ok(KeyboardMapping {
            min_keycode:         setup.min_keycode,
            keysyms_per_keycode: reply.keysyms_per_keycode,
            keysyms:             reply.keysyms,
        })
    }

    /// Set the root cursor to `left_ptr`
    fn init_cursor(&self, screen: usize, root: Window) {
        log::debug!("initializing the Cursor to `left_ptr`");
        let db = match Database::new_from_default(&self.conn) {
            Ok(db) => db,
            Err(e) => {
                log::warn!("failed to read the resource database: {}", e);
                return;
            },
        };
        let cursor = CursorHandle::new(&self.conn, screen, &db)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|handle| handle.load_cursor(&self.conn, "left_ptr").ok());

        if let Some(cursor) = cursor {
            if let Err(e) = self
                .conn
                .change_window_attributes(root, &ChangeWindowAttributesAux::new().cursor(cursor))
            {
                log::warn!("failed to set the root cursor: {}", e);
            }
        }
    }

    // ]]] === Initialize ===

    // ======================== Translation ======================= [[[

    /// Translate a server event
    fn classify(&self, event: Event) -> XEvent {
        match event {
            Event::KeyPress(e) => XEvent::KeyPress(KeyEvent {
                root:    e.root,
                window:  e.event,
                keycode: e.detail,
                state:   u16::from(e.state),
            }),
            Event::KeyRelease(e) => XEvent::KeyRelease(KeyEvent {
                root:    e.root,
                window:  e.event,
                keycode: e.detail,
                state:   u16::from(e.state),
            }),
            Event::ButtonPress(e) => XEvent::ButtonPress(ButtonEvent {
                root:     e.root,
                window:   e.event,
                button:   e.detail,
                state:    u16::from(e.state),
                root_pos: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
            }),
            Event::ButtonRelease(e) => XEvent::ButtonRelease(ButtonEvent {
                root:     e.root,
                window:   e.event,
                button:   e.detail,
                state:    u16::from(e.state),
                root_pos: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
            }),
            Event::MotionNotify(e) => XEvent::Motion(MotionEvent {
                root:     e.root,
                root_pos: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
            }),
            Event::ConfigureRequest(e) => XEvent::ConfigureRequest(ConfigureRequest {
                window:  e.window,
                mask:    ConfigMask::from_bits_truncate(u16::from(e.value_mask)),
                changes: WindowChanges {
                    x:            i32::from(e.x),
                    y:            i32::from(e.y),
                    width:        i32::from(e.width),
                    height:       i32::from(e.height),
                    border_width: i32::from(e.border_width),
                    sibling:      e.sibling,
                    stack_mode:   u32::from(e.stack_mode),
                },
            }),
            Event::MapRequest(e) => XEvent::MapRequest(e.window),
            Event::UnmapNotify(e) => XEvent::UnmapNotify(e.window),
            Event::ColormapNotify(e) => XEvent::ColormapNotify {
                window:   e.window,
                colormap: e.colormap,
                new:      e.new,
            },
            Event::PropertyNotify(e) => XEvent::PropertyNotify {
                window: e.window,
                kind:   if e.atom == self.atoms.WM_NORMAL_HINTS {
                    PropertyKind::NormalHints
                } else if e.atom == self.atoms._NET_WM_WINDOW_TYPE {
                    PropertyKind::WindowType
                } else {
                    PropertyKind::Other
                },
            },
            Event::EnterNotify(e) => XEvent::EnterNotify(e.event),
            Event::MappingNotify(e) => XEvent::MappingNotify {
                keyboard: e.request == Mapping::KEYBOARD,
            },
            Event::ClientMessage(e) => {
                let request = match (e.format, self.atoms.message_kind(e.type_)) {
                    (32, Some(kind)) => ClientRequest::decode(kind, e.data.as_data32(), |atom| {
                        self.atoms.net_state(atom)
                    }),
                    _ => ClientRequest::Unknown(e.type_),
                };

                XEvent::ClientMessage { window: e.window, request }
            },
            #[cfg(feature = "shape")]
            Event::ShapeNotify(e) => XEvent::ShapeNotify(e.affected_window),
            #[cfg(feature = "randr")]
            Event::RandrScreenChangeNotify(e) => XEvent::ScreenChange {
                root:   e.root,
                width:  i32::from(e.width),
                height: i32::from(e.height),
            },
            Event::Error(e) => {
                log::debug!("X11 error: {:?}", e);
                XEvent::Unknown(0)
            },
            other => XEvent::Unknown(other.response_type()),
        }
    }

    /// Read the next event from the server. With `block`, sleep on the
    /// connection until something arrives or a signal interrupts the wait
    fn next_from_server(&self, block: bool) -> Result<Option<XEvent>> {
        if let Some(event) = self
            .conn
            .poll_for_event()
            .context("failed to poll for next event")?
        {
            return Ok(Some(self.classify(event)));
        }

        if !block {
            return Ok(None);
        }

        self.flush();
        let mut fds = [PollFd::new(self.conn.stream().as_raw_fd(), PollFlags::POLLIN)];

        match poll(&mut fds, -1) {
            Ok(_) => Ok(self
                .conn
                .poll_for_event()
                .context("failed to poll for next event")?
                .map(|event| self.classify(event))),
            Err(Errno::EINTR) => {
                log::trace!("wait for an event was interrupted");
                Ok(None)
            },
            Err(e) => Err(e).context("failed to wait on the X11 connection"),
        }
    }

    /// Does the client speak `WM_DELETE_WINDOW`
    fn supports_delete(&self, window: Window) -> bool {
        self.conn
            .get_property(
                false,
                window,
                self.atoms.WM_PROTOCOLS,
                AtomEnum::ATOM,
                0,
                u32::MAX,
            )
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| {
                reply
                    .value32()
                    .map(|mut atoms| atoms.any(|a| a == self.atoms.WM_DELETE_WINDOW))
            })
            .unwrap_or(false)
    }

    /// Set a 32-bit property
    fn set_property32(&self, window: Window, atom: Atom, type_: Atom, value: &[u32]) -> Result<()> {
        log::debug!("changing `{}` in Window({:#0x})", atom, window);
        self.conn
            .change_property32(PropMode::REPLACE, window, atom, type_, value)
            .context(format!("failed to set `{}` in Window({:#0x})", atom, window))?
            .check()
            .context(format!("failed to check setting `{}`", atom))?;

        Ok(())
    }

    /// Delete a property
    fn delete_property(&self, window: Window, atom: Atom) -> Result<()> {
        log::debug!("deleting property `{}` from Window({:#0x})", atom, window);
        self.conn
            .delete_property(window, atom)
            .context(format!("failed to `delete_property`: `{}`", atom))?
            .check()
            .context(format!("failed to check `delete_property`: `{}`", atom))?;

        Ok(())
    }

    // ]]] === Translation ===
}

impl XConn for XConnection {
    // ========================== Events ========================== [[[

    fn wait_for_event(&self) -> Result<Option<XEvent>> {
        if let Some(event) = self.pending.borrow_mut().pop_front() {
            return Ok(Some(event));
        }

        self.next_from_server(true)
    }

    fn wait_for_masked(&self, filter: EventFilter) -> Result<Option<XEvent>> {
        loop {
            {
                let mut pending = self.pending.borrow_mut();
                if let Some(pos) = pending.iter().position(|e| filter.matches(e)) {
                    return Ok(pending.remove(pos));
                }
            }

            match self.next_from_server(true)? {
                Some(event) if filter.matches(&event) => return Ok(Some(event)),
                Some(event) => self.pending.borrow_mut().push_back(event),
                None => return Ok(None),
            }
        }
    }

    fn discard_enter_events(&self) -> Result<()> {
        log::trace!("discarding enter events");
        // A round trip guarantees every crossing event caused so far is queued
        self.conn
            .get_input_focus()
            .context("failed to sync with the X-Server")?
            .reply()
            .context("failed to get reply while syncing")?;

        while let Some(event) = self.next_from_server(false)? {
            self.pending.borrow_mut().push_back(event);
        }

        self.pending
            .borrow_mut()
            .retain(|e| !matches!(e, XEvent::EnterNotify(_)));

        Ok(())
    }

    fn flush(&self) -> bool {
        if let Err(e) = self.conn.flush() {
            log::warn!("failed to flush actions to X-server: {e}");
            return false;
        }

        true
    }

    // ]]] === Events ===

    // ========================== Setup =========================== [[[

    fn screens(&self) -> Vec<RootInfo> {
        self.conn
            .setup()
            .roots
            .iter()
            .map(|s| RootInfo {
                root:   s.root,
                width:  i32::from(s.width_in_pixels),
                height: i32::from(s.height_in_pixels),
            })
            .collect()
    }

    fn become_wm(&self, screen: usize, root: Window, num_desktops: u32) -> Result<()> {
        log::debug!("attempting to become the window manager of screen {}", screen);

        if let Err(ReplyError::X11Error(err)) = self
            .conn
            .change_window_attributes(
                root,
                &ChangeWindowAttributesAux::new().event_mask(ROOT_EVENT_MASK),
            )
            .context("failed to select root window events")?
            .check()
        {
            if err.error_kind == ErrorKind::Access {
                return Err(Error::AnotherWmRunning(screen).into());
            }

            return Err(anyhow!("failed to select root window events: {:?}", err));
        }

        #[cfg(feature = "randr")]
        self.conn
            .randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE)
            .context("failed to select randr input")?
            .check()
            .context("failed to check randr::select_input")?;

        self.init_cursor(screen, root);

        let check = self.conn.generate_id().context("failed to generate an ID")?;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                check,
                root,
                -1,
                -1,
                1,
                1,
                0,
                WindowClass::INPUT_ONLY,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new().override_redirect(1),
            )
            .context(format!("failed to create Window({:#0x})", check))?
            .check()
            .context(format!("failed check creating Window({:#0x})", check))?;

        self.conn
            .change_property8(
                PropMode::REPLACE,
                check,
                self.atoms._NET_WM_NAME,
                self.atoms.UTF8_STRING,
                WM_NAME.as_bytes(),
            )
            .context("failed to replace `_NET_WM_NAME`")?
            .check()
            .context("failed to check replacing `_NET_WM_NAME`")?;

        self.set_property32(check, self.atoms._NET_SUPPORTING_WM_CHECK, AtomEnum::WINDOW.into(), &[
            check,
        ])?;
        self.set_property32(root, self.atoms._NET_SUPPORTING_WM_CHECK, AtomEnum::WINDOW.into(), &[
            check,
        ])?;

        let supported = [
            self.atoms._NET_CLIENT_LIST,
            self.atoms._NET_NUMBER_OF_DESKTOPS,
            self.atoms._NET_CURRENT_DESKTOP,
            self.atoms._NET_ACTIVE_WINDOW,
            self.atoms._NET_CLOSE_WINDOW,
            self.atoms._NET_MOVERESIZE_WINDOW,
            self.atoms._NET_RESTACK_WINDOW,
            self.atoms._NET_REQUEST_FRAME_EXTENTS,
            self.atoms._NET_FRAME_EXTENTS,
            self.atoms._NET_WM_DESKTOP,
            self.atoms._NET_WM_STATE,
            self.atoms._NET_WM_STATE_MAXIMIZED_VERT,
            self.atoms._NET_WM_STATE_MAXIMIZED_HORZ,
            self.atoms._NET_WM_STATE_FULLSCREEN,
            self.atoms._NET_WM_WINDOW_TYPE,
            self.atoms._NET_WM_WINDOW_TYPE_DOCK,
        ];
        self.set_property32(root, self.atoms._NET_SUPPORTED, AtomEnum::ATOM.into(), &supported)?;
        self.set_property32(
            root,
            self.atoms._NET_NUMBER_OF_DESKTOPS,
            AtomEnum::CARDINAL.into(),
            &[num_desktops],
        )?;
        self.delete_property(root, self.atoms._NET_CLIENT_LIST)?;

        Ok(())
    }

    fn existing_windows(&self, root: Window) -> Result<Vec<Window>> {
        let tree = self
            .conn
            .query_tree(root)
            .context("failed to query tree")?
            .reply()
            .context("failed to get `QueryTreeReply` reply")?;

        Ok(tree
            .children
            .into_iter()
            .filter(|&win| {
                self.conn
                    .get_window_attributes(win)
                    .ok()
                    .and_then(|cookie| cookie.reply().ok())
                    .map_or(false, |attr| {
                        !attr.override_redirect && attr.map_state == MapState::VIEWABLE
                    })
            })
            .collect())
    }

    // ]]] === Setup ===

    // ========================= Keyboard ========================= [[[

    fn keycode_to_keysym(&self, code: Keycode) -> Keysym {
        self.mapping.borrow().keysym(code)
    }

    fn refresh_keyboard_mapping(&self) -> Result<()> {
        log::debug!("refreshing the keyboard mapping");
        *self.mapping.borrow_mut() = Self::load_mapping(&self.conn)?;
        Ok(())
    }

    fn grab_keys(&self, root: Window, bindings: &[(Keysym, u16)]) -> Result<()> {
        log::debug!("grabbing {} key bindings on Window({:#0x})", bindings.len(), root);
        self.conn
            .ungrab_key(Grab::ANY, root, ModMask::ANY)
            .context("failed to ungrab keys")?
            .check()
            .context("failed to check ungrabbing keys")?;

        let mapping = self.mapping.borrow();
        for &(sym, mods) in bindings {
            let codes = mapping.keycodes(sym);
            if codes.is_empty() {
                log::warn!("{}", Error::UnmappedKeysym(sym));
            }

            for code in codes {
                for mask in lock_variants(mods) {
                    self.conn
                        .grab_key(true, root, mask, code, GrabMode::ASYNC, GrabMode::ASYNC)
                        .context(format!("failed to grab keycode {}", code))?
                        .check()
                        .context(format!("failed to check grabbing keycode {}", code))?;
                }
            }
        }

        Ok(())
    }

    fn grab_keyboard(&self, root: Window) -> Result<bool> {
        log::debug!("attempting to grab control of the entire keyboard");
        let reply = self
            .conn
            .grab_keyboard(
                false, // owner events
                root,  // window
                x11rb::CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .context("failed to grab keyboard")?
            .reply()
            .context("failed to get reply after grabbing keyboard")?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        log::debug!("attempting to ungrab control of the entire keyboard");
        self.conn
            .ungrab_keyboard(x11rb::CURRENT_TIME)
            .context("failed to ungrab keyboard")?
            .check()
            .context("failed to check ungrabbing keyboard")?;

        Ok(())
    }

    // ]]] === Keyboard ===

    // ========================== Pointer ========================= [[[

    fn grab_pointer(&self, root: Window) -> Result<bool> {
        log::debug!("attempting to grab control of the pointer");
        let reply = self
            .conn
            .grab_pointer(
                false,
                root,
                u32::from(
                    EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                ) as u16,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )
            .context("failed to grab pointer")?
            .reply()
            .context("failed to get reply after grabbing pointer")?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        log::debug!("attempting to ungrab the pointer");
        self.conn
            .ungrab_pointer(x11rb::CURRENT_TIME)
            .context("failed to ungrab pointer")?
            .check()
            .context("failed to check ungrabbing pointer")?;

        Ok(())
    }

    fn query_pointer(&self, root: Window) -> Result<Option<Point>> {
        let reply = self
            .conn
            .query_pointer(root)
            .context("failed to get `QueryPointerReply`")?
            .reply()
            .context("failed to get `QueryPointerReply` reply")?;

        Ok(reply
            .same_screen
            .then(|| Point::new(i32::from(reply.root_x), i32::from(reply.root_y))))
    }

    fn warp_pointer(&self, window: Window, pnt: Point) -> Result<()> {
        log::debug!("warping pointer to {} in Window({:#0x})", pnt, window);
        self.conn
            .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, pnt.x as i16, pnt.y as i16)
            .context(format!("failed to warp pointer to {}", pnt))?
            .check()
            .context(format!("failed to check warping pointer to {}", pnt))?;

        Ok(())
    }

    // ]]] === Pointer ===

    // ========================== Windows ========================= [[[

    fn window_attributes(&self, window: Window) -> Result<WindowAttributes> {
        let attr = self
            .conn
            .get_window_attributes(window)
            .context(format!("failed to get attributes of Window({:#0x})", window))?
            .reply()
            .context(format!("failed to get attributes reply of Window({:#0x})", window))?;
        let geom = self
            .conn
            .get_geometry(window)
            .context(format!("failed to get geometry of Window({:#0x})", window))?
            .reply()
            .context(format!("failed to get geometry reply of Window({:#0x})", window))?;

        Ok(WindowAttributes {
            root:              geom.root,
            x:                 i32::from(geom.x),
            y:                 i32::from(geom.y),
            width:             i32::from(geom.width),
            height:            i32::from(geom.height),
            border:            i32::from(geom.border_width),
            override_redirect: attr.override_redirect,
            viewable:          attr.map_state == MapState::VIEWABLE,
            colormap:          attr.colormap,
        })
    }

    fn size_hints(&self, window: Window) -> SizeHints {
        log::debug!("getting `SizeHints` for Window({:#0x})", window);
        WmSizeHints::get_normal_hints(&self.conn, window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or_else(SizeHints::default, |hints| SizeHints {
                position:    hints.position.map(|(spec, x, y)| {
                    (
                        matches!(spec, WmSizeHintsSpecification::UserSpecified),
                        x,
                        y,
                    )
                }),
                size:        hints.size.map(|(_, w, h)| (w, h)),
                min_size:    hints.min_size,
                max_size:    hints.max_size,
                increment:   hints.size_increment,
                base_size:   hints.base_size,
                win_gravity: hints.win_gravity.map(u32::from),
            })
    }

    fn is_dock(&self, window: Window) -> bool {
        self.conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_WINDOW_TYPE,
                AtomEnum::ATOM,
                0,
                u32::MAX,
            )
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| {
                reply
                    .value32()
                    .map(|mut types| types.any(|t| t == self.atoms._NET_WM_WINDOW_TYPE_DOCK))
            })
            .unwrap_or(false)
    }

    fn window_desktop(&self, window: Window) -> Option<u32> {
        self.conn
            .get_property(
                false,
                window,
                self.atoms._NET_WM_DESKTOP,
                AtomEnum::CARDINAL,
                0,
                1,
            )
            .ok()?
            .reply()
            .ok()?
            .value32()?
            .next()
    }

    fn create_frame(
        &self,
        root: Window,
        geom: &Geometry,
        border_color: Pixel,
        mouse_mask: u16,
    ) -> Result<Window> {
        log::debug!("creating a frame: Geometry({})", geom);
        let frame = self.conn.generate_id().context("failed to generate an ID")?;
        let aux = CreateWindowAux::new()
            .override_redirect(1)
            .border_pixel(border_color)
            .event_mask(
                EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::ENTER_WINDOW,
            );
        let pnt = geom.frame_point();

        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                frame,
                root,
                pnt.x as i16,
                pnt.y as i16,
                geom.width.max(1) as u16,
                geom.height.max(1) as u16,
                geom.border as u16,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )
            .context(format!("failed to create Window({:#0x})", frame))?
            .check()
            .context(format!("failed check creating Window({:#0x})", frame))?;

        for mask in lock_variants(mouse_mask) {
            self.conn
                .grab_button(
                    false,
                    frame,
                    u32::from(EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE) as u16,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                    x11rb::NONE,
                    x11rb::NONE,
                    ButtonIndex::ANY,
                    mask,
                )
                .context("failed to grab buttons")?
                .check()
                .context("failed to check grabbing buttons")?;
        }

        Ok(frame)
    }

    fn reparent_window(&self, window: Window, parent: Window, pnt: Point) -> Result<()> {
        log::debug!("reparenting Window({:#0x}) into {:#0x}", window, parent);
        self.conn
            .reparent_window(window, parent, pnt.x as i16, pnt.y as i16)
            .context(format!("failed to reparent window {} to {}", window, parent))?
            .check()
            .context(format!("failed to check reparenting window {} to {}", window, parent))?;

        Ok(())
    }

    fn change_save_set(&self, window: Window, insert: bool) -> Result<()> {
        let mode = if insert { SetMode::INSERT } else { SetMode::DELETE };
        self.conn
            .change_save_set(mode, window)
            .context(format!("failed to `change_save_set` for Window({:#0x})", window))?
            .check()
            .context(format!("failed to check `change_save_set` for Window({:#0x})", window))?;

        Ok(())
    }

    fn select_client_input(&self, window: Window) -> Result<()> {
        log::debug!("initializing Window({:#0x})", window);
        self.conn
            .change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().event_mask(
                    EventMask::ENTER_WINDOW | EventMask::PROPERTY_CHANGE | EventMask::COLOR_MAP_CHANGE,
                ),
            )
            .context(format!("failed to `change_window_attributes` Window({:#0x})", window))?
            .check()
            .context("failed to check changing window attributes")?;

        #[cfg(feature = "shape")]
        self.conn
            .shape_select_input(window, true)
            .context("failed to select shape input")?
            .check()
            .context("failed to check selecting shape input")?;

        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        log::debug!("attempting to map Window({:#0x})", window);
        self.conn
            .map_window(window)
            .context(format!("failed to map window: {}", window))?
            .check()
            .context(format!("failed to check mapping window: {}", window))?;

        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        log::debug!("attempting to unmap Window({:#0x})", window);
        self.conn
            .unmap_window(window)
            .context(format!("failed to unmap window: {}", window))?
            .check()
            .context(format!("failed to check unmapping window: {}", window))?;

        Ok(())
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        log::debug!("attempting to destroy Window({:#0x})", window);
        self.conn
            .destroy_window(window)
            .context(format!("failed to destroy window {}", window))?
            .check()
            .context(format!("failed to check destroying window {}", window))?;

        Ok(())
    }

    fn raise_window(&self, window: Window) -> Result<()> {
        log::debug!("raising Window({:#0x})", window);
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .context(format!("failed to raise Window({:#0x})", window))?
            .check()
            .context(format!("failed to check raising Window({:#0x})", window))?;

        Ok(())
    }

    fn lower_window(&self, window: Window) -> Result<()> {
        log::debug!("lowering Window({:#0x})", window);
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::BELOW))
            .context(format!("failed to lower Window({:#0x})", window))?
            .check()
            .context(format!("failed to check lowering Window({:#0x})", window))?;

        Ok(())
    }

    fn configure_window(
        &self,
        window: Window,
        mask: ConfigMask,
        changes: &WindowChanges,
    ) -> Result<()> {
        log::debug!("configuring Window({:#0x}): {:?} {:?}", window, mask, changes);
        let mut aux = ConfigureWindowAux::new();

        if mask.contains(ConfigMask::X) {
            aux = aux.x(changes.x);
        }
        if mask.contains(ConfigMask::Y) {
            aux = aux.y(changes.y);
        }
        if mask.contains(ConfigMask::WIDTH) {
            aux = aux.width(changes.width.max(1) as u32);
        }
        if mask.contains(ConfigMask::HEIGHT) {
            aux = aux.height(changes.height.max(1) as u32);
        }
        if mask.contains(ConfigMask::BORDER_WIDTH) {
            aux = aux.border_width(changes.border_width.max(0) as u32);
        }
        if mask.contains(ConfigMask::SIBLING) {
            aux = aux.sibling(changes.sibling);
        }
        if mask.contains(ConfigMask::STACK_MODE) {
            aux = aux.stack_mode(StackMode::from(changes.stack_mode as u8));
        }

        self.conn
            .configure_window(window, &aux)
            .context(format!("failed to configure Window({:#0x})", window))?
            .check()
            .context(format!("failed to check configuring Window({:#0x})", window))?;

        Ok(())
    }

    fn move_resize_window(&self, window: Window, pnt: Point, dim: Dimension) -> Result<()> {
        log::debug!("placing Window({:#0x}): {} {}", window, pnt, dim);
        self.conn
            .configure_window(
                window,
                &ConfigureWindowAux::new()
                    .x(pnt.x)
                    .y(pnt.y)
                    .width(dim.width.max(1) as u32)
                    .height(dim.height.max(1) as u32),
            )
            .context(format!("failed to resize Window({:#0x})", window))?
            .check()
            .context(format!("failed to check resizing Window({:#0x})", window))?;

        Ok(())
    }

    fn send_configure_notify(&self, window: Window, geom: &Geometry) -> Result<()> {
        log::debug!("sending configure notify to Window({:#0x}): {}", window, geom);
        let event = ConfigureNotifyEvent {
            response_type:     xproto::CONFIGURE_NOTIFY_EVENT,
            sequence:          0,
            event:             window,
            window,
            above_sibling:     x11rb::NONE,
            x:                 geom.x as i16,
            y:                 geom.y as i16,
            width:             geom.width as u16,
            height:            geom.height as u16,
            border_width:      0,
            override_redirect: false,
        };

        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, &event)
            .context(format!("failed to update Window({:#0x})'s offset", window))?
            .check()
            .context(format!("failed to check updating Window({:#0x})'s offset", window))?;

        Ok(())
    }

    fn set_border_color(&self, window: Window, color: Pixel) -> Result<()> {
        log::debug!("setting Window({:#0x}) border color {:#08x}", window, color);
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(color))
            .context(format!("failed to set Window({:#0x}) border color to {}", window, color))?
            .check()
            .context(format!("failed to check setting border color to {}", color))?;

        Ok(())
    }

    fn set_border_width(&self, window: Window, width: i32) -> Result<()> {
        log::debug!("setting Window({:#0x}) border width {}", window, width);
        self.conn
            .configure_window(
                window,
                &ConfigureWindowAux::new().border_width(width.max(0) as u32),
            )
            .context(format!("failed to set Window({:#0x}) border width to {}", window, width))?
            .check()
            .context(format!("failed to check setting border width to {}", width))?;

        Ok(())
    }

    fn focus_window(&self, window: Window) -> Result<()> {
        log::debug!("focusing Window({:#0x})", window);
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)
            .context(format!("failed to `set_input_focus` for Window({:#0x})", window))?
            .check()
            .context(format!("failed to check `set_input_focus` for Window({:#0x})", window))?;

        Ok(())
    }

    fn clear_focus(&self) -> Result<()> {
        log::debug!("clearing `input_focus`");
        self.conn
            .set_input_focus(
                InputFocus::POINTER_ROOT,
                u32::from(InputFocus::POINTER_ROOT),
                x11rb::CURRENT_TIME,
            )
            .context("failed to clear `input_focus`")?
            .check()
            .context("failed to check setting `input_focus`")?;

        Ok(())
    }

    fn install_colormap(&self, colormap: Colormap) -> Result<()> {
        log::debug!("installing Colormap({:#0x})", colormap);
        self.conn
            .install_colormap(colormap)
            .context("failed to install colormap")?
            .check()
            .context("failed to check installing colormap")?;

        Ok(())
    }

    #[cfg(feature = "shape")]
    fn apply_shape(&self, window: Window, frame: Window) -> Result<()> {
        let extents = self
            .conn
            .shape_query_extents(window)
            .context("failed to query shape extents")?
            .reply()
            .context("failed to get shape extents")?;

        if extents.bounding_shaped {
            log::debug!("copying the shape of Window({:#0x}) to its frame", window);
            self.conn
                .shape_combine(
                    shape::SO::SET,
                    shape::SK::BOUNDING,
                    shape::SK::BOUNDING,
                    frame,
                    0,
                    0,
                    window,
                )
                .context("failed to combine shapes")?
                .check()
                .context("failed to check combining shapes")?;
        }

        Ok(())
    }

    #[cfg(not(feature = "shape"))]
    fn apply_shape(&self, _window: Window, _frame: Window) -> Result<()> {
        Ok(())
    }

    fn close_window(&self, window: Window, force: bool) -> Result<()> {
        if !force && self.supports_delete(window) {
            let data = [self.atoms.WM_DELETE_WINDOW, x11rb::CURRENT_TIME, 0, 0, 0];
            let event = ClientMessageEvent::new(32, window, self.atoms.WM_PROTOCOLS, data);
            log::debug!("sending `WM_DELETE_WINDOW` to Window({:#0x})", window);

            self.conn
                .send_event(false, window, EventMask::NO_EVENT, &event)
                .context(format!("failed to send event. Window: {:#0x}", window))?
                .check()
                .context(format!("failed to check sending event. Window: {:#0x}", window))?;
        } else {
            log::debug!("killing client for Window({:#0x})", window);
            self.conn
                .kill_client(window)
                .context(format!("failed to kill Window({:#0x})", window))?
                .check()
                .context(format!("failed to check killing Window({:#0x})", window))?;
        }

        Ok(())
    }

    // ]]] === Windows ===

    // ======================== Properties ======================== [[[

    fn set_wm_state(&self, window: Window, state: IcccmWindowState) -> Result<()> {
        self.set_property32(window, self.atoms.WM_STATE, self.atoms.WM_STATE, &[
            u32::from(state),
            x11rb::NONE,
        ])
    }

    fn set_frame_extents(&self, window: Window, border: i32) -> Result<()> {
        let border = border.max(0) as u32;
        self.set_property32(
            window,
            self.atoms._NET_FRAME_EXTENTS,
            AtomEnum::CARDINAL.into(),
            &[border, border, border, border],
        )
    }

    fn set_active_window(&self, root: Window, window: Option<Window>) -> Result<()> {
        match window {
            Some(window) => self.set_property32(
                root,
                self.atoms._NET_ACTIVE_WINDOW,
                AtomEnum::WINDOW.into(),
                &[window],
            ),
            None => self.delete_property(root, self.atoms._NET_ACTIVE_WINDOW),
        }
    }

    fn set_current_desktop(&self, root: Window, desktop: u32) -> Result<()> {
        log::debug!("setting `_NET_CURRENT_DESKTOP`: {}", desktop);
        self.set_property32(
            root,
            self.atoms._NET_CURRENT_DESKTOP,
            AtomEnum::CARDINAL.into(),
            &[desktop],
        )
    }

    fn set_window_desktop(&self, window: Window, desktop: Desktop) -> Result<()> {
        log::debug!(
            "setting `_NET_WM_DESKTOP` for Window({:#0x}) to desktop {}",
            window,
            desktop
        );
        self.set_property32(
            window,
            self.atoms._NET_WM_DESKTOP,
            AtomEnum::CARDINAL.into(),
            &[desktop.to_raw()],
        )
    }

    fn set_client_list(&self, root: Window, windows: &[Window]) -> Result<()> {
        log::debug!("updating `_NET_CLIENT_LIST`: {:?}", windows);
        self.set_property32(root, self.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW.into(), windows)
    }

    fn set_net_wm_state(&self, window: Window, maximised: Maximise) -> Result<()> {
        let mut states = Vec::with_capacity(2);
        if maximised.contains(Maximise::VERT) {
            states.push(self.atoms._NET_WM_STATE_MAXIMIZED_VERT);
        }
        if maximised.contains(Maximise::HORZ) {
            states.push(self.atoms._NET_WM_STATE_MAXIMIZED_HORZ);
        }

        self.set_property32(window, self.atoms._NET_WM_STATE, AtomEnum::ATOM.into(), &states)
    }

    fn remove_window_properties(&self, window: Window) -> Result<()> {
        self.delete_property(window, self.atoms._NET_WM_STATE)?;
        self.delete_property(window, self.atoms._NET_WM_DESKTOP)?;

        Ok(())
    }

    // ]]] === Properties ===
}

// ]]] === XConnection ===
