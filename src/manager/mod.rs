//! The window manager: its state, the event loop and the configure applier
//!
//! [`WindowManager`] owns the connection and a [`WmState`]. Every operation
//! is a method on [`WmState`] that borrows the connection, so the loop can
//! split the two with `let Self { conn, state } = self`.

mod clients;
mod handlers;
mod keys;
mod mouse;

use crate::{
    config::{Colors, Config},
    core::{Keysym, Window},
    geometry::{self, ConfigMask, Point, WindowChanges},
    monitor::{Client, ClientList, ScreenInfo},
    utils,
    x::{input::KeyTable, XConn},
};
use anyhow::{anyhow, Context, Result};

// =============================== Mode =============================== [[[

/// What the event loop is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Dispatching events
    Running,
    /// A focus cycle was started and has to run before anything else
    Cycling(Cycle),
    /// Leaving the loop
    Exiting,
}

/// A focus cycle that was started from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cycle {
    /// The key that started the cycle. Pressing it again advances
    pub(crate) trigger: Keysym,
    /// Root of the screen the key was pressed on
    pub(crate) root:    Window,
}

// ]]] === Mode ===

// ============================== WmState ============================= [[[

/// Everything the window manager knows
#[derive(Debug)]
pub(crate) struct WmState {
    pub(crate) config:    Config,
    pub(crate) colors:    Colors,
    pub(crate) keys:      KeyTable,
    pub(crate) screens:   Vec<ScreenInfo>,
    pub(crate) clients:   ClientList,
    /// The focused client
    pub(crate) current:   Option<Window>,
    pub(crate) mode:      Mode,
    /// Set when a client unmapped itself and has to be removed
    pub(crate) need_tidy: bool,
}

impl WmState {
    /// The client owning `window`
    pub(crate) fn client(&self, window: Window) -> Result<&Client> {
        self.clients
            .find(window)
            .ok_or_else(|| anyhow!("Window({:#0x}) is not managed", window))
    }

    pub(crate) fn client_mut(&mut self, window: Window) -> Result<&mut Client> {
        self.clients
            .find_mut(window)
            .ok_or_else(|| anyhow!("Window({:#0x}) is not managed", window))
    }

    /// The screen a client lives on
    pub(crate) fn screen_of(&self, window: Window) -> Result<&ScreenInfo> {
        let idx = self.client(window)?.screen();
        self.screens
            .get(idx)
            .ok_or_else(|| anyhow!("screen {} does not exist", idx))
    }

    /// Index of the screen with the given root
    pub(crate) fn screen_of_root(&self, root: Window) -> Option<usize> {
        self.screens
            .iter()
            .find(|s| s.root() == root)
            .map(ScreenInfo::index)
    }

    /// The screen the pointer is on, or the first one
    pub(crate) fn current_screen<X: XConn>(&self, conn: &X) -> usize {
        self.screens
            .iter()
            .find(|s| matches!(conn.query_pointer(s.root()), Ok(Some(_))))
            .map_or(0, ScreenInfo::index)
    }

    // ============================ Applier =========================== [[[

    /// Push a client's geometry to the server.
    ///
    /// The frame is configured with the fields in `mask`, taking stacking
    /// values from `changes`, and the client is resized to fill it. A pure
    /// move doesn't reach the client through the server, so it is told with
    /// a synthetic `ConfigureNotify`
    pub(crate) fn apply<X: XConn>(
        &self,
        conn: &X,
        window: Window,
        mask: ConfigMask,
        changes: &WindowChanges,
    ) -> Result<()> {
        let client = self.client(window)?;
        let geom = client.geometry;
        let frame = geom.frame_point();

        conn.configure_window(client.frame(), mask, &WindowChanges {
            x:            frame.x,
            y:            frame.y,
            width:        geom.width,
            height:       geom.height,
            border_width: geom.border,
            sibling:      changes.sibling,
            stack_mode:   changes.stack_mode,
        })?;
        conn.move_resize_window(client.window(), Point::new(0, 0), geom.dimension())?;

        if mask.is_pure_move() {
            conn.send_configure_notify(client.window(), &geom)?;
        }

        Ok(())
    }

    /// Resolve a configure request against a client and apply the outcome.
    /// A `gravity` of `0` uses the client's own
    pub(crate) fn window_changes<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        mask: ConfigMask,
        changes: &WindowChanges,
        gravity: u32,
    ) -> Result<()> {
        let screen = self.screen_of(window)?.dimension();
        let client = self.client_mut(window)?;

        let res = geometry::resolve(
            client.geometry,
            client.limits(),
            client.gravity_hint(),
            gravity,
            mask,
            changes,
            screen,
        );
        log::debug!(
            "Window({:#0x}): {} -> {} ({:?})",
            window,
            client.geometry,
            res.geometry,
            res.mask
        );

        client.geometry = res.geometry;
        client.set_gravity(res.gravity);

        self.apply(conn, window, res.mask, changes)
    }

    // ]]] === Applier ===

    /// Remove every client flagged by an unmap. A failure is logged and
    /// doesn't keep the others from being removed
    pub(crate) fn tidy<X: XConn>(&mut self, conn: &X) {
        self.need_tidy = false;

        for window in self.clients.marked_for_removal() {
            if let Err(e) = self.remove_client(conn, window) {
                log::warn!("failed to release Window({:#0x}): {:#}", window, e);
            }
        }
    }
}

// ]]] === WmState ===

// =========================== WindowManager ========================== [[[

/// The connection to the server and the state of the window manager
#[derive(Debug)]
pub(crate) struct WindowManager<X: XConn> {
    pub(crate) conn:  X,
    pub(crate) state: WmState,
}

impl<X: XConn> WindowManager<X> {
    /// Create a new [`WindowManager`]. Nothing is sent to the server yet
    pub(crate) fn new(conn: X, config: Config) -> Result<Self> {
        let colors = config.colors()?;
        let keys = config.key_table()?;
        let screens = conn
            .screens()
            .into_iter()
            .enumerate()
            .map(|(idx, info)| ScreenInfo::new(idx, info))
            .collect();

        Ok(Self {
            conn,
            state: WmState {
                config,
                colors,
                keys,
                screens,
                clients: ClientList::default(),
                current: None,
                mode: Mode::Running,
                need_tidy: false,
            },
        })
    }

    /// Take over every screen and manage the windows that are already shown
    pub(crate) fn startup(&mut self) -> Result<()> {
        let Self { conn, state } = self;
        let conn = &*conn;
        let num_desktops = state.config.global.num_desktops;

        for idx in 0..state.screens.len() {
            let (root, vdesk) = (state.screens[idx].root(), state.screens[idx].vdesk);

            conn.become_wm(idx, root, num_desktops)
                .with_context(|| format!("failed to manage screen {}", idx))?;
            conn.set_current_desktop(root, vdesk)?;
            state.grab_keys(conn, root)?;

            for window in conn.existing_windows(root)? {
                if let Err(e) = state.make_new_client(conn, window, idx) {
                    log::warn!("failed to manage Window({:#0x}): {:#}", window, e);
                }
            }
        }

        conn.flush();
        Ok(())
    }

    /// Dispatch events until a terminating signal arrives
    pub(crate) fn run(&mut self) -> Result<()> {
        log::info!("managing {} screen(s)", self.state.screens.len());

        while self.state.mode != Mode::Exiting {
            if utils::exit_requested() {
                log::info!("exit requested");
                self.state.mode = Mode::Exiting;
                break;
            }

            if let Err(e) = self.step() {
                log::warn!("{:#}", e);
            }
        }

        self.shutdown()
    }

    /// Wait for one event and act on it. A failing handler is logged and the
    /// loop carries on
    pub(crate) fn step(&mut self) -> Result<()> {
        if let Some(event) = self
            .conn
            .wait_for_event()
            .context("failed to wait for an event")?
        {
            log::trace!("{:?}", event);
            if let Err(e) = self.handle_event(event) {
                log::warn!("{:#}", e);
            }
        }

        if let Mode::Cycling(cycle) = self.state.mode {
            self.cycle(cycle)?;
        }

        if self.state.need_tidy {
            let Self { conn, state } = self;
            state.tidy(&*conn);
        }

        Ok(())
    }

    /// Give every client back to the root window
    fn shutdown(&mut self) -> Result<()> {
        let Self { conn, state } = self;
        let conn = &*conn;
        let windows = state.clients.iter().map(Client::window).collect::<Vec<_>>();
        log::info!("releasing {} client(s)", windows.len());

        for window in windows {
            if let Err(e) = state.remove_client(conn, window) {
                log::warn!("failed to release Window({:#0x}): {:#}", window, e);
            }
        }

        conn.clear_focus()?;
        conn.flush();
        Ok(())
    }
}

// ]]] === WindowManager ===
