//! Managing, focusing, showing and hiding clients

use super::WmState;
use crate::{
    core::{Desktop, Maximise, StateAction, Window},
    geometry::{self, gravitate_border, stack_mode, ConfigMask, Point, WindowChanges},
    monitor::Client,
    x::{property::IcccmWindowState, XConn},
};
use anyhow::{Context, Result};

/// Run a request whose failure doesn't matter, like one on a window that may
/// already be destroyed
fn quietly(res: Result<()>, what: &str) {
    if let Err(e) = res {
        log::debug!("ignoring failure to {}: {:#}", what, e);
    }
}

impl WmState {
    /// Can a client be placed on `desktop`
    pub(crate) fn valid_desktop(&self, desktop: Desktop) -> bool {
        match desktop {
            Desktop::Fixed => true,
            Desktop::Index(idx) => idx < self.config.global.num_desktops,
        }
    }

    // ============================ Lifecycle ========================= [[[

    /// Start managing `window` on screen `screen`: read its properties, place
    /// it and reparent it into a new frame
    pub(crate) fn make_new_client<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        screen: usize,
    ) -> Result<()> {
        let attrs = conn
            .window_attributes(window)
            .context("failed to get window attributes")?;

        if attrs.override_redirect {
            log::trace!("Window({:#0x}) is override-redirect", window);
            return Ok(());
        }

        let hints = conn.size_hints(window);
        let is_dock = conn.is_dock(window);
        let border = if is_dock {
            0
        } else {
            self.config.global.border_width as i32
        };

        let info = &self.screens[screen];
        let (root, dim) = (info.root(), info.dimension());
        let desktop = if is_dock {
            Desktop::Fixed
        } else {
            conn.window_desktop(window)
                .map(Desktop::from_raw)
                .filter(|d| self.valid_desktop(*d))
                .unwrap_or(Desktop::Index(info.vdesk))
        };
        let shown = info.shows(desktop) && (!is_dock || info.docks_visible);

        let mut geom = geometry::Geometry::new(attrs.x, attrs.y, attrs.width, attrs.height, border);
        match (attrs.viewable, hints.position) {
            (true, _) => {},
            (false, Some((_, x, y))) => {
                geom.x = x;
                geom.y = y;
            },
            (false, None) => {
                let pointer = conn
                    .query_pointer(root)?
                    .unwrap_or_else(|| Point::new(dim.width / 2, dim.height / 2));
                geometry::centre_on(&mut geom, pointer, dim);
            },
        }

        if attrs.viewable || hints.position.is_some() {
            gravitate_border(&mut geom, hints.gravity(), -attrs.border, dim);
            gravitate_border(&mut geom, hints.gravity(), border, dim);
        }

        let frame = conn.create_frame(root, &geom, self.colors.bg, self.config.mouse_mask())?;
        let mut client = Client::new(
            window,
            frame,
            screen,
            geom,
            attrs.border,
            &hints,
            desktop,
            attrs.colormap,
        );
        client.is_dock = is_dock;

        // Reparenting a mapped window unmaps it
        if attrs.viewable {
            client.expect_unmap();
        }

        log::info!(
            "managing Window({:#0x}) in Frame({:#0x}) at {} on desktop {}",
            window,
            frame,
            geom,
            desktop
        );

        conn.set_border_width(window, 0)?;
        conn.change_save_set(window, true)?;
        conn.reparent_window(window, frame, Point::new(0, 0))?;
        conn.select_client_input(window)?;
        conn.set_frame_extents(window, border)?;
        conn.set_window_desktop(window, desktop)?;
        self.clients.insert(client);

        conn.map_window(window)?;
        if shown {
            self.client_show(conn, window)?;
        } else {
            conn.set_wm_state(window, IcccmWindowState::Iconic)?;
        }

        conn.apply_shape(window, frame)?;
        self.update_client_list(conn, screen)
    }

    /// Stop managing a client and give its window back to the root. The
    /// window may already be gone, so requests on it are allowed to fail
    pub(crate) fn remove_client<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        let client = match self.clients.remove(window) {
            Some(client) => client,
            None => return Ok(()),
        };
        let (window, frame) = client.windows();
        let screen = &self.screens[client.screen()];
        log::info!("releasing Window({:#0x})", window);

        if client.is_marked_for_removal() {
            quietly(
                conn.set_wm_state(window, IcccmWindowState::Withdrawn),
                "withdraw",
            );
            quietly(conn.remove_window_properties(window), "remove properties");
        }

        let mut geom = client.geometry;
        let bw = geom.border;
        gravitate_border(&mut geom, client.gravity_hint(), -bw, screen.dimension());
        gravitate_border(&mut geom, client.gravity_hint(), client.old_border(), screen.dimension());

        quietly(
            conn.reparent_window(window, screen.root(), geom.point()),
            "reparent to the root",
        );
        quietly(conn.set_border_width(window, client.old_border()), "restore the border");
        quietly(conn.change_save_set(window, false), "leave the save-set");
        let destroyed = conn.destroy_window(frame);

        if self.current == Some(window) {
            self.current = None;
        }

        self.update_client_list(conn, client.screen())?;
        destroyed
    }

    /// Publish `_NET_CLIENT_LIST` for a screen
    pub(crate) fn update_client_list<X: XConn>(&self, conn: &X, screen: usize) -> Result<()> {
        conn.set_client_list(self.screens[screen].root(), &self.clients.windows_on(screen))
    }

    // ]]] === Lifecycle ===

    // ============================== Focus =========================== [[[

    /// Focus a client and color the borders, or drop the focus
    pub(crate) fn select_client<X: XConn>(&mut self, conn: &X, window: Option<Window>) -> Result<()> {
        if let Some(old) = self.current.and_then(|w| self.clients.find(w)) {
            conn.set_border_color(old.frame(), self.colors.bg)?;
        }

        match window.and_then(|w| self.clients.find(w)) {
            Some(client) => {
                let color = if client.desktop.is_fixed() {
                    self.colors.fc
                } else {
                    self.colors.fg
                };

                conn.set_border_color(client.frame(), color)?;
                if client.colormap != 0 {
                    conn.install_colormap(client.colormap)?;
                }
                conn.focus_window(client.window())?;
                self.current = Some(client.window());
            },
            None => {
                conn.clear_focus()?;
                self.current = None;
            },
        }

        Ok(())
    }

    /// Tell pagers which window is active and move it to the head of the tab
    /// order
    pub(crate) fn ewmh_select_client<X: XConn>(
        &mut self,
        conn: &X,
        window: Option<Window>,
    ) -> Result<()> {
        for screen in &self.screens {
            conn.set_active_window(screen.root(), window)?;
        }

        if let Some(window) = window {
            self.clients.to_head(window);
        }

        Ok(())
    }

    /// Show, raise and focus the next visible client after the focused one,
    /// with the pointer on its bottom-right corner
    pub(crate) fn next<X: XConn>(&mut self, conn: &X) -> Result<()> {
        let screens = &self.screens;
        let next = match self.clients.next_after(self.current, |c| {
            screens[c.screen()].shows(c.desktop) && !c.is_dock
        }) {
            Some(next) => next,
            None => return Ok(()),
        };

        self.client_show(conn, next)?;
        self.client_raise(conn, next)?;
        self.select_client(conn, Some(next))?;

        let geom = self.client(next)?.geometry;
        conn.warp_pointer(
            next,
            Point::new(geom.width + geom.border - 1, geom.height + geom.border - 1),
        )?;
        conn.discard_enter_events()
    }

    // ]]] === Focus ===

    // ============================ Visibility ======================== [[[

    pub(crate) fn client_show<X: XConn>(&self, conn: &X, window: Window) -> Result<()> {
        let client = self.client(window)?;
        conn.map_window(client.frame())?;
        conn.set_wm_state(client.window(), IcccmWindowState::Normal)
    }

    pub(crate) fn client_hide<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        let client = self.client_mut(window)?;
        client.expect_unmap();

        let (window, frame) = client.windows();
        conn.unmap_window(frame)?;
        conn.set_wm_state(window, IcccmWindowState::Iconic)
    }

    pub(crate) fn client_raise<X: XConn>(&self, conn: &X, window: Window) -> Result<()> {
        conn.raise_window(self.client(window)?.frame())
    }

    pub(crate) fn client_lower<X: XConn>(&self, conn: &X, window: Window) -> Result<()> {
        conn.lower_window(self.client(window)?.frame())
    }

    /// Switch a screen to another desktop
    pub(crate) fn switch_vdesk<X: XConn>(&mut self, conn: &X, screen: usize, vdesk: u32) -> Result<()> {
        let (root, old, docks_visible) = {
            let info = &self.screens[screen];
            (info.root(), info.vdesk, info.docks_visible)
        };

        if vdesk == old {
            return Ok(());
        }
        log::debug!("screen {}: desktop {} -> {}", screen, old, vdesk);

        let current_leaves = self
            .current
            .and_then(|w| self.clients.find(w))
            .map_or(false, |c| !c.desktop.is_fixed());
        if current_leaves {
            self.select_client(conn, None)?;
        }

        let mut hide = vec![];
        let mut show = vec![];
        for client in self.clients.iter().filter(|c| c.screen() == screen) {
            if client.desktop == Desktop::Index(old) {
                hide.push(client.window());
            } else if client.desktop == Desktop::Index(vdesk) && (!client.is_dock || docks_visible) {
                show.push(client.window());
            }
        }

        for window in hide {
            self.client_hide(conn, window)?;
        }
        for window in show {
            self.client_show(conn, window)?;
        }

        let info = &mut self.screens[screen];
        info.old_vdesk = old;
        info.vdesk = vdesk;

        conn.set_current_desktop(root, vdesk)
    }

    /// Move a client to another desktop, or make it fixed
    pub(crate) fn client_to_vdesk<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        desktop: Desktop,
    ) -> Result<()> {
        if !self.valid_desktop(desktop) {
            log::debug!("ignoring move to invalid desktop {}", desktop);
            return Ok(());
        }

        let client = self.client_mut(window)?;
        let (screen, was) = (client.screen(), client.desktop);
        client.desktop = desktop;

        let info = &self.screens[screen];
        let (was_shown, now_shown) = (info.shows(was), info.shows(desktop));

        if now_shown && !was_shown {
            self.client_show(conn, window)?;
        } else if was_shown && !now_shown {
            self.client_hide(conn, window)?;
        }
        conn.set_window_desktop(window, desktop)?;

        // Refresh the border color, dropping the focus if it was sent away
        let current = self.current.filter(|&w| w != window || now_shown);
        self.select_client(conn, current)
    }

    /// Show or hide the docks of a screen
    pub(crate) fn set_docks_visible<X: XConn>(
        &mut self,
        conn: &X,
        screen: usize,
        visible: bool,
    ) -> Result<()> {
        let info = &mut self.screens[screen];
        if info.docks_visible == visible {
            return Ok(());
        }
        info.docks_visible = visible;

        let info = &self.screens[screen];
        let docks = self
            .clients
            .iter()
            .filter(|c| c.screen() == screen && c.is_dock && info.shows(c.desktop))
            .map(Client::window)
            .collect::<Vec<_>>();

        for window in docks {
            if visible {
                self.client_show(conn, window)?;
                self.client_raise(conn, window)?;
            } else {
                self.client_hide(conn, window)?;
            }
        }

        Ok(())
    }

    // ]]] === Visibility ===

    /// Maximise or restore a client along `axes`. The pre-maximise position
    /// and size are kept in `oldx`/`oldw` (`oldy`/`oldh`), with a `0` size
    /// meaning the axis isn't maximised
    pub(crate) fn maximise<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        action: StateAction,
        axes: Maximise,
    ) -> Result<()> {
        let dim = self.screen_of(window)?.dimension();
        let client = self.client_mut(window)?;
        let adds = matches!(action, StateAction::Add | StateAction::Toggle);
        let removes = matches!(action, StateAction::Remove | StateAction::Toggle);
        let geom = &mut client.geometry;

        if axes.contains(Maximise::HORZ) {
            if client.oldw != 0 {
                if removes {
                    geom.x = client.oldx;
                    geom.width = client.oldw;
                    client.oldw = 0;
                }
            } else if adds {
                client.oldx = geom.x;
                client.oldw = geom.width;
                geom.x = 0;
                geom.width = dim.width;
            }
        }

        if axes.contains(Maximise::VERT) {
            if client.oldh != 0 {
                if removes {
                    geom.y = client.oldy;
                    geom.height = client.oldh;
                    client.oldh = 0;
                }
            } else if adds {
                client.oldy = geom.y;
                client.oldh = geom.height;
                geom.y = 0;
                geom.height = dim.height;
            }
        }

        log::debug!("Window({:#0x}) is maximised along {:?}", window, client.maximised());
        conn.set_net_wm_state(window, client.maximised())?;

        self.apply(
            conn,
            window,
            ConfigMask::POSITION | ConfigMask::SIZE | ConfigMask::STACK_MODE,
            &WindowChanges {
                stack_mode: stack_mode::ABOVE,
                ..WindowChanges::default()
            },
        )?;
        conn.discard_enter_events()
    }
}
