//! Handlers for the events the server sends

use super::{WindowManager, WmState};
use crate::{
    core::{Colormap, Desktop, Maximise, NetState, StateAction, Window},
    geometry::{ConfigMask, Dimension, WindowChanges},
    x::{
        event::{ButtonEvent, ClientRequest, ConfigureRequest, PropertyKind},
        input::Button,
        XConn,
        XEvent,
    },
};
use anyhow::Result;

impl<X: XConn> WindowManager<X> {
    /// Hand an event to its handler
    pub(crate) fn handle_event(&mut self, event: XEvent) -> Result<()> {
        let Self { conn, state } = self;
        let conn = &*conn;

        match event {
            XEvent::KeyPress(key) => state.handle_key_press(conn, &key),
            XEvent::ButtonPress(button) => state.handle_button_press(conn, &button),
            XEvent::ConfigureRequest(req) => state.handle_configure_request(conn, &req),
            XEvent::MapRequest(window) => state.handle_map_request(conn, window),
            XEvent::UnmapNotify(window) => {
                state.handle_unmap(window);
                Ok(())
            },
            XEvent::ColormapNotify {
                window,
                colormap,
                new,
            } => state.handle_colormap_change(conn, window, colormap, new),
            XEvent::PropertyNotify { window, kind } =>
                state.handle_property_change(conn, window, kind),
            XEvent::EnterNotify(window) => state.handle_enter(conn, window),
            XEvent::MappingNotify { keyboard } => state.handle_mapping_change(conn, keyboard),
            XEvent::ClientMessage { window, request } =>
                state.handle_client_message(conn, window, request),
            XEvent::ShapeNotify(window) => state.handle_shape_change(conn, window),
            XEvent::ScreenChange {
                root,
                width,
                height,
            } => {
                state.handle_screen_change(root, Dimension::new(width, height));
                Ok(())
            },
            XEvent::KeyRelease(_)
            | XEvent::ButtonRelease(_)
            | XEvent::Motion(_)
            | XEvent::Unknown(_) => Ok(()),
        }
    }
}

impl WmState {
    /// A client (or a window that isn't one) wants a new geometry or stacking
    fn handle_configure_request<X: XConn>(&mut self, conn: &X, req: &ConfigureRequest) -> Result<()> {
        let window = match self.clients.find(req.window) {
            Some(client) => client.window(),
            None => {
                log::trace!("passing on configure request of Window({:#0x})", req.window);
                return conn.configure_window(req.window, req.mask, &req.changes);
            },
        };

        let mut changes = req.changes;
        changes.border_width = 0;

        // Clients are stacked by their frames
        if req.mask.contains(ConfigMask::SIBLING | ConfigMask::STACK_MODE) {
            if let Some(sibling) = self.clients.find(changes.sibling) {
                changes.sibling = sibling.frame();
            }
        }

        self.window_changes(conn, window, req.mask, &changes, 0)?;

        if self.current == Some(window) {
            conn.discard_enter_events()?;
        }

        Ok(())
    }

    /// Manage a new window, or bring back a known one
    fn handle_map_request<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        let (screen, desktop) = match self.clients.find(window) {
            Some(client) => (client.screen(), client.desktop),
            None => {
                let attrs = conn.window_attributes(window)?;
                let screen = self.screen_of_root(attrs.root).unwrap_or(0);
                return self.make_new_client(conn, window, screen);
            },
        };

        if let Desktop::Index(vdesk) = desktop {
            if self.config.global.vdesks && self.screens[screen].vdesk != vdesk {
                self.switch_vdesk(conn, screen, vdesk)?;
            }
        }

        self.client_show(conn, window)?;
        self.client_raise(conn, window)
    }

    /// Unmaps the window manager caused are expected; any other one means the
    /// client withdrew and is removed at the next tidy
    fn handle_unmap(&mut self, window: Window) {
        if let Some(client) = self.clients.find_mut(window) {
            if client.consume_unmap_if_expecting() {
                log::trace!("expected unmap of Window({:#0x})", client.window());
            } else {
                log::debug!("Window({:#0x}) was unmapped", client.window());
                client.mark_for_removal();
                self.need_tidy = true;
            }
        }
    }

    fn handle_colormap_change<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        colormap: Colormap,
        new: bool,
    ) -> Result<()> {
        if let Some(client) = self.clients.find_mut(window) {
            if new {
                client.colormap = colormap;
                conn.install_colormap(colormap)?;
            }
        }

        Ok(())
    }

    fn handle_property_change<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        kind: PropertyKind,
    ) -> Result<()> {
        let vdesk = match self.screen_of(window) {
            Ok(info) => info.vdesk,
            Err(_) => return Ok(()),
        };
        let client = self.client_mut(window)?;

        match kind {
            PropertyKind::NormalHints => {
                client.update_hints(&conn.size_hints(window));
                Ok(())
            },
            PropertyKind::WindowType => {
                client.is_dock = conn.is_dock(window);
                let window = client.window();

                if !client.is_dock && client.is_visible_on(vdesk) {
                    self.client_show(conn, window)?;
                }
                Ok(())
            },
            PropertyKind::Other => Ok(()),
        }
    }

    /// Focus follows the pointer
    fn handle_enter<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        let window = match self.clients.find(window) {
            Some(client) if self.screens[client.screen()].shows(client.desktop) => client.window(),
            _ => return Ok(()),
        };

        self.select_client(conn, Some(window))?;
        self.ewmh_select_client(conn, Some(window))
    }

    fn handle_mapping_change<X: XConn>(&mut self, conn: &X, keyboard: bool) -> Result<()> {
        conn.refresh_keyboard_mapping()?;

        if keyboard {
            for root in self.screens.iter().map(|s| s.root()).collect::<Vec<_>>() {
                self.grab_keys(conn, root)?;
            }
        }

        Ok(())
    }

    fn handle_shape_change<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        match self.clients.find(window) {
            Some(client) => conn.apply_shape(client.window(), client.frame()),
            None => Ok(()),
        }
    }

    fn handle_screen_change(&mut self, root: Window, dimension: Dimension) {
        if let Some(idx) = self.screen_of_root(root) {
            self.screens[idx].set_dimension(dimension);
        }
    }

    fn handle_button_press<X: XConn>(&mut self, conn: &X, event: &ButtonEvent) -> Result<()> {
        let window = match self.clients.find(event.window) {
            Some(client) => client.window(),
            None => return Ok(()),
        };

        match Button::from_detail(event.button) {
            Some(Button::Left) => self.drag(conn, window, event.root_pos),
            Some(Button::Middle) => self.sweep(conn, window),
            Some(Button::Right) => self.client_lower(conn, window),
            None => Ok(()),
        }
    }

    // ========================== Client Messages ===================== [[[

    /// EWMH requests. Most are only honoured when a pager sent them on behalf
    /// of the user
    fn handle_client_message<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        request: ClientRequest,
    ) -> Result<()> {
        match request {
            ClientRequest::CurrentDesktop(vdesk) => {
                if self.config.global.vdesks && vdesk < self.config.global.num_desktops {
                    let screen = self.current_screen(conn);
                    self.switch_vdesk(conn, screen, vdesk)?;
                }
                return Ok(());
            },
            ClientRequest::RequestFrameExtents => {
                if !self.clients.contains(window) {
                    conn.set_frame_extents(window, self.config.global.border_width as i32)?;
                }
                return Ok(());
            },
            ClientRequest::Unknown(atom) => {
                log::trace!("ignoring client message with type {}", atom);
                return Ok(());
            },
            _ => {},
        }

        let (window, screen, gravity) = match self.clients.find(window) {
            Some(client) => (client.window(), client.screen(), client.gravity()),
            None => return Ok(()),
        };

        match request {
            ClientRequest::ActiveWindow { source } =>
                if source.is_user_action() && screen == self.current_screen(conn) {
                    self.select_client(conn, Some(window))?;
                },
            ClientRequest::CloseWindow { source } =>
                if source.is_user_action() {
                    conn.close_window(window, false)?;
                },
            ClientRequest::MoveResize { flags, changes } =>
                if flags.source.is_user_action() {
                    self.window_changes(conn, window, flags.mask, &changes, flags.gravity)?;
                },
            ClientRequest::Restack {
                source,
                sibling,
                stack_mode,
            } =>
                if source.is_user_action() {
                    let (mask, sibling) = if sibling == 0 {
                        (ConfigMask::STACK_MODE, 0)
                    } else {
                        let frame = self.clients.find(sibling).map_or(sibling, |c| c.frame());
                        (ConfigMask::SIBLING | ConfigMask::STACK_MODE, frame)
                    };

                    self.window_changes(
                        conn,
                        window,
                        mask,
                        &WindowChanges {
                            sibling,
                            stack_mode,
                            ..WindowChanges::default()
                        },
                        gravity.to_raw(),
                    )?;
                },
            ClientRequest::WmDesktop { desktop, source } =>
                if source.is_user_action() && self.config.global.vdesks {
                    self.client_to_vdesk(conn, window, Desktop::from_raw(desktop))?;
                },
            ClientRequest::WmState {
                action,
                first,
                second,
            } => {
                let axes = first.map_or(Maximise::empty(), NetState::axes)
                    | second.map_or(Maximise::empty(), NetState::axes);

                match StateAction::from_raw(action) {
                    Some(action) if !axes.is_empty() => self.maximise(conn, window, action, axes)?,
                    _ => log::debug!("ignoring state change {} for {:?}", action, axes),
                }
            },
            ClientRequest::CurrentDesktop(_)
            | ClientRequest::RequestFrameExtents
            | ClientRequest::Unknown(_) => {},
        }

        Ok(())
    }

    // ]]] === Client Messages ===
}

#[cfg(test)]
mod tests {
    use super::super::tests::{attrs, manage, wm_with};
    use crate::{
        core::{Desktop, NetState},
        geometry::{ConfigMask, Geometry, Point, WindowChanges},
        x::{
            event::{
                ButtonEvent,
                ClientRequest,
                ConfigureRequest,
                MoveResizeFlags,
                PropertyKind,
                SourceIndication,
            },
            mock::Request,
            property::{SizeHints, WindowAttributes},
            XEvent,
        },
    };

    fn message(window: u32, request: ClientRequest) -> XEvent {
        XEvent::ClientMessage { window, request }
    }

    #[test]
    fn stacking_is_relative_to_frames() {
        let mut wm = wm_with(vec![]);
        let frame = manage(&mut wm, 10, (0, 0, 100, 100));
        let sibling = manage(&mut wm, 20, (0, 0, 100, 100));

        let mask = ConfigMask::SIBLING | ConfigMask::STACK_MODE;
        wm.conn.push_event(XEvent::ConfigureRequest(ConfigureRequest {
            window: 10,
            mask,
            changes: WindowChanges {
                sibling: 20,
                stack_mode: 1,
                ..WindowChanges::default()
            },
        }));
        wm.step().unwrap();

        match &wm.conn.requests()[0] {
            Request::Configure(w, m, changes) => {
                assert_eq!((*w, *m), (frame, mask));
                assert_eq!((changes.sibling, changes.stack_mode), (sibling, 1));
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(wm.conn.count(|r| matches!(r, Request::ConfigureNotify(..))), 0);
    }

    #[test]
    fn focused_client_configure_discards_enters() {
        let mut wm = wm_with(vec![]);
        manage(&mut wm, 10, (0, 0, 100, 100));
        wm.state.current = Some(10);

        wm.conn.push_event(XEvent::ConfigureRequest(ConfigureRequest {
            window:  10,
            mask:    ConfigMask::WIDTH,
            changes: WindowChanges {
                width: 200,
                ..WindowChanges::default()
            },
        }));
        wm.conn.push_event(XEvent::EnterNotify(10));
        wm.step().unwrap();

        assert!(wm.conn.requests().contains(&Request::DiscardEnterEvents));
        assert!(wm.conn.remaining_events().is_empty());
        assert_eq!(wm.state.client(10).unwrap().geometry.width, 200);
    }

    #[test]
    fn map_request_manages_new_windows() {
        let mut wm = wm_with(vec![XEvent::MapRequest(10)]);
        wm.conn.add_window(10, WindowAttributes {
            viewable: false,
            ..attrs(0, 0, 100, 100)
        });
        wm.step().unwrap();

        let frame = wm.state.client(10).unwrap().frame();
        let requests = wm.conn.requests();
        assert!(requests.contains(&Request::Reparent(10, frame, Point::new(0, 0))));
        assert!(requests.contains(&Request::Map(frame)));
        assert!(!wm.state.client(10).unwrap().is_expecting_unmap());

        wm.conn.push_event(XEvent::MapRequest(99));
        wm.step().unwrap();
        assert!(!wm.state.clients.contains(99));
    }

    #[test]
    fn map_request_switches_to_the_clients_desktop() {
        let mut wm = wm_with(vec![]);
        let frame = manage(&mut wm, 10, (0, 0, 100, 100));
        wm.state.client_mut(10).unwrap().desktop = Desktop::Index(3);

        wm.conn.push_event(XEvent::MapRequest(10));
        wm.step().unwrap();

        assert_eq!(wm.state.screens[0].vdesk, 3);
        assert!(wm.conn.requests().contains(&Request::Raise(frame)));
    }

    #[test]
    fn user_source_is_required() {
        let mut wm = wm_with(vec![]);
        manage(&mut wm, 10, (0, 0, 100, 100));

        for source in [SourceIndication::Unspecified, SourceIndication::Application] {
            wm.conn.push_event(message(10, ClientRequest::ActiveWindow { source }));
            wm.conn.push_event(message(10, ClientRequest::CloseWindow { source }));
            wm.conn.push_event(message(10, ClientRequest::WmDesktop { desktop: 2, source }));
        }
        while !wm.conn.remaining_events().is_empty() {
            wm.step().unwrap();
        }
        assert!(wm.conn.requests().is_empty());

        let source = SourceIndication::Pager;
        wm.conn.push_event(message(10, ClientRequest::ActiveWindow { source }));
        wm.conn.push_event(message(10, ClientRequest::CloseWindow { source }));
        wm.conn.push_event(message(10, ClientRequest::WmDesktop { desktop: 2, source }));
        while !wm.conn.remaining_events().is_empty() {
            wm.step().unwrap();
        }

        let requests = wm.conn.requests();
        assert!(requests.contains(&Request::Focus(10)));
        assert!(requests.contains(&Request::Close(10, false)));
        assert!(requests.contains(&Request::WindowDesktop(10, Desktop::Index(2))));
    }

    #[test]
    fn moveresize_uses_the_message_gravity() {
        let mut wm = wm_with(vec![]);
        manage(&mut wm, 10, (100, 100, 200, 200));
        let before = wm.state.client(10).unwrap().geometry;

        let flags = MoveResizeFlags {
            gravity: 9,
            mask:    ConfigMask::SIZE,
            source:  SourceIndication::Pager,
        };
        wm.conn.push_event(message(10, ClientRequest::MoveResize {
            flags,
            changes: WindowChanges {
                width: 100,
                height: 50,
                ..WindowChanges::default()
            },
        }));
        wm.step().unwrap();

        let after = wm.state.client(10).unwrap().geometry;
        assert_eq!(after.x + after.width, before.x + before.width);
        assert_eq!(after.y + after.height, before.y + before.height);
    }

    #[test]
    fn extreme_moveresize_does_not_overflow() {
        let mut wm = wm_with(vec![]);
        let frame = manage(&mut wm, 10, (100, 100, 200, 200));

        wm.conn.push_event(message(10, ClientRequest::MoveResize {
            flags:   MoveResizeFlags {
                gravity: 0,
                mask:    ConfigMask::X,
                source:  SourceIndication::Pager,
            },
            changes: WindowChanges {
                x: i32::MIN,
                ..WindowChanges::default()
            },
        }));
        wm.step().unwrap();

        assert_eq!(wm.state.client(10).unwrap().geometry.x, i32::MIN);
        match &wm.conn.requests()[0] {
            Request::Configure(w, _, changes) => assert_eq!((*w, changes.x), (frame, i32::MIN)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(wm.conn.count(|r| matches!(r, Request::ConfigureNotify(..))), 1);
    }

    #[test]
    fn restack_without_sibling() {
        let mut wm = wm_with(vec![]);
        let frame = manage(&mut wm, 10, (0, 0, 100, 100));

        wm.conn.push_event(message(10, ClientRequest::Restack {
            source:     SourceIndication::Pager,
            sibling:    0,
            stack_mode: 0,
        }));
        wm.step().unwrap();

        match &wm.conn.requests()[0] {
            Request::Configure(w, mask, _) => assert_eq!((*w, *mask), (frame, ConfigMask::STACK_MODE)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn fullscreen_matches_both_axes() {
        let request = |first, second| ClientRequest::WmState {
            action: 1,
            first,
            second,
        };

        let mut one = wm_with(vec![]);
        manage(&mut one, 10, (100, 100, 300, 200));
        one.conn.push_event(message(10, request(Some(NetState::Fullscreen), None)));
        one.step().unwrap();

        let mut two = wm_with(vec![]);
        manage(&mut two, 10, (100, 100, 300, 200));
        two.conn.push_event(message(
            10,
            request(Some(NetState::MaximizedVert), Some(NetState::MaximizedHorz)),
        ));
        two.step().unwrap();

        let geom = one.state.client(10).unwrap().geometry;
        assert_eq!(geom, two.state.client(10).unwrap().geometry);
        assert_eq!(geom, Geometry::new(0, 0, 1920, 1080, 1));
    }

    #[test]
    fn desktop_and_frame_extent_requests() {
        let mut wm = wm_with(vec![
            message(1, ClientRequest::CurrentDesktop(3)),
            message(1, ClientRequest::CurrentDesktop(8)),
            message(50, ClientRequest::RequestFrameExtents),
        ]);
        let frame = manage(&mut wm, 10, (0, 0, 100, 100));

        wm.step().unwrap();
        assert_eq!(wm.state.screens[0].vdesk, 3);
        assert!(wm.conn.requests().contains(&Request::Unmap(frame)));

        wm.conn.clear_requests();
        wm.step().unwrap();
        assert_eq!(wm.state.screens[0].vdesk, 3);
        assert!(wm.conn.requests().is_empty());

        wm.step().unwrap();
        assert_eq!(wm.conn.requests(), vec![Request::FrameExtents(50, 1)]);
    }

    #[test]
    fn enter_focuses_visible_clients() {
        let mut wm = wm_with(vec![XEvent::EnterNotify(10)]);
        manage(&mut wm, 10, (0, 0, 100, 100));
        manage(&mut wm, 20, (0, 0, 100, 100));
        wm.step().unwrap();

        assert_eq!(wm.state.current, Some(10));
        assert!(wm.conn.requests().contains(&Request::ActiveWindow(1, Some(10))));
        assert_eq!(wm.state.clients.iter().next().unwrap().window(), 10);

        wm.state.client_mut(20).unwrap().desktop = Desktop::Index(1);
        wm.conn.push_event(XEvent::EnterNotify(20));
        wm.step().unwrap();
        assert_eq!(wm.state.current, Some(10));
    }

    #[test]
    fn hints_and_window_type_updates() {
        let mut wm = wm_with(vec![]);
        manage(&mut wm, 10, (0, 0, 100, 100));
        wm.conn.set_hints(10, SizeHints {
            min_size: Some((150, 150)),
            ..SizeHints::default()
        });
        wm.conn.push_event(XEvent::PropertyNotify {
            window: 10,
            kind:   PropertyKind::NormalHints,
        });
        wm.step().unwrap();
        assert_eq!(wm.state.client(10).unwrap().limits().min_width, 150);

        wm.conn.set_dock(10, true);
        wm.conn.push_event(XEvent::PropertyNotify {
            window: 10,
            kind:   PropertyKind::WindowType,
        });
        wm.step().unwrap();
        assert!(wm.state.client(10).unwrap().is_dock);
    }

    #[test]
    fn mapping_change_regrabs_keys() {
        let mut wm = wm_with(vec![
            XEvent::MappingNotify { keyboard: false },
            XEvent::MappingNotify { keyboard: true },
        ]);

        wm.step().unwrap();
        assert_eq!(wm.conn.requests(), vec![Request::RefreshMapping]);

        wm.step().unwrap();
        assert_eq!(wm.conn.count(|r| *r == Request::GrabKeys(1)), 1);
    }

    #[test]
    fn right_click_lowers() {
        let mut wm = wm_with(vec![]);
        let frame = manage(&mut wm, 10, (0, 0, 100, 100));

        wm.conn.push_event(XEvent::ButtonPress(ButtonEvent {
            root:     1,
            window:   frame,
            button:   3,
            state:    8,
            root_pos: Point::new(10, 10),
        }));
        wm.step().unwrap();
        assert_eq!(wm.conn.requests(), vec![Request::Lower(frame)]);
    }
}
