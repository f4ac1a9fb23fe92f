//! Key bindings and the focus cycle

use super::{Cycle, Mode, WindowManager, WmState};
use crate::{
    core::{Action, Desktop, Maximise, StateAction, Window, MOVE_STEP},
    geometry::{self, stack_mode, ConfigMask, Corner, Geometry, WindowChanges},
    utils,
    x::{
        event::KeyEvent,
        grab::KeyboardGrab,
        input::keysym_name,
        EventFilter,
        XConn,
        XEvent,
    },
};
use anyhow::Result;
use itertools::Itertools;

impl WmState {
    /// Grab every bound key on a root, with and without the alt modifier
    pub(crate) fn grab_keys<X: XConn>(&self, conn: &X, root: Window) -> Result<()> {
        let grab = self.config.grab_mask();
        let alt = u16::from(self.config.global.alt_modifier);
        let bindings = self
            .keys
            .keysyms()
            .flat_map(|sym| [(sym, grab), (sym, grab | alt)])
            .collect::<Vec<_>>();

        log::trace!("binding {}", self.keys.keysyms().map(keysym_name).join(", "));
        conn.grab_keys(root, &bindings)
    }

    pub(crate) fn handle_key_press<X: XConn>(&mut self, conn: &X, event: &KeyEvent) -> Result<()> {
        let sym = conn.keycode_to_keysym(event.keycode);
        let action = match self.keys.lookup(sym) {
            Some(action) => action,
            None => return Ok(()),
        };
        let alt = self.config.global.alt_modifier.was_held(event.state);
        log::debug!("{} -> {}{}", keysym_name(sym), action, if alt { " (alt)" } else { "" });

        if action.needs_client() {
            return match self.current {
                Some(window) => self.client_action(conn, window, action, alt),
                None => Ok(()),
            };
        }

        let screen = self
            .screen_of_root(event.root)
            .unwrap_or_else(|| self.current_screen(conn));
        let (vdesk, old_vdesk, docks_visible) = {
            let info = &self.screens[screen];
            (info.vdesk, info.old_vdesk, info.docks_visible)
        };
        let vdesks = self.config.global.vdesks;
        let num_desktops = self.config.global.num_desktops;

        match action {
            Action::Spawn => {
                utils::spawn(&self.config.global.terminal);
                Ok(())
            },
            Action::Next => {
                self.next(conn)?;
                self.mode = Mode::Cycling(Cycle {
                    trigger: sym,
                    root:    event.root,
                });
                Ok(())
            },
            Action::DockToggle => self.set_docks_visible(conn, screen, !docks_visible),
            Action::Desktop(idx) if vdesks && idx < num_desktops =>
                self.switch_vdesk(conn, screen, idx),
            Action::PrevDesktop if vdesks && vdesk > 0 => self.switch_vdesk(conn, screen, vdesk - 1),
            Action::NextDesktop if vdesks && vdesk + 1 < num_desktops =>
                self.switch_vdesk(conn, screen, vdesk + 1),
            Action::ToggleDesktop if vdesks => self.switch_vdesk(conn, screen, old_vdesk),
            _ => Ok(()),
        }
    }

    /// An action on the focused client. Movement keys resize instead when
    /// `alt` is held, and closing becomes killing
    fn client_action<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        action: Action,
        alt: bool,
    ) -> Result<()> {
        let screen = self.screen_of(window)?.dimension();
        let client = self.client(window)?;
        let (step, limits, before) = (client.resize_step(), client.limits(), client.geometry);
        let mut geom = before;

        match action {
            Action::MoveLeft if alt =>
                if geom.width - step.width >= limits.min_width {
                    geom.width -= step.width;
                },
            Action::MoveLeft => geom.x -= MOVE_STEP,
            Action::MoveDown if alt =>
                if limits.max_height == 0 || geom.height + step.height <= limits.max_height {
                    geom.height += step.height;
                },
            Action::MoveDown => geom.y += MOVE_STEP,
            Action::MoveUp if alt =>
                if geom.height - step.height >= limits.min_height {
                    geom.height -= step.height;
                },
            Action::MoveUp => geom.y -= MOVE_STEP,
            Action::MoveRight if alt =>
                if limits.max_width == 0 || geom.width + step.width <= limits.max_width {
                    geom.width += step.width;
                },
            Action::MoveRight => geom.x += MOVE_STEP,
            Action::TopLeft => geometry::snap_to_corner(&mut geom, Corner::TopLeft, screen),
            Action::TopRight => geometry::snap_to_corner(&mut geom, Corner::TopRight, screen),
            Action::BottomLeft => geometry::snap_to_corner(&mut geom, Corner::BottomLeft, screen),
            Action::BottomRight => geometry::snap_to_corner(&mut geom, Corner::BottomRight, screen),
            Action::Kill => return conn.close_window(window, alt),
            Action::Lower => return self.client_lower(conn, window),
            Action::Maximise =>
                return self.maximise(conn, window, StateAction::Toggle, Maximise::all()),
            Action::MaximiseVert =>
                return self.maximise(conn, window, StateAction::Toggle, Maximise::VERT),
            Action::Fix => return self.toggle_fixed(conn, window),
            _ => return Ok(()),
        }

        self.move_client(conn, window, &before, geom)
    }

    /// Apply a geometry chosen from the keyboard, raising the client
    fn move_client<X: XConn>(
        &mut self,
        conn: &X,
        window: Window,
        before: &Geometry,
        mut geom: Geometry,
    ) -> Result<()> {
        let client = self.client_mut(window)?;
        geometry::undock_edges(&mut geom, client.oldw, client.oldh);
        client.geometry = geom;

        let mask = geometry::changed_fields(before, &geom) | ConfigMask::STACK_MODE;
        self.apply(conn, window, mask, &WindowChanges {
            stack_mode: stack_mode::ABOVE,
            ..WindowChanges::default()
        })?;
        conn.discard_enter_events()
    }

    /// Put a client on every desktop, or back on the current one
    fn toggle_fixed<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        if !self.config.global.vdesks {
            return Ok(());
        }

        let vdesk = self.screen_of(window)?.vdesk;
        let desktop = if self.client(window)?.desktop.is_fixed() {
            Desktop::Index(vdesk)
        } else {
            Desktop::Fixed
        };

        self.client_to_vdesk(conn, window, desktop)
    }

    /// Read key events until the cycle ends: another press of the trigger
    /// advances, releasing any other key (the held modifier) stops
    fn cycle_until_release<X: XConn>(&mut self, conn: &X, cycle: Cycle) {
        loop {
            let (pressed, key) = match conn.wait_for_masked(EventFilter::Keyboard) {
                Ok(Some(XEvent::KeyPress(key))) => (true, key),
                Ok(Some(XEvent::KeyRelease(key))) => (false, key),
                Ok(Some(_)) => continue,
                Ok(None) if utils::exit_requested() => break,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("stopped cycling: {:#}", e);
                    break;
                },
            };

            let sym = conn.keycode_to_keysym(key.keycode);
            if pressed && sym == cycle.trigger {
                if let Err(e) = self.next(conn) {
                    log::warn!("failed to cycle: {:#}", e);
                }
            }

            if !pressed && sym != cycle.trigger {
                break;
            }
        }
    }
}

impl<X: XConn> WindowManager<X> {
    /// Run a focus cycle. The first step has already been taken; if the
    /// keyboard can be grabbed, every further press of the trigger takes
    /// another until the modifier is let go. The final choice is then made
    /// the active window
    pub(crate) fn cycle(&mut self, cycle: Cycle) -> Result<()> {
        let Self { conn, state } = self;
        let conn = &*conn;
        state.mode = Mode::Running;

        match KeyboardGrab::acquire(conn, cycle.root) {
            Ok(Some(_grab)) => state.cycle_until_release(conn, cycle),
            Ok(None) => log::debug!("the keyboard is grabbed elsewhere, not cycling"),
            Err(e) => log::warn!("failed to grab the keyboard: {:#}", e),
        }

        let current = state.current;
        state.ewmh_select_client(conn, current)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        tests::{manage, wm_with},
        Mode,
        WindowManager,
    };
    use crate::{
        geometry::{ConfigMask, Geometry},
        x::{
            event::KeyEvent,
            mock::{MockXConn, Request},
            XEvent,
        },
    };

    const TAB: u8 = 23;
    const ALT: u8 = 64;
    const SHIFT: u16 = 1;

    fn key(code: u8, state: u16) -> KeyEvent {
        KeyEvent {
            root: 1,
            window: 1,
            keycode: code,
            state,
        }
    }

    fn press(code: u8, state: u16) -> XEvent {
        XEvent::KeyPress(key(code, state))
    }

    fn release(code: u8) -> XEvent {
        XEvent::KeyRelease(key(code, 0))
    }

    /// A manager with three windows and a few keys mapped
    fn three_windows() -> WindowManager<MockXConn> {
        let mut wm = wm_with(vec![]);
        for window in [10, 20, 30] {
            manage(&mut wm, window, (0, 0, 100, 100));
        }

        for (code, sym) in [
            (TAB, 0xff09),
            (ALT, 0xffe9),
            (43, 0x68),
            (44, 0x6a),
            (57, 0x6e),
            (10, 0x31),
            (11, 0x32),
            (113, 0xff51),
            (38, 0x61),
            (53, 0x78),
            (9, 0xff1b),
        ] {
            wm.conn.map_key(code, sym);
        }

        wm
    }

    fn focus_count(wm: &WindowManager<MockXConn>) -> usize {
        wm.conn.count(|r| matches!(r, Request::Focus(_)))
    }

    #[test]
    fn cycle_advances_while_held() {
        let mut wm = three_windows();
        for event in [
            press(TAB, 8),
            release(TAB),
            press(TAB, 8),
            release(TAB),
            release(ALT),
        ] {
            wm.conn.push_event(event);
        }
        wm.step().unwrap();

        assert_eq!(wm.state.mode, Mode::Running);
        assert_eq!(focus_count(&wm), 2);
        assert_eq!(wm.state.current, Some(20));
        assert!(wm.conn.remaining_events().is_empty());

        let requests = wm.conn.requests();
        let ungrab = requests.iter().position(|r| *r == Request::UngrabKeyboard).unwrap();
        let active = requests
            .iter()
            .position(|r| *r == Request::ActiveWindow(1, Some(20)))
            .unwrap();
        assert!(requests.contains(&Request::GrabKeyboard(1)));
        assert!(ungrab < active);

        assert_eq!(wm.state.clients.iter().next().unwrap().window(), 20);
    }

    #[test]
    fn refused_grab_runs_once() {
        let mut wm = three_windows();
        wm.conn.refuse_grabs();
        for event in [press(TAB, 8), release(TAB), release(ALT)] {
            wm.conn.push_event(event);
        }
        wm.step().unwrap();

        assert_eq!(wm.state.mode, Mode::Running);
        assert_eq!(focus_count(&wm), 1);
        assert_eq!(wm.state.current, Some(30));
        assert!(!wm.conn.requests().contains(&Request::UngrabKeyboard));
        assert_eq!(wm.conn.remaining_events(), vec![release(TAB), release(ALT)]);
    }

    #[test]
    fn nudge_and_resize() {
        let mut wm = three_windows();
        wm.state.current = Some(10);
        let start = wm.state.client(10).unwrap().geometry;

        wm.conn.push_event(press(43, 8));
        wm.step().unwrap();
        assert_eq!(wm.state.client(10).unwrap().geometry.x, start.x - 16);
        assert_eq!(wm.conn.count(|r| matches!(r, Request::ConfigureNotify(..))), 1);

        wm.conn.clear_requests();
        wm.conn.push_event(press(44, 8 | SHIFT));
        wm.step().unwrap();

        let geom = wm.state.client(10).unwrap().geometry;
        assert_eq!(geom.height, start.height + 16);
        assert_eq!(wm.conn.count(|r| matches!(r, Request::ConfigureNotify(..))), 0);
        assert!(wm.conn.requests().contains(&Request::DiscardEnterEvents));
    }

    #[test]
    fn resizing_respects_the_minimum() {
        let mut wm = three_windows();
        wm.state.current = Some(10);
        wm.state.client_mut(10).unwrap().geometry.width = 10;

        wm.conn.push_event(press(43, 8 | SHIFT));
        wm.step().unwrap();
        assert_eq!(wm.state.client(10).unwrap().geometry.width, 10);
    }

    #[test]
    fn corner_snap_twice_changes_nothing() {
        let mut wm = three_windows();
        wm.state.current = Some(10);
        let frame = wm.state.client(10).unwrap().frame();

        wm.conn.push_event(press(57, 8));
        wm.step().unwrap();
        let first = wm.state.client(10).unwrap().geometry;
        assert_eq!(first, Geometry::new(1819, 979, 100, 100, 1));

        wm.conn.clear_requests();
        wm.conn.push_event(press(57, 8));
        wm.step().unwrap();

        assert_eq!(wm.state.client(10).unwrap().geometry, first);
        match &wm.conn.requests()[0] {
            Request::Configure(w, mask, _) => assert_eq!((*w, *mask), (frame, ConfigMask::STACK_MODE)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn desktop_keys() {
        let mut wm = three_windows();

        wm.conn.push_event(press(11, 8));
        wm.step().unwrap();
        assert_eq!(wm.state.screens[0].vdesk, 1);

        wm.conn.push_event(press(113, 8));
        wm.step().unwrap();
        assert_eq!(wm.state.screens[0].vdesk, 0);

        wm.conn.push_event(press(113, 8));
        wm.step().unwrap();
        assert_eq!(wm.state.screens[0].vdesk, 0);

        wm.conn.push_event(press(38, 8));
        wm.step().unwrap();
        assert_eq!(wm.state.screens[0].vdesk, 1);
        assert_eq!(wm.state.screens[0].old_vdesk, 0);
    }

    #[test]
    fn client_keys_need_a_focused_client() {
        let mut wm = three_windows();
        wm.conn.push_event(press(9, 8));
        wm.step().unwrap();
        assert!(wm.conn.requests().is_empty());

        wm.state.current = Some(20);
        wm.conn.push_event(press(9, 8 | SHIFT));
        wm.conn.push_event(press(53, 8));
        wm.step().unwrap();
        wm.step().unwrap();

        assert!(wm.conn.requests().contains(&Request::Close(20, true)));
        assert_eq!(
            wm.state.client(20).unwrap().geometry,
            Geometry::new(0, 0, 1920, 1080, 1)
        );
    }
}
