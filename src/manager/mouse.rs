//! Moving and resizing clients with the mouse

use super::WmState;
use crate::{
    core::Window,
    geometry::{self, ConfigMask, Point, WindowChanges},
    utils,
    x::{grab::PointerGrab, EventFilter, XConn, XEvent},
};
use anyhow::Result;

/// The next event of a pointer grab, or `None` when the window manager is
/// shutting down
fn next_pointer_event<X: XConn>(conn: &X) -> Result<Option<XEvent>> {
    loop {
        match conn.wait_for_masked(EventFilter::Pointer)? {
            Some(event) => return Ok(Some(event)),
            None if utils::exit_requested() => return Ok(None),
            None => {},
        }
    }
}

impl WmState {
    /// Move a client with the pointer until the button is released. Only the
    /// frame moves while dragging; the client hears of it at the end
    pub(crate) fn drag<X: XConn>(&mut self, conn: &X, window: Window, start: Point) -> Result<()> {
        let client = self.client(window)?;
        let (frame, origin) = (client.frame(), client.geometry.point());
        let root = self.screens[client.screen()].root();

        let _grab = match PointerGrab::acquire(conn, root)? {
            Some(grab) => grab,
            None => {
                log::debug!("the pointer is grabbed elsewhere, not dragging");
                return Ok(());
            },
        };
        conn.raise_window(frame)?;

        while let Some(event) = next_pointer_event(conn)? {
            match event {
                XEvent::Motion(motion) if motion.root == root => {
                    let client = self.client_mut(window)?;
                    client.geometry.x = origin.x + motion.root_pos.x - start.x;
                    client.geometry.y = origin.y + motion.root_pos.y - start.y;

                    let pnt = client.geometry.frame_point();
                    conn.configure_window(frame, ConfigMask::POSITION, &WindowChanges {
                        x: pnt.x,
                        y: pnt.y,
                        ..WindowChanges::default()
                    })?;
                },
                XEvent::ButtonRelease(_) => break,
                _ => {},
            }
        }

        self.apply(conn, window, ConfigMask::POSITION, &WindowChanges::default())
    }

    /// Resize a client by sweeping out a rectangle from its top-left corner,
    /// starting with the pointer on the bottom-right one
    pub(crate) fn sweep<X: XConn>(&mut self, conn: &X, window: Window) -> Result<()> {
        let client = self.client(window)?;
        let (frame, geom) = (client.frame(), client.geometry);
        let (limits, base, inc) = (client.limits(), client.base(), client.increment());
        let root = self.screens[client.screen()].root();

        let _grab = match PointerGrab::acquire(conn, root)? {
            Some(grab) => grab,
            None => {
                log::debug!("the pointer is grabbed elsewhere, not resizing");
                return Ok(());
            },
        };
        conn.raise_window(frame)?;
        conn.warp_pointer(window, Point::new(geom.width, geom.height))?;

        let mask = ConfigMask::POSITION | ConfigMask::SIZE;
        while let Some(event) = next_pointer_event(conn)? {
            match event {
                XEvent::Motion(motion) if motion.root == root => {
                    let (pnt, dim) = geometry::sweep(geom.point(), motion.root_pos, limits, base, inc);
                    let client = self.client_mut(window)?;
                    client.geometry.x = pnt.x;
                    client.geometry.y = pnt.y;
                    client.geometry.width = dim.width;
                    client.geometry.height = dim.height;

                    self.apply(conn, window, mask, &WindowChanges::default())?;
                },
                XEvent::ButtonRelease(_) => break,
                _ => {},
            }
        }

        self.apply(conn, window, mask, &WindowChanges::default())
    }
}
