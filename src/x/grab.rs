//! Active grabs that are released when they go out of scope

use super::xconnection::XConn;
use crate::core::Window;
use anyhow::Result;

/// Exclusive control of the keyboard
pub(crate) struct KeyboardGrab<'a, X: XConn> {
    conn: &'a X,
}

impl<'a, X: XConn> KeyboardGrab<'a, X> {
    /// Grab the keyboard, or `None` if another client holds it
    pub(crate) fn acquire(conn: &'a X, root: Window) -> Result<Option<Self>> {
        Ok(conn.grab_keyboard(root)?.then(|| Self { conn }))
    }
}

impl<X: XConn> Drop for KeyboardGrab<'_, X> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.ungrab_keyboard() {
            log::warn!("failed to release the keyboard: {}", e);
        }
    }
}

/// Exclusive control of the pointer
pub(crate) struct PointerGrab<'a, X: XConn> {
    conn: &'a X,
}

impl<'a, X: XConn> PointerGrab<'a, X> {
    /// Grab the pointer, or `None` if another client holds it
    pub(crate) fn acquire(conn: &'a X, root: Window) -> Result<Option<Self>> {
        Ok(conn.grab_pointer(root)?.then(|| Self { conn }))
    }
}

impl<X: XConn> Drop for PointerGrab<'_, X> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.ungrab_pointer() {
            log::warn!("failed to release the pointer: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x::mock::{MockXConn, Request};

    #[test]
    fn released_on_drop() {
        let conn = MockXConn::new(vec![]);
        {
            let grab = KeyboardGrab::acquire(&conn, 1).unwrap();
            assert!(grab.is_some());
        }
        assert_eq!(conn.requests(), vec![
            Request::GrabKeyboard(1),
            Request::UngrabKeyboard
        ]);
    }

    #[test]
    fn refused_grab_is_not_released() {
        let conn = MockXConn::new(vec![]);
        conn.refuse_grabs();

        assert!(PointerGrab::acquire(&conn, 1).unwrap().is_none());
        assert_eq!(conn.requests(), vec![Request::GrabPointer(1)]);
    }
}
