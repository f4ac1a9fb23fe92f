//! Properties on the server

use crate::{
    core::{Colormap, Window},
    geometry::{Gravity, SizeLimits},
};

// ============================ SizeHints =============================

/// The parts of a `WM_NORMAL_HINTS` property that are used when placing and
/// sizing a client. Fields the client did not set are `None`
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct SizeHints {
    /// Requested position, and whether the user (rather than the program) set it
    pub(crate) position:    Option<(bool, i32, i32)>,
    /// Requested size
    pub(crate) size:        Option<(i32, i32)>,
    /// Program-specified minimum size
    pub(crate) min_size:    Option<(i32, i32)>,
    /// Program-specified maximum size
    pub(crate) max_size:    Option<(i32, i32)>,
    /// Program-specified resize increments
    pub(crate) increment:   Option<(i32, i32)>,
    /// Program-specified base size
    pub(crate) base_size:   Option<(i32, i32)>,
    /// Program-specified window gravity, as a protocol value
    pub(crate) win_gravity: Option<u32>,
}

impl SizeHints {
    /// The size limits to enforce. A missing minimum falls back to the base
    /// size, as ICCCM suggests
    pub(crate) fn limits(&self) -> SizeLimits {
        let (min_width, min_height) = self.min_size.or(self.base_size).unwrap_or((0, 0));
        let (max_width, max_height) = self.max_size.unwrap_or((0, 0));

        SizeLimits {
            min_width:  min_width.max(1),
            min_height: min_height.max(1),
            max_width:  max_width.max(0),
            max_height: max_height.max(0),
        }
    }

    /// Base size, falling back to the minimum size
    pub(crate) fn base(&self) -> (i32, i32) {
        self.base_size.or(self.min_size).unwrap_or((0, 0))
    }

    /// Resize increments, `0` when unset
    pub(crate) fn increments(&self) -> (i32, i32) {
        self.increment.unwrap_or((0, 0))
    }

    /// Gravity the client asked for
    pub(crate) fn gravity(&self) -> Gravity {
        self.win_gravity.map_or(Gravity::NorthWest, Gravity::from_raw)
    }
}

// ======================= Window Attributes ==========================

/// The bits of `GetWindowAttributes` and `GetGeometry` needed to manage a
/// window
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct WindowAttributes {
    /// Root of the screen the window lives on
    pub(crate) root:              Window,
    pub(crate) x:                 i32,
    pub(crate) y:                 i32,
    pub(crate) width:             i32,
    pub(crate) height:            i32,
    /// Border width the window had before it was managed
    pub(crate) border:            i32,
    /// The window asked to be left alone
    pub(crate) override_redirect: bool,
    /// The window is currently mapped and visible
    pub(crate) viewable:          bool,
    pub(crate) colormap:          Colormap,
}

// ======================= Icccm Window State ======================

/// Possible values for setting the `WM_STATE` property on a client.
///
/// See the [ICCCM docs][1] for more information.
///
/// [1]: https://tronche.com/gui/x/icccm/sec-4.html#s-4.1.3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum IcccmWindowState {
    /// Not managed, or no longer managed
    Withdrawn,
    /// Window is visible
    Normal,
    /// Window's icon is visible
    Iconic,
}

impl From<IcccmWindowState> for u32 {
    fn from(u: IcccmWindowState) -> Self {
        match u {
            IcccmWindowState::Withdrawn => 0,
            IcccmWindowState::Normal => 1,
            IcccmWindowState::Iconic => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SizeHints;
    use crate::geometry::Gravity;

    #[test]
    fn limits_fall_back_to_base_size() {
        let hints = SizeHints {
            base_size: Some((40, 30)),
            max_size: Some((400, 0)),
            ..SizeHints::default()
        };
        let limits = hints.limits();

        assert_eq!((limits.min_width, limits.min_height), (40, 30));
        assert_eq!((limits.max_width, limits.max_height), (400, 0));
        assert_eq!(hints.base(), (40, 30));
    }

    #[test]
    fn empty_hints() {
        let hints = SizeHints::default();
        let limits = hints.limits();

        assert_eq!((limits.min_width, limits.min_height), (1, 1));
        assert_eq!(hints.increments(), (0, 0));
        assert_eq!(hints.gravity(), Gravity::NorthWest);
    }
}
