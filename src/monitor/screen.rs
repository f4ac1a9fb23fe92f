//! Interactions with the [`ScreenInfo`] struct

use crate::{
    core::{Desktop, Window},
    geometry::Dimension,
    x::xconnection::RootInfo,
};

/// A screen of the display and its virtual desktop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScreenInfo {
    index:     usize,
    root:      Window,
    dimension: Dimension,

    /// Desktop currently shown
    pub(crate) vdesk:         u32,
    /// Desktop shown before the last switch
    pub(crate) old_vdesk:     u32,
    pub(crate) docks_visible: bool,
}

impl ScreenInfo {
    /// Create a new [`ScreenInfo`]
    pub(crate) const fn new(index: usize, info: RootInfo) -> Self {
        Self {
            index,
            root: info.root,
            dimension: Dimension::new(info.width, info.height),
            vdesk: 0,
            old_vdesk: 0,
            docks_visible: true,
        }
    }

    pub(crate) const fn index(&self) -> usize {
        self.index
    }

    pub(crate) const fn root(&self) -> Window {
        self.root
    }

    /// Size of the screen in pixels
    pub(crate) const fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub(crate) fn set_dimension(&mut self, dimension: Dimension) {
        log::debug!("screen {} is now {}", self.index, dimension);
        self.dimension = dimension;
    }

    /// Is a client on `desktop` shown right now
    pub(crate) fn shows(&self, desktop: Desktop) -> bool {
        desktop.is_fixed() || desktop == Desktop::Index(self.vdesk)
    }
}
