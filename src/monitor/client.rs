//! Metadata about a managed X-window

use crate::{
    core::{Colormap, Desktop, Maximise, Window, DEFAULT_INCREMENT},
    geometry::{Dimension, Geometry, Gravity, SizeLimits},
    x::property::SizeHints,
};

// =============================== Client ============================= [[[

/// A managed top-level [`Window`] and the frame it is reparented into
#[derive(Debug, Clone)]
pub(crate) struct Client {
    /// The application's window
    window: Window,
    /// The frame created by the window manager
    frame:  Window,
    /// Index of the screen the client lives on
    screen: usize,

    /// Authoritative geometry of the content window
    pub(crate) geometry: Geometry,
    /// Border the window had before it was managed
    old_border:          i32,
    /// Position and size saved by maximising. A `0` size means "not maximised"
    pub(crate) oldx:     i32,
    pub(crate) oldy:     i32,
    pub(crate) oldw:     i32,
    pub(crate) oldh:     i32,

    limits:       SizeLimits,
    base:         Dimension,
    increment:    Dimension,
    /// Gravity the application asked for in `WM_NORMAL_HINTS`
    gravity_hint: Gravity,
    /// Gravity last used to resolve a change
    gravity:      Gravity,

    pub(crate) desktop:  Desktop,
    pub(crate) is_dock:  bool,
    pub(crate) colormap: Colormap,

    /// Number of unmaps caused by the window manager that are still to come
    expected_unmap_count: u32,
    /// Flagged for the next tidy pass
    remove:               bool,
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window
    }
}

impl Client {
    /// Create a new [`Client`]
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        window: Window,
        frame: Window,
        screen: usize,
        geometry: Geometry,
        old_border: i32,
        hints: &SizeHints,
        desktop: Desktop,
        colormap: Colormap,
    ) -> Self {
        let mut client = Self {
            window,
            frame,
            screen,
            geometry,
            old_border,
            oldx: 0,
            oldy: 0,
            oldw: 0,
            oldh: 0,
            limits: SizeLimits::default(),
            base: Dimension::default(),
            increment: Dimension::default(),
            gravity_hint: Gravity::NorthWest,
            gravity: Gravity::NorthWest,
            desktop,
            is_dock: false,
            colormap,
            expected_unmap_count: 0,
            remove: false,
        };
        client.update_hints(hints);
        client
    }

    /// Return the client [`Window`] and the frame
    pub(crate) const fn windows(&self) -> (Window, Window) {
        (self.window, self.frame)
    }

    pub(crate) const fn window(&self) -> Window {
        self.window
    }

    pub(crate) const fn frame(&self) -> Window {
        self.frame
    }

    pub(crate) const fn screen(&self) -> usize {
        self.screen
    }

    pub(crate) const fn old_border(&self) -> i32 {
        self.old_border
    }

    // =========================== Hints ========================== [[[

    /// Take new size constraints from `WM_NORMAL_HINTS`
    pub(crate) fn update_hints(&mut self, hints: &SizeHints) {
        let (base_w, base_h) = hints.base();
        let (inc_w, inc_h) = hints.increments();

        self.limits = hints.limits();
        self.base = Dimension::new(base_w, base_h);
        self.increment = Dimension::new(inc_w, inc_h);
        self.gravity_hint = hints.gravity();
    }

    pub(crate) const fn limits(&self) -> SizeLimits {
        self.limits
    }

    pub(crate) const fn base(&self) -> Dimension {
        self.base
    }

    pub(crate) const fn increment(&self) -> Dimension {
        self.increment
    }

    /// Step used by keyboard resizing. Increments of `1` or less are useless
    /// for that, so a fixed step is used instead
    pub(crate) fn resize_step(&self) -> Dimension {
        let step = |inc: i32| if inc > 1 { inc } else { DEFAULT_INCREMENT };
        Dimension::new(step(self.increment.width), step(self.increment.height))
    }

    pub(crate) const fn gravity_hint(&self) -> Gravity {
        self.gravity_hint
    }

    pub(crate) const fn gravity(&self) -> Gravity {
        self.gravity
    }

    pub(crate) fn set_gravity(&mut self, gravity: Gravity) {
        self.gravity = gravity;
    }

    // ]]] === Hints ===

    /// Is the client shown while `vdesk` is the current desktop
    pub(crate) fn is_visible_on(&self, vdesk: u32) -> bool {
        self.desktop.is_fixed() || self.desktop == Desktop::Index(vdesk)
    }

    /// Axes the client is currently maximised along
    pub(crate) fn maximised(&self) -> Maximise {
        let mut axes = Maximise::empty();
        axes.set(Maximise::HORZ, self.oldw != 0);
        axes.set(Maximise::VERT, self.oldh != 0);
        axes
    }

    // ========================== Unmaps ========================== [[[

    /// Remember that an unmap is about to be caused by the window manager
    pub(crate) fn expect_unmap(&mut self) {
        self.expected_unmap_count += 1;
    }

    pub(crate) const fn is_expecting_unmap(&self) -> bool {
        self.expected_unmap_count > 0
    }

    pub(crate) const fn expected_unmaps(&self) -> u32 {
        self.expected_unmap_count
    }

    /// Use up one expected unmap. Returns whether there was one
    pub(crate) fn consume_unmap_if_expecting(&mut self) -> bool {
        let expecting = self.expected_unmap_count > 0;

        if expecting {
            self.expected_unmap_count -= 1;
        }

        expecting
    }

    // ]]] === Unmaps ===

    pub(crate) fn mark_for_removal(&mut self) {
        self.remove = true;
    }

    pub(crate) const fn is_marked_for_removal(&self) -> bool {
        self.remove
    }
}

// ]]] === Client ===

// ============================= ClientList =========================== [[[

/// Every managed [`Client`], in tab order. The head is the most recently
/// selected client
#[derive(Debug, Clone, Default)]
pub(crate) struct ClientList {
    clients: Vec<Client>,
}

impl ClientList {
    /// Add a new client at the head of the tab order
    pub(crate) fn insert(&mut self, client: Client) {
        self.clients.insert(0, client);
    }

    /// Index of the client owning `window` (as client window or frame)
    fn position(&self, window: Window) -> Option<usize> {
        self.clients
            .iter()
            .position(|c| c.window == window || c.frame == window)
    }

    /// Find the client owning `window`, which may be its frame
    pub(crate) fn find(&self, window: Window) -> Option<&Client> {
        self.position(window).map(|idx| &self.clients[idx])
    }

    pub(crate) fn find_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.position(window).map(move |idx| &mut self.clients[idx])
    }

    pub(crate) fn contains(&self, window: Window) -> bool {
        self.position(window).is_some()
    }

    /// Remove and return the client owning `window`
    pub(crate) fn remove(&mut self, window: Window) -> Option<Client> {
        self.position(window).map(|idx| self.clients.remove(idx))
    }

    /// Move a client to the head of the tab order
    pub(crate) fn to_head(&mut self, window: Window) {
        if let Some(idx) = self.position(window) {
            let client = self.clients.remove(idx);
            self.clients.insert(0, client);
        }
    }

    /// The first client after `current` in tab order, wrapping around, that
    /// satisfies `pred`. `current` itself is never returned
    pub(crate) fn next_after<F>(&self, current: Option<Window>, pred: F) -> Option<Window>
    where
        F: Fn(&Client) -> bool,
    {
        let len = self.clients.len();
        let (first, count) = match current.and_then(|w| self.position(w)) {
            Some(idx) => (idx + 1, len.saturating_sub(1)),
            None => (0, len),
        };

        (0..count)
            .map(|k| &self.clients[(first + k) % len])
            .find(|c| pred(c))
            .map(Client::window)
    }

    /// Windows of every client flagged for removal
    pub(crate) fn marked_for_removal(&self) -> Vec<Window> {
        self.clients
            .iter()
            .filter(|c| c.is_marked_for_removal())
            .map(Client::window)
            .collect()
    }

    /// Client windows on screen `screen`, oldest first
    pub(crate) fn windows_on(&self, screen: usize) -> Vec<Window> {
        self.clients
            .iter()
            .rev()
            .filter(|c| c.screen == screen)
            .map(Client::window)
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// ]]] === ClientList ===
