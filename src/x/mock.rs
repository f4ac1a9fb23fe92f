//! A scripted stand-in for the X-Server that records every request

use super::{
    event::{EventFilter, XEvent},
    property::{IcccmWindowState, SizeHints, WindowAttributes},
    xconnection::{RootInfo, XConn},
};
use crate::{
    core::{Colormap, Desktop, Keycode, Keysym, Maximise, Pixel, Window},
    geometry::{ConfigMask, Dimension, Geometry, Point, WindowChanges},
    utils,
};
use anyhow::{anyhow, Result};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet, VecDeque},
};

/// First ID handed out to frames
pub(crate) const FIRST_FRAME: Window = 0x1000;

/// A request made of the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    BecomeWm(Window),
    RefreshMapping,
    GrabKeys(Window),
    GrabKeyboard(Window),
    UngrabKeyboard,
    GrabPointer(Window),
    UngrabPointer,
    WarpPointer(Window, Point),
    DiscardEnterEvents,
    CreateFrame(Window, Geometry),
    Reparent(Window, Window, Point),
    SaveSet(Window, bool),
    SelectInput(Window),
    Map(Window),
    Unmap(Window),
    Destroy(Window),
    Raise(Window),
    Lower(Window),
    Configure(Window, ConfigMask, WindowChanges),
    MoveResize(Window, Point, Dimension),
    ConfigureNotify(Window, Geometry),
    BorderColor(Window, Pixel),
    BorderWidth(Window, i32),
    Focus(Window),
    ClearFocus,
    InstallColormap(Colormap),
    ApplyShape(Window, Window),
    Close(Window, bool),
    WmState(Window, IcccmWindowState),
    FrameExtents(Window, i32),
    ActiveWindow(Window, Option<Window>),
    CurrentDesktop(Window, u32),
    WindowDesktop(Window, Desktop),
    ClientList(Window, Vec<Window>),
    NetWmState(Window, Maximise),
    RemoveProperties(Window),
}

/// Mock connection used by the tests
#[derive(Debug)]
pub(crate) struct MockXConn {
    events:     RefCell<VecDeque<XEvent>>,
    requests:   RefCell<Vec<Request>>,
    screens:    Vec<RootInfo>,
    attributes: RefCell<HashMap<Window, WindowAttributes>>,
    hints:      RefCell<HashMap<Window, SizeHints>>,
    desktops:   RefCell<HashMap<Window, u32>>,
    docks:      RefCell<HashSet<Window>>,
    keysyms:    RefCell<HashMap<Keycode, Keysym>>,
    pointer:    Cell<Option<Point>>,
    refuse:     Cell<bool>,
    next_frame: Cell<Window>,
    /// Requests the server answers with an error
    failing:    RefCell<Vec<Request>>,
    /// Number of waits that fail before events are served again
    bad_waits:  Cell<usize>,
    /// Request during which a terminating signal arrives
    exit_on:    RefCell<Option<Request>>,
}

impl MockXConn {
    /// A single 1920x1080 screen with root window `1`
    pub(crate) fn new(events: Vec<XEvent>) -> Self {
        Self::with_screens(events, vec![RootInfo {
            root:   1,
            width:  1920,
            height: 1080,
        }])
    }

    pub(crate) fn with_screens(events: Vec<XEvent>, screens: Vec<RootInfo>) -> Self {
        Self {
            events: RefCell::new(events.into()),
            requests: RefCell::new(vec![]),
            screens,
            attributes: RefCell::new(HashMap::new()),
            hints: RefCell::new(HashMap::new()),
            desktops: RefCell::new(HashMap::new()),
            docks: RefCell::new(HashSet::new()),
            keysyms: RefCell::new(HashMap::new()),
            pointer: Cell::new(Some(Point::new(960, 540))),
            refuse: Cell::new(false),
            next_frame: Cell::new(FIRST_FRAME),
            failing: RefCell::new(vec![]),
            bad_waits: Cell::new(0),
            exit_on: RefCell::new(None),
        }
    }

    // ========================== Script ========================== [[[

    pub(crate) fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    /// Events that have not been read yet
    pub(crate) fn remaining_events(&self) -> Vec<XEvent> {
        self.events.borrow().iter().cloned().collect()
    }

    pub(crate) fn add_window(&self, window: Window, attrs: WindowAttributes) {
        self.attributes.borrow_mut().insert(window, attrs);
    }

    pub(crate) fn set_hints(&self, window: Window, hints: SizeHints) {
        self.hints.borrow_mut().insert(window, hints);
    }

    pub(crate) fn set_desktop(&self, window: Window, desktop: u32) {
        self.desktops.borrow_mut().insert(window, desktop);
    }

    pub(crate) fn set_dock(&self, window: Window, dock: bool) {
        if dock {
            self.docks.borrow_mut().insert(window);
        } else {
            self.docks.borrow_mut().remove(&window);
        }
    }

    pub(crate) fn map_key(&self, code: Keycode, sym: Keysym) {
        self.keysyms.borrow_mut().insert(code, sym);
    }

    pub(crate) fn set_pointer(&self, pointer: Option<Point>) {
        self.pointer.set(pointer);
    }

    /// Make every active grab fail from now on
    pub(crate) fn refuse_grabs(&self) {
        self.refuse.set(true);
    }

    /// Answer `request` with an error. It is still recorded
    pub(crate) fn fail_request(&self, request: Request) {
        self.failing.borrow_mut().push(request);
    }

    /// Make the next `count` waits for an event fail
    pub(crate) fn fail_waits(&self, count: usize) {
        self.bad_waits.set(count);
    }

    /// Raise the exit flag while `request` is being made
    pub(crate) fn exit_on(&self, request: Request) {
        *self.exit_on.borrow_mut() = Some(request);
    }

    // ]]] === Script ===

    // ========================== Inspect ========================= [[[

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    pub(crate) fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    /// Number of recorded requests matching `pred`
    pub(crate) fn count<F: Fn(&Request) -> bool>(&self, pred: F) -> usize {
        self.requests.borrow().iter().filter(|r| pred(r)).count()
    }

    fn record(&self, request: Request) -> Result<()> {
        if self.exit_on.borrow().as_ref() == Some(&request) {
            utils::request_exit();
        }

        let failed = self.failing.borrow().contains(&request);
        self.requests.borrow_mut().push(request);

        if failed {
            Err(anyhow!("BadWindow"))
        } else {
            Ok(())
        }
    }

    // ]]] === Inspect ===
}

impl XConn for MockXConn {
    fn wait_for_event(&self) -> Result<Option<XEvent>> {
        let bad = self.bad_waits.get();
        if bad > 0 {
            self.bad_waits.set(bad - 1);
            return Err(anyhow!("connection reset"));
        }

        Ok(self.events.borrow_mut().pop_front())
    }

    fn wait_for_masked(&self, filter: EventFilter) -> Result<Option<XEvent>> {
        let mut events = self.events.borrow_mut();
        let pos = events
            .iter()
            .position(|e| filter.matches(e))
            .ok_or_else(|| anyhow!("no more events for {:?}", filter))?;

        Ok(events.remove(pos))
    }

    fn discard_enter_events(&self) -> Result<()> {
        self.events
            .borrow_mut()
            .retain(|e| !matches!(e, XEvent::EnterNotify(_)));
        self.record(Request::DiscardEnterEvents)
    }

    fn flush(&self) -> bool {
        true
    }

    fn screens(&self) -> Vec<RootInfo> {
        self.screens.clone()
    }

    fn become_wm(&self, _screen: usize, root: Window, _num_desktops: u32) -> Result<()> {
        self.record(Request::BecomeWm(root))
    }

    fn existing_windows(&self, root: Window) -> Result<Vec<Window>> {
        let mut windows = self
            .attributes
            .borrow()
            .iter()
            .filter(|(_, a)| a.root == root && a.viewable && !a.override_redirect)
            .map(|(w, _)| *w)
            .collect::<Vec<_>>();
        windows.sort_unstable();

        Ok(windows)
    }

    fn keycode_to_keysym(&self, code: Keycode) -> Keysym {
        self.keysyms.borrow().get(&code).copied().unwrap_or(0)
    }

    fn refresh_keyboard_mapping(&self) -> Result<()> {
        self.record(Request::RefreshMapping)
    }

    fn grab_keys(&self, root: Window, _bindings: &[(Keysym, u16)]) -> Result<()> {
        self.record(Request::GrabKeys(root))
    }

    fn grab_keyboard(&self, root: Window) -> Result<bool> {
        self.record(Request::GrabKeyboard(root))?;
        Ok(!self.refuse.get())
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.record(Request::UngrabKeyboard)
    }

    fn grab_pointer(&self, root: Window) -> Result<bool> {
        self.record(Request::GrabPointer(root))?;
        Ok(!self.refuse.get())
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.record(Request::UngrabPointer)
    }

    fn query_pointer(&self, _root: Window) -> Result<Option<Point>> {
        Ok(self.pointer.get())
    }

    fn warp_pointer(&self, window: Window, pnt: Point) -> Result<()> {
        self.record(Request::WarpPointer(window, pnt))
    }

    fn window_attributes(&self, window: Window) -> Result<WindowAttributes> {
        self.attributes
            .borrow()
            .get(&window)
            .copied()
            .ok_or_else(|| anyhow!("BadWindow: {:#0x}", window))
    }

    fn size_hints(&self, window: Window) -> SizeHints {
        self.hints.borrow().get(&window).copied().unwrap_or_default()
    }

    fn is_dock(&self, window: Window) -> bool {
        self.docks.borrow().contains(&window)
    }

    fn window_desktop(&self, window: Window) -> Option<u32> {
        self.desktops.borrow().get(&window).copied()
    }

    fn create_frame(
        &self,
        root: Window,
        geom: &Geometry,
        _border_color: Pixel,
        _mouse_mask: u16,
    ) -> Result<Window> {
        let frame = self.next_frame.get();
        self.next_frame.set(frame + 1);
        self.record(Request::CreateFrame(root, *geom))?;

        Ok(frame)
    }

    fn reparent_window(&self, window: Window, parent: Window, pnt: Point) -> Result<()> {
        self.record(Request::Reparent(window, parent, pnt))
    }

    fn change_save_set(&self, window: Window, insert: bool) -> Result<()> {
        self.record(Request::SaveSet(window, insert))
    }

    fn select_client_input(&self, window: Window) -> Result<()> {
        self.record(Request::SelectInput(window))
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.record(Request::Map(window))
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.record(Request::Unmap(window))
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.record(Request::Destroy(window))
    }

    fn raise_window(&self, window: Window) -> Result<()> {
        self.record(Request::Raise(window))
    }

    fn lower_window(&self, window: Window) -> Result<()> {
        self.record(Request::Lower(window))
    }

    fn configure_window(
        &self,
        window: Window,
        mask: ConfigMask,
        changes: &WindowChanges,
    ) -> Result<()> {
        self.record(Request::Configure(window, mask, *changes))
    }

    fn move_resize_window(&self, window: Window, pnt: Point, dim: Dimension) -> Result<()> {
        self.record(Request::MoveResize(window, pnt, dim))
    }

    fn send_configure_notify(&self, window: Window, geom: &Geometry) -> Result<()> {
        self.record(Request::ConfigureNotify(window, *geom))
    }

    fn set_border_color(&self, window: Window, color: Pixel) -> Result<()> {
        self.record(Request::BorderColor(window, color))
    }

    fn set_border_width(&self, window: Window, width: i32) -> Result<()> {
        self.record(Request::BorderWidth(window, width))
    }

    fn focus_window(&self, window: Window) -> Result<()> {
        self.record(Request::Focus(window))
    }

    fn clear_focus(&self) -> Result<()> {
        self.record(Request::ClearFocus)
    }

    fn install_colormap(&self, colormap: Colormap) -> Result<()> {
        self.record(Request::InstallColormap(colormap))
    }

    fn apply_shape(&self, window: Window, frame: Window) -> Result<()> {
        self.record(Request::ApplyShape(window, frame))
    }

    fn close_window(&self, window: Window, force: bool) -> Result<()> {
        self.record(Request::Close(window, force))
    }

    fn set_wm_state(&self, window: Window, state: IcccmWindowState) -> Result<()> {
        self.record(Request::WmState(window, state))
    }

    fn set_frame_extents(&self, window: Window, border: i32) -> Result<()> {
        self.record(Request::FrameExtents(window, border))
    }

    fn set_active_window(&self, root: Window, window: Option<Window>) -> Result<()> {
        self.record(Request::ActiveWindow(root, window))
    }

    fn set_current_desktop(&self, root: Window, desktop: u32) -> Result<()> {
        self.record(Request::CurrentDesktop(root, desktop))
    }

    fn set_window_desktop(&self, window: Window, desktop: Desktop) -> Result<()> {
        self.record(Request::WindowDesktop(window, desktop))
    }

    fn set_client_list(&self, root: Window, windows: &[Window]) -> Result<()> {
        self.record(Request::ClientList(root, windows.to_vec()))
    }

    fn set_net_wm_state(&self, window: Window, maximised: Maximise) -> Result<()> {
        self.record(Request::NetWmState(window, maximised))
    }

    fn remove_window_properties(&self, window: Window) -> Result<()> {
        self.record(Request::RemoveProperties(window))
    }
}
