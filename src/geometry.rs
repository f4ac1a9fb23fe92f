//! Structures used to map areas on the screen, and the gravity resolution
//! that keeps a window anchored while it changes size

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::Window;

// =============================== Point ============================== [[[

/// A position on the screen, or an offset into a window
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub(crate) struct Point {
    /// X-coordinate
    pub(crate) x: i32,
    /// Y-coordinate
    pub(crate) y: i32,
}

impl Point {
    /// Create a new [`Point`]
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

// ]]] === Point ===

// ============================= Dimension ============================ [[[

/// Width and height of an area
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct Dimension {
    /// Width of the area
    pub(crate) width:  i32,
    /// Height of the area
    pub(crate) height: i32,
}

impl Dimension {
    /// Create a new [`Dimension`]
    pub(crate) const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ]]] === Dimension ===

// ============================= Geometry ============================= [[[

/// Position and size of a client's content window, in root coordinates.
///
/// The frame around it occupies
/// `(x - border, y - border, width + 2 * border, height + 2 * border)`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Geometry {
    pub(crate) x:      i32,
    pub(crate) y:      i32,
    pub(crate) width:  i32,
    pub(crate) height: i32,
    pub(crate) border: i32,
}

impl Geometry {
    /// Create a new [`Geometry`]
    pub(crate) const fn new(x: i32, y: i32, width: i32, height: i32, border: i32) -> Self {
        Self { x, y, width, height, border }
    }

    /// Top-left corner of the content window
    pub(crate) const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Size of the content window
    pub(crate) const fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    /// Top-left corner of the frame
    pub(crate) const fn frame_point(&self) -> Point {
        Point::new(
            self.x.saturating_sub(self.border),
            self.y.saturating_sub(self.border),
        )
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{} (border {})",
            self.width, self.height, self.x, self.y, self.border
        )
    }
}

// ]]] === Geometry ===

// ============================== Gravity ============================= [[[

/// The point of a window that stays fixed when it is resized.
///
/// Values follow the X protocol numbering. Anything outside `1..=9` (including
/// `StaticGravity`) behaves as [`Gravity::NorthWest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Gravity {
    NorthWest = 1,
    North     = 2,
    NorthEast = 3,
    West      = 4,
    Center    = 5,
    East      = 6,
    SouthWest = 7,
    South     = 8,
    SouthEast = 9,
}

impl Default for Gravity {
    fn default() -> Self {
        Self::NorthWest
    }
}

impl Gravity {
    /// Every anchor, in protocol order
    pub(crate) const ALL: [Self; 9] = [
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
        Self::West,
        Self::Center,
        Self::East,
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
    ];

    /// Convert a protocol value. Unknown values fall back to `NorthWest`
    pub(crate) const fn from_raw(raw: u32) -> Self {
        match raw {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            _ => Self::NorthWest,
        }
    }

    /// The protocol value of this gravity
    pub(crate) const fn to_raw(self) -> u32 {
        self as u32
    }

    /// How far the top-left corner moves when the size grows by `dw`x`dh`
    pub(crate) const fn anchor_shift(self, dw: i32, dh: i32) -> (i32, i32) {
        match self {
            Self::NorthWest => (0, 0),
            Self::North => (dw / 2, 0),
            Self::NorthEast => (dw, 0),
            Self::West => (0, dh / 2),
            Self::Center => (dw / 2, dh / 2),
            Self::East => (dw, dh / 2),
            Self::SouthWest => (0, dh),
            Self::South => (dw / 2, dh),
            Self::SouthEast => (dw, dh),
        }
    }

    /// Offset of the reference point for a border of width `bw`
    pub(crate) const fn border_offset(self, bw: i32) -> (i32, i32) {
        match self {
            Self::NorthWest => (bw, bw),
            Self::North => (0, bw),
            Self::NorthEast => (-bw, bw),
            Self::West => (bw, 0),
            Self::Center => (0, 0),
            Self::East => (-bw, 0),
            Self::SouthWest => (bw, -bw),
            Self::South => (0, -bw),
            Self::SouthEast => (-bw, -bw),
        }
    }
}

/// Move `geom` so that a border of width `bw` is accounted for on the side the
/// gravity anchors to. A negative `bw` undoes it.
///
/// An axis that exactly covers the screen from the origin is left alone, so
/// maximised windows keep their edges off-screen.
pub(crate) fn gravitate_border(geom: &mut Geometry, gravity: Gravity, bw: i32, screen: Dimension) {
    let (dx, dy) = gravity.border_offset(bw);

    if geom.x != 0 || geom.width != screen.width {
        geom.x += dx;
    }

    if geom.y != 0 || geom.height != screen.height {
        geom.y += dy;
    }
}

// ]]] === Gravity ===

// ============================ ConfigMask ============================ [[[

bitflags! {
    /// Which fields of a [`WindowChanges`] are meaningful. Bit values match the
    /// protocol's `ConfigWindow` mask
    #[derive(Default)]
    pub(crate) struct ConfigMask: u16 {
        const X            = 1 << 0;
        const Y            = 1 << 1;
        const WIDTH        = 1 << 2;
        const HEIGHT       = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING      = 1 << 5;
        const STACK_MODE   = 1 << 6;

        const POSITION = Self::X.bits | Self::Y.bits;
        const SIZE     = Self::WIDTH.bits | Self::HEIGHT.bits;
    }
}

impl ConfigMask {
    /// A position change that leaves the size alone
    pub(crate) fn is_pure_move(self) -> bool {
        self.intersects(Self::POSITION) && !self.intersects(Self::SIZE)
    }
}

/// Stacking mode values from the X protocol
pub(crate) mod stack_mode {
    pub(crate) const ABOVE: u32 = 0;
}

/// The values of a configure request. Only fields selected by an accompanying
/// [`ConfigMask`] are meaningful
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowChanges {
    pub(crate) x:            i32,
    pub(crate) y:            i32,
    pub(crate) width:        i32,
    pub(crate) height:       i32,
    pub(crate) border_width: i32,
    pub(crate) sibling:      Window,
    pub(crate) stack_mode:   u32,
}

// ]]] === ConfigMask ===

// ============================ SizeLimits ============================ [[[

/// Minimum and maximum size of a client. A maximum of `0` is unbounded
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SizeLimits {
    pub(crate) min_width:  i32,
    pub(crate) min_height: i32,
    pub(crate) max_width:  i32,
    pub(crate) max_height: i32,
}

impl SizeLimits {
    /// Clamp a requested width
    pub(crate) const fn clamp_width(&self, width: i32) -> i32 {
        clamp_axis(width, self.min_width, self.max_width)
    }

    /// Clamp a requested height
    pub(crate) const fn clamp_height(&self, height: i32) -> i32 {
        clamp_axis(height, self.min_height, self.max_height)
    }
}

/// The minimum always applies; the maximum only when nonzero
const fn clamp_axis(value: i32, min: i32, max: i32) -> i32 {
    let value = if value < min { min } else { value };
    if max != 0 && value > max {
        max
    } else {
        value
    }
}

// ]]] === SizeLimits ===

// ============================= Resolver ============================= [[[

/// Outcome of resolving a configure request against a client's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolved {
    /// The new authoritative geometry
    pub(crate) geometry: Geometry,
    /// The mask that must be applied to the frame
    pub(crate) mask:     ConfigMask,
    /// The gravity that was used, to be remembered by the client
    pub(crate) gravity:  Gravity,
}

/// Apply a position/size request to `current`.
///
/// `gravity` is a protocol value where `0` means "use `hint`". When the size
/// changes without an explicit position, the window is shifted so that the
/// point named by the gravity stays where it is, and the effective mask gains
/// `X|Y` because the frame moved.
pub(crate) fn resolve(
    current: Geometry,
    limits: SizeLimits,
    hint: Gravity,
    gravity: u32,
    mask: ConfigMask,
    changes: &WindowChanges,
    screen: Dimension,
) -> Resolved {
    let gravity = if gravity == 0 {
        hint
    } else {
        Gravity::from_raw(gravity)
    };

    let mut geom = current;
    let mut mask = mask;

    if mask.contains(ConfigMask::X) {
        geom.x = changes.x;
    }
    if mask.contains(ConfigMask::Y) {
        geom.y = changes.y;
    }

    if mask.intersects(ConfigMask::SIZE) {
        let explicit = mask.intersects(ConfigMask::POSITION);
        let (mut dw, mut dh) = (0, 0);

        let bw = geom.border;
        if !explicit {
            gravitate_border(&mut geom, gravity, -bw, screen);
        }

        if mask.contains(ConfigMask::WIDTH) {
            let width = limits.clamp_width(changes.width);
            dw = width - geom.width;
            geom.width = width;
        }
        if mask.contains(ConfigMask::HEIGHT) {
            let height = limits.clamp_height(changes.height);
            dh = height - geom.height;
            geom.height = height;
        }

        if !explicit {
            let (sx, sy) = gravity.anchor_shift(dw, dh);
            geom.x -= sx;
            geom.y -= sy;
            mask |= ConfigMask::POSITION;
            gravitate_border(&mut geom, gravity, bw, screen);
        }
    }

    Resolved { geometry: geom, mask, gravity }
}

/// Which [`ConfigMask`] bits differ between two geometries
pub(crate) fn changed_fields(before: &Geometry, after: &Geometry) -> ConfigMask {
    let mut mask = ConfigMask::empty();
    mask.set(ConfigMask::X, before.x != after.x);
    mask.set(ConfigMask::Y, before.y != after.y);
    mask.set(ConfigMask::WIDTH, before.width != after.width);
    mask.set(ConfigMask::HEIGHT, before.height != after.height);
    mask
}

// ]]] === Resolver ===

// ============================== Corners ============================= [[[

/// A corner of the screen a window can be snapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Place the frame of `geom` flush against a corner of the screen
pub(crate) fn snap_to_corner(geom: &mut Geometry, corner: Corner, screen: Dimension) {
    let right = screen.width - geom.width - geom.border;
    let bottom = screen.height - geom.height - geom.border;

    let (x, y) = match corner {
        Corner::TopLeft => (geom.border, geom.border),
        Corner::TopRight => (right, geom.border),
        Corner::BottomLeft => (geom.border, bottom),
        Corner::BottomRight => (right, bottom),
    };

    geom.x = x;
    geom.y = y;
}

/// A window that is maximised along an axis sits at `0` on it with its border
/// off-screen. Moving it by keyboard onto the border offset instead snaps it
/// back to `0`
pub(crate) fn undock_edges(geom: &mut Geometry, oldw: i32, oldh: i32) {
    if geom.x.abs() == geom.border && oldw != 0 {
        geom.x = 0;
    }
    if geom.y.abs() == geom.border && oldh != 0 {
        geom.y = 0;
    }
}

/// Centre `geom` on `pnt`, keeping the frame on the screen where it fits
pub(crate) fn centre_on(geom: &mut Geometry, pnt: Point, screen: Dimension) {
    let border = geom.border;
    let place = |centre: i32, size: i32, extent: i32| {
        (centre - size / 2).min(extent - size - border).max(border)
    };

    geom.x = place(pnt.x, geom.width, screen.width);
    geom.y = place(pnt.y, geom.height, screen.height);
}

/// Size a window from a fixed corner `origin` out to the pointer, in whole
/// resize increments from the base size, within `limits`
pub(crate) fn sweep(
    origin: Point,
    pointer: Point,
    limits: SizeLimits,
    base: Dimension,
    inc: Dimension,
) -> (Point, Dimension) {
    let step = |extent: i32, base: i32, inc: i32| {
        if inc > 1 && extent > base {
            extent - (extent - base) % inc
        } else {
            extent
        }
    };

    let width = limits.clamp_width(step((origin.x - pointer.x).abs(), base.width, inc.width));
    let height = limits.clamp_height(step((origin.y - pointer.y).abs(), base.height, inc.height));

    let x = if pointer.x < origin.x { origin.x - width } else { origin.x };
    let y = if pointer.y < origin.y { origin.y - height } else { origin.y };

    (Point::new(x, y), Dimension::new(width, height))
}

// ]]] === Corners ===
