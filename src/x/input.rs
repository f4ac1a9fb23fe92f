//! Input into the window manager

use crate::{
    core::{Action, Keycode, Keysym},
    error::Error,
};
use indexmap::IndexMap;
use maplit::hashmap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use x11rb::protocol::xproto::ModMask as XModMask;

// ============================== ModMask =============================
// ====================================================================

/// Keycode modifier that is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ModMask {
    /// Left or right `shift` key
    Shift,
    /// Caps-lock
    Lock,
    /// Left or right `control` key
    #[serde(alias = "ctrl")]
    Control,
    /// Modifier 1 as defined in `xmodmap` (usually `alt`)
    #[serde(alias = "alt")]
    Mod1,
    /// Modifier 2 as defined in `xmodmap` (usually `num-lock`)
    Mod2,
    /// Modifier 3 as defined in `xmodmap` (usually blank)
    Mod3,
    /// Modifier 4 as defined in `xmodmap` (usually `super`)
    #[serde(alias = "super")]
    Mod4,
    /// Modifier 5 as defined or in `xmodmap` (usually `mode_shift`)
    Mod5,
}

impl ModMask {
    /// Was this modifier held in the given event state
    pub(crate) fn was_held(self, mask: u16) -> bool {
        mask & u16::from(self) > 0
    }

    /// Combine several modifiers into a protocol mask
    pub(crate) fn combine(mods: &[Self]) -> u16 {
        mods.iter().fold(0, |acc, &m| acc | u16::from(m))
    }
}

impl From<ModMask> for u16 {
    fn from(m: ModMask) -> Self {
        u16::from(match m {
            ModMask::Shift => XModMask::SHIFT,
            ModMask::Lock => XModMask::LOCK,
            ModMask::Control => XModMask::CONTROL,
            ModMask::Mod1 => XModMask::M1,
            ModMask::Mod2 => XModMask::M2,
            ModMask::Mod3 => XModMask::M3,
            ModMask::Mod4 => XModMask::M4,
            ModMask::Mod5 => XModMask::M5,
        })
    }
}

impl fmt::Display for ModMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Modifier combinations that should not change the meaning of a binding
/// (caps-lock and num-lock)
pub(crate) fn lock_variants(mask: u16) -> [u16; 4] {
    let lock = u16::from(ModMask::Lock);
    let num = u16::from(ModMask::Mod2);
    [mask, mask | lock, mask | num, mask | lock | num]
}

// ============================== Button ==============================
// ====================================================================

/// Mouse buttons that do something on a client frame
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Button {
    /// 1, Left-click: move
    #[serde(rename = "mouse1", alias = "button1")]
    Left,
    /// 2, Middle-click: resize
    #[serde(rename = "mouse2", alias = "button2")]
    Middle,
    /// 3, Right-click: lower
    #[serde(rename = "mouse3", alias = "button3")]
    Right,
}

impl Button {
    /// Convert the `detail` of a button event
    pub(crate) const fn from_detail(detail: u8) -> Option<Self> {
        match detail {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            _ => None,
        }
    }
}

// ============================== Keysyms =============================
// ====================================================================

/// Keysym values for the non-printable keys that can be bound by name
static NAMED_KEYSYMS: Lazy<HashMap<&'static str, Keysym>> = Lazy::new(|| {
    hashmap! {
        "BackSpace" => 0xff08,
        "Tab" => 0xff09,
        "Return" => 0xff0d,
        "Pause" => 0xff13,
        "Escape" => 0xff1b,
        "Delete" => 0xffff,
        "Home" => 0xff50,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "Page_Up" => 0xff55,
        "Page_Down" => 0xff56,
        "End" => 0xff57,
        "Print" => 0xff61,
        "Insert" => 0xff63,
        "Menu" => 0xff67,
        "KP_Enter" => 0xff8d,
        "KP_Insert" => 0xff9e,
        "KP_Delete" => 0xff9f,
        "space" => 0x0020,
        "apostrophe" => 0x0027,
        "comma" => 0x002c,
        "minus" => 0x002d,
        "period" => 0x002e,
        "slash" => 0x002f,
        "semicolon" => 0x003b,
        "equal" => 0x003d,
        "bracketleft" => 0x005b,
        "backslash" => 0x005c,
        "bracketright" => 0x005d,
        "grave" => 0x0060,
    }
});

/// Resolve a keysym name like `Return`, `equal`, `F3` or `x`
pub(crate) fn keysym_from_name(name: &str) -> Result<Keysym, Error> {
    if let Some(sym) = NAMED_KEYSYMS.get(name) {
        return Ok(*sym);
    }

    // Function keys are contiguous from F1 = 0xffbe
    if let Some(num) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=35).contains(&num) {
            return Ok(0xffbe + num - 1);
        }
    }

    // Printable Latin-1 characters are their own keysym
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_graphic() {
            return Ok(u32::from(ch.to_ascii_lowercase()));
        }
    }

    Err(Error::UnknownKeysym(name.to_owned()))
}

/// Name of a keysym for display, as accepted by [`keysym_from_name`]
pub(crate) fn keysym_name(sym: Keysym) -> String {
    if let Some((name, _)) = NAMED_KEYSYMS.iter().find(|(_, s)| **s == sym) {
        return (*name).to_owned();
    }

    if (0xffbe..0xffbe + 35).contains(&sym) {
        return format!("F{}", sym - 0xffbe + 1);
    }

    char::from_u32(sym)
        .filter(char::is_ascii_graphic)
        .map_or_else(|| format!("{:#x}", sym), String::from)
}

// ========================= KeyboardMapping ==========================
// ====================================================================

/// A copy of the server's keycode to keysym table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct KeyboardMapping {
    /// First keycode described by `keysyms`
    pub(crate) min_keycode:         Keycode,
    /// Number of keysyms listed per keycode
    pub(crate) keysyms_per_keycode: u8,
    /// Flattened table of keysyms
    pub(crate) keysyms:             Vec<Keysym>,
}

impl KeyboardMapping {
    /// The unshifted keysym of a keycode, `0` if there is none
    pub(crate) fn keysym(&self, code: Keycode) -> Keysym {
        let per = usize::from(self.keysyms_per_keycode);
        code.checked_sub(self.min_keycode)
            .and_then(|idx| self.keysyms.get(usize::from(idx) * per))
            .copied()
            .unwrap_or(0)
    }

    /// Every keycode that produces `sym` in any column
    pub(crate) fn keycodes(&self, sym: Keysym) -> Vec<Keycode> {
        let per = usize::from(self.keysyms_per_keycode).max(1);
        self.keysyms
            .chunks(per)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&sym))
            .filter_map(|(idx, _)| Keycode::try_from(idx + usize::from(self.min_keycode)).ok())
            .collect()
    }
}

// ============================= KeyTable =============================
// ====================================================================

/// Key bindings resolved to keysyms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct KeyTable {
    /// Bindings in the order they were configured
    bindings: IndexMap<Keysym, Action>,
}

impl KeyTable {
    /// Resolve configured key names
    pub(crate) fn from_names(keys: &IndexMap<String, Action>) -> Result<Self, Error> {
        let bindings = keys
            .iter()
            .map(|(name, action)| keysym_from_name(name).map(|sym| (sym, *action)))
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Ok(Self { bindings })
    }

    /// Action bound to a keysym
    pub(crate) fn lookup(&self, sym: Keysym) -> Option<Action> {
        self.bindings.get(&sym).copied()
    }

    /// Every bound keysym
    pub(crate) fn keysyms(&self) -> impl Iterator<Item = Keysym> + '_ {
        self.bindings.keys().copied()
    }

    /// Iterate over the bindings
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Keysym, Action)> + '_ {
        self.bindings.iter().map(|(s, a)| (*s, *a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn resolve_names() {
        assert_eq!(keysym_from_name("Return").unwrap(), 0xff0d);
        assert_eq!(keysym_from_name("x").unwrap(), 0x78);
        assert_eq!(keysym_from_name("X").unwrap(), 0x78);
        assert_eq!(keysym_from_name("1").unwrap(), 0x31);
        assert_eq!(keysym_from_name("F1").unwrap(), 0xffbe);
        assert_eq!(keysym_from_name("F12").unwrap(), 0xffc9);
        assert!(keysym_from_name("NotAKey").is_err());

        assert_eq!(keysym_name(0xff09), "Tab");
        assert_eq!(keysym_name(0x6a), "j");
        assert_eq!(keysym_name(0xffbf), "F2");
    }

    #[test]
    fn mapping_lookup() {
        let mapping = KeyboardMapping {
            min_keycode:         8,
            keysyms_per_keycode: 2,
            keysyms:             vec![0x61, 0x41, 0xff09, 0, 0x62, 0x42],
        };

        assert_eq!(mapping.keysym(8), 0x61);
        assert_eq!(mapping.keysym(9), 0xff09);
        assert_eq!(mapping.keysym(7), 0);
        assert_eq!(mapping.keysym(200), 0);
        assert_eq!(mapping.keycodes(0x42), vec![10]);
        assert!(mapping.keycodes(0x63).is_empty());
    }

    #[test]
    fn key_table() {
        let table = KeyTable::from_names(&indexmap! {
            String::from("Tab") => Action::Next,
            String::from("h") => Action::MoveLeft,
        })
        .unwrap();

        assert_eq!(table.lookup(0xff09), Some(Action::Next));
        assert_eq!(table.lookup(0x68), Some(Action::MoveLeft));
        assert_eq!(table.lookup(0x69), None);
        assert_eq!(table.keysyms().count(), 2);

        let bad = KeyTable::from_names(&indexmap! { String::from("Hyper_Q") => Action::Kill });
        assert!(bad.is_err());
    }

    #[test]
    fn modifiers() {
        assert_eq!(ModMask::combine(&[ModMask::Control, ModMask::Mod1]), 4 | 8);
        assert!(ModMask::Shift.was_held(1));
        assert!(!ModMask::Shift.was_held(4));
        assert_eq!(lock_variants(4), [4, 6, 20, 22]);
    }
}
