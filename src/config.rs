//! Configuration options

use crate::{
    core::{Action, Pixel},
    error::Error,
    utils::deserialize_shellexpand,
    x::input::{KeyTable, ModMask},
};
use anyhow::{Context, Result};
use colored::Colorize;
use directories::BaseDirs;
use format_serde_error::SerdeError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use which::which;

/// Configuration file name
const CONFIG_FILE: &str = "slwm.yml";

/// Default configuration, written out on first start
const DEFAULT_CONFIG: &str = include_str!("../example/slwm.yml");

/// Default shell to run commands within
pub(crate) static SHELL: Lazy<PathBuf> = Lazy::new(|| {
    PathBuf::from(env::var("SLWM_SHELL").unwrap_or_else(|_| {
        env::var("SHELL").unwrap_or_else(|_| {
            if let Ok(bash) = which("bash") {
                bash.to_string_lossy().to_string()
            } else if let Ok(dash) = which("dash") {
                dash.to_string_lossy().to_string()
            } else {
                String::from("/bin/sh")
            }
        })
    }))
});

// =============== GlobalSettings ================= [[[

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GlobalSettings {
    /// Command run by the `spawn` action
    pub(crate) terminal: String,

    /// Size of the border around each window
    #[serde(alias = "border-width")]
    pub(crate) border_width: u32,

    /// Border color of the focused window
    pub(crate) fg: String,

    /// Border color of unfocused windows
    pub(crate) bg: String,

    /// Border color of the focused window when it is fixed
    pub(crate) fc: String,

    /// Enable virtual desktops
    pub(crate) vdesks: bool,

    /// Number of virtual desktops
    #[serde(alias = "num-desktops")]
    pub(crate) num_desktops: u32,

    /// Modifiers held for every key binding
    #[serde(alias = "grab-modifiers")]
    pub(crate) grab_modifiers: Vec<ModMask>,

    /// Extra modifier that switches moving to resizing (and closing to killing)
    #[serde(alias = "alt-modifier")]
    pub(crate) alt_modifier: ModMask,

    /// Modifiers held for mouse bindings on a window
    #[serde(alias = "mouse-modifier")]
    pub(crate) mouse_modifier: Vec<ModMask>,

    /// Whether logs should be written to a file
    #[serde(alias = "log-to-file")]
    pub(crate) log_to_file: bool,

    /// The directory to write the log to
    #[serde(alias = "log-dir", deserialize_with = "deserialize_shellexpand")]
    pub(crate) log_dir: Option<PathBuf>,
} // ]]] === Global Settings ===

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            terminal:       String::from("xterm"),
            border_width:   1,
            fg:             String::from("#daa520"),
            bg:             String::from("#7f7f7f"),
            fc:             String::from("#0000ff"),
            vdesks:         true,
            num_desktops:   8,
            grab_modifiers: vec![ModMask::Control, ModMask::Mod1],
            alt_modifier:   ModMask::Shift,
            mouse_modifier: vec![ModMask::Mod1],
            log_to_file:    false,
            log_dir:        None,
        }
    }
}

// ==================== Colors ==================== [[[

/// Border colors resolved to pixel values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Colors {
    /// Focused
    pub(crate) fg: Pixel,
    /// Unfocused
    pub(crate) bg: Pixel,
    /// Focused and fixed
    pub(crate) fc: Pixel,
}

/// Parse a `#rrggbb` color
pub(crate) fn parse_color(color: &str) -> Result<Pixel, Error> {
    color
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6)
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .ok_or_else(|| Error::InvalidColor(color.to_owned()))
}

// ]]] === Colors ===

// =================== Config ===================== [[[

/// Configuration file to parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Global settings
    #[serde(flatten)]
    pub(crate) global: GlobalSettings,

    /// Key names (as keysym names) mapped to what they do
    #[serde(default = "default_keys")]
    pub(crate) keys: IndexMap<String, Action>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: GlobalSettings::default(),
            keys:   default_keys(),
        }
    }
}

/// The evilwm key bindings
fn default_keys() -> IndexMap<String, Action> {
    let mut keys = IndexMap::new();
    for (name, action) in [
        ("Return", Action::Spawn),
        ("Tab", Action::Next),
        ("h", Action::MoveLeft),
        ("j", Action::MoveDown),
        ("k", Action::MoveUp),
        ("l", Action::MoveRight),
        ("y", Action::TopLeft),
        ("u", Action::TopRight),
        ("b", Action::BottomLeft),
        ("n", Action::BottomRight),
        ("Escape", Action::Kill),
        ("Insert", Action::Lower),
        ("KP_Insert", Action::Lower),
        ("x", Action::Maximise),
        ("equal", Action::MaximiseVert),
        ("f", Action::Fix),
        ("Left", Action::PrevDesktop),
        ("Right", Action::NextDesktop),
        ("a", Action::ToggleDesktop),
        ("d", Action::DockToggle),
    ] {
        keys.insert(name.to_owned(), action);
    }

    for desk in 0..8 {
        keys.insert((desk + 1).to_string(), Action::Desktop(desk));
    }

    keys
}

impl Config {
    /// Create the default configuration file
    pub(crate) fn create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("Creating configuration path: {}", path.display());
            fs::create_dir_all(path).context("unable to create configuration directory")?;
        }

        let path = path.join(CONFIG_FILE);
        log::debug!("{}: {}", "Configuration path".bright_blue(), path.display());

        if !path.is_file() {
            let mut config_file: fs::File = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .open(&path)
                .with_context(|| format!("could not create slwm config: '{}'", path.display()))?;

            config_file
                .write_all(DEFAULT_CONFIG.as_bytes())
                .with_context(|| format!("could not create slwm config: '{}'", path.display()))?;
            config_file.flush()?;
        }

        Self::load(path)
    }

    /// Load the configuration file from a given path
    pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::read_to_string(path.as_ref()).context("failed to read config file")?;
        Self::parse(file)
    }

    /// Parse a configuration from its text
    pub(crate) fn parse(file: String) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(&file).map_err(|e| SerdeError::new(file, e))?;

        if config.global.num_desktops == 0 {
            log::warn!("`num_desktops` must be at least 1");
            config.global.num_desktops = 1;
        }

        Ok(config)
    }

    /// Load the default configuration file
    pub(crate) fn load_default() -> Result<Self> {
        let dirs = PROJECT_DIRS
            .as_ref()
            .context("could not detect user home directory to place program files")?;
        let path = dirs.config_dir();
        log::debug!("loading default config: {}", path.display());

        Self::create_default(path)
    }

    /// Border colors as pixel values
    pub(crate) fn colors(&self) -> Result<Colors> {
        Ok(Colors {
            fg: parse_color(&self.global.fg)?,
            bg: parse_color(&self.global.bg)?,
            fc: parse_color(&self.global.fc)?,
        })
    }

    /// Resolve the key names to keysyms
    pub(crate) fn key_table(&self) -> Result<KeyTable> {
        KeyTable::from_names(&self.keys).context("invalid key binding")
    }

    /// Protocol modifier mask held for key bindings
    pub(crate) fn grab_mask(&self) -> u16 {
        ModMask::combine(&self.global.grab_modifiers)
    }

    /// Protocol modifier mask held for mouse bindings
    pub(crate) fn mouse_mask(&self) -> u16 {
        ModMask::combine(&self.global.mouse_modifier)
    }
} // ]]] === Config ===

// ================ Project Dirs ================== [[[

/// Get the base [`SlwmDirs`]
pub(crate) static PROJECT_DIRS: Lazy<Option<SlwmDirs>> = Lazy::new(SlwmDirs::new);

/// Get the project directories relevant to [`slwm`]
#[derive(Debug, Clone)]
pub(crate) struct SlwmDirs {
    /// User's `$XDG_CONFIG_HOME/slwm` directory
    config_dir: PathBuf,
}

impl SlwmDirs {
    /// Create a new [`SlwmDirs`]
    fn new() -> Option<Self> {
        log::trace!("determining project default folders");
        Some(Self {
            config_dir: Self::get_dir("SLWM_CONFIG_DIR", "XDG_CONFIG_HOME", ".config")?,
        })
    }

    /// Wrapper function that makes it easier to get directories
    fn get_dir(env_var: &str, var: &str, join: &str) -> Option<PathBuf> {
        let fallback = || {
            BaseDirs::new()
                .map(|p| p.home_dir().join(join))
                .map(|p| p.join(env!("CARGO_PKG_NAME")))
        };

        env::var_os(env_var).map(PathBuf::from).map_or_else(
            || {
                env::var_os(var)
                    .map(PathBuf::from)
                    .filter(|p| p.is_absolute())
                    .map(|p| p.join(env!("CARGO_PKG_NAME")))
                    .or_else(fallback)
            },
            // Custom env var is set
            |v| if v.is_absolute() { Some(v) } else { fallback() },
        )
    }

    /// Get configuration directory
    #[must_use]
    pub(crate) fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

// ]]] === Project Dirs ===
