//! The command line arguments

use crate::utils::wants_color;
use clap::{crate_description, crate_version, AppSettings, Parser, ValueHint};
use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Options for the [`slwm`] program
#[derive(Parser, Default, Clone, Debug, PartialEq)]
#[clap(
    version = crate_version!(),
    about = <String as AsRef<str>>::as_ref(&APP_ABOUT),
    after_help =  <String as AsRef<str>>::as_ref(&AFTER_HELP),
    override_usage =  <String as AsRef<str>>::as_ref(&OVERRIDE_HELP),
    max_term_width = 100,
    color = clap::ColorChoice::Auto,
    global_setting = AppSettings::DeriveDisplayOrder,
    disable_help_subcommand = true,
)]
pub(crate) struct Opts {
    /// Display debugging messages on various levels
    #[clap(
        long,
        short,
        parse(from_occurrences),
        long_help = "\
        Set the verbosity level of the program. There are 2 extra levels after the default (INFO). \
                     If `-v` is used, DEBUG messages are displayed, and if `-vv` is used TRACE \
                     messages are displayed. The verbosity can also be set with the `SLWM_LOG` \
                     environment variable"
    )]
    pub(crate) verbose: u8,

    /// Location of configuration file
    #[clap(
        long,
        short,
        takes_value = true,
        number_of_values = 1,
        value_name = "file",
        value_hint = ValueHint::FilePath,
        long_help = "\
        Specify the location of the configuration file. The default location is \
                `$XDG_CONFIG_HOME/slwm/slwm.yml`, which is created on first start"
    )]
    pub(crate) config: Option<PathBuf>,

    /// X display to manage
    #[clap(
        long,
        short = 'D',
        takes_value = true,
        value_name = "name",
        env = "DISPLAY",
        long_help = "Connect to this display instead of the one named by `$DISPLAY`"
    )]
    pub(crate) display: Option<String>,

    /// Print the key bindings and exit
    #[clap(
        long = "dump-keys",
        takes_value = false,
        long_help = "Print every key binding after the configuration has been read, then exit"
    )]
    pub(crate) dump_keys: bool,
}

// =============== Prettify Help ==================

/// Yellow ansi code
const YELLOW: &str = "\x1b[0;33m";
/// Green ansi code
const GREEN: &str = "\x1b[0;32m";
/// Bold-red ansi code
const BRED: &str = "\x1b[01;38;5;1m";
/// Reset colors
const RES: &str = "\x1b[0m";

/// Colored options used in the output of `--help`
pub(crate) static APP_ABOUT: Lazy<String> = Lazy::new(|| {
    wants_color()
        .then(|| {
            format!(
                "{}DESCRIPTION: {}{}{}",
                YELLOW,
                GREEN,
                crate_description!(),
                RES
            )
        })
        .unwrap_or_else(|| crate_description!().to_owned())
});

/// Colorized message to override the generated help message
pub(crate) static OVERRIDE_HELP: Lazy<String> = Lazy::new(|| {
    wants_color()
        .then(|| format!("{}slwm{} [{}OPTIONS{}]", BRED, RES, GREEN, RES))
        .unwrap_or_else(|| String::from("slwm [OPTIONS]"))
});

/// Colorized message displayed after the help message
pub(crate) static AFTER_HELP: Lazy<String> = Lazy::new(|| {
    wants_color()
        .then(|| {
            format!(
                "See {}slwm{} {}--help{} for longer explanations of some options.",
                BRED, RES, GREEN, RES
            )
        })
        .unwrap_or_else(|| {
            String::from("See slwm --help for longer explanations of some options.")
        })
});

#[cfg(test)]
mod tests {
    use super::Opts;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn parse_flags() {
        let opts = Opts::try_parse_from(&["slwm", "-vv", "-c", "/tmp/slwm.yml", "-D", ":1"]).unwrap();

        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.config, Some(PathBuf::from("/tmp/slwm.yml")));
        assert_eq!(opts.display.as_deref(), Some(":1"));
        assert!(!opts.dump_keys);

        let opts = Opts::try_parse_from(&["slwm", "--dump-keys"]).unwrap();
        assert!(opts.dump_keys);
    }
}
