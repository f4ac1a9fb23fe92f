//! Various helper-utilities

use crate::{
    cli::Opts,
    config::{Config, SHELL},
};
use anyhow::{Context, Result};
use clap::crate_name;
use flexi_logger::{
    style,
    AdaptiveFormat,
    Age,
    Cleanup,
    Criterion,
    DeferredNow,
    Duplicate,
    FileSpec,
    Level,
    Logger,
    LoggerHandle,
    Naming,
    Record,
    WriteMode,
};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use serde::{de, Deserialize};
use std::{
    env,
    io::{self, Write},
    panic,
    path::PathBuf,
    process::{Command, Stdio},
    sync::atomic::{AtomicBool, Ordering},
};

/// Set once a terminating signal arrives
static EXIT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Shorter way of testing if the user wants color for the output of `--help`
pub(crate) fn wants_color() -> bool {
    env::var_os("NO_COLOR").is_none()
}

// ============================= Logging ============================== [[[

/// Initializes logging for this crate
pub(crate) fn initialize_logging(config: &Config, args: &Opts) -> Result<LoggerHandle> {
    /// Customize the format of the log (colored)
    fn colored_format(
        w: &mut dyn Write,
        _now: &mut DeferredNow,
        record: &Record,
    ) -> Result<(), io::Error> {
        let level = record.level();
        write!(
            w,
            "{:<5} [{}:{}]: {}",
            style(level, level),
            style(Level::Trace, record.file().unwrap_or("<unnamed>")),
            record.line().unwrap_or(0),
            &record.args()
        )
    }

    /// Customize the format of the log (uncolored)
    fn uncolored_format(
        w: &mut dyn Write,
        now: &mut DeferredNow,
        record: &Record,
    ) -> Result<(), io::Error> {
        // Strip the ansi sequences put in log messages with `colored`
        write!(
            w,
            "[{:>}] {:<5} [{}:{}]: {}",
            now.now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.file().unwrap_or("<unnamed>"),
            record.line().unwrap_or(0),
            String::from_utf8(strip_ansi_escapes::strip(
                &record.args().to_string().as_bytes()
            )?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        )
    }

    // Python-like backtraces make it easier to see which request to the
    // X-Server went wrong
    if cfg!(debug_assertions) {
        better_panic::install();
        panic::set_hook(Box::new(|panic_info| {
            better_panic::Settings::auto().create_panic_handler()(panic_info);
        }));
    }

    let log_dir = config
        .global
        .log_dir
        .clone()
        .unwrap_or_else(|| env::temp_dir().join(crate_name!()));

    let mut logger = Logger::try_with_str(env::var("SLWM_LOG").unwrap_or_else(
        |_| match args.verbose {
            0 => String::from("info"),
            1 => String::from("debug"),
            _ => String::from("trace"),
        },
    ))?
    .write_mode(WriteMode::BufferAndFlush)
    .adaptive_format_for_stderr(AdaptiveFormat::Custom(uncolored_format, colored_format))
    .set_palette(String::from("9;11;14;5;13"));

    if config.global.log_to_file {
        logger = logger
            .duplicate_to_stderr(Duplicate::All)
            .rotate(
                Criterion::AgeOrSize(Age::Day, 50_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(2),
            )
            .log_to_file(
                FileSpec::default()
                    .basename(crate_name!())
                    .directory(&log_dir),
            )
            .format_for_files(uncolored_format);
    }

    logger.start().context("failed to start the logger")
}

// ]]] === Logging ===

/// [`Deserialize`] something that has a shell variable
#[allow(single_use_lifetimes)]
pub(crate) fn deserialize_shellexpand<'de, D>(d: D) -> Result<Option<PathBuf>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value = match Option::<PathBuf>::deserialize(d)? {
        Some(value) => value,
        None => return Ok(None),
    };

    let value = PathBuf::from(
        shellexpand::full(&value.to_string_lossy())
            .map_err(|e| {
                de::Error::invalid_value(
                    de::Unexpected::Str(value.to_string_lossy().as_ref()),
                    &e.to_string().as_str(),
                )
            })?
            .to_string(),
    );

    Ok(Some(value))
}

/// Run `command` with the user's shell, detached from the window manager
pub(crate) fn spawn(command: &str) {
    log::debug!("spawning `{}` with {}", command, SHELL.display());

    if let Err(e) = Command::new(SHELL.as_path())
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .spawn()
    {
        log::error!("failed to spawn `{}`: {}", command, e);
    }
}

// ============================= Signals ============================== [[[

extern "C" fn on_exit_signal(_: nix::libc::c_int) {
    request_exit();
}

/// Exit on `SIGTERM`, `SIGINT` and `SIGHUP`. Children are reaped by the kernel
#[allow(unsafe_code)]
pub(crate) fn install_signal_handlers() -> Result<()> {
    let exit = SigAction::new(
        SigHandler::Handler(on_exit_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    // SAFETY: the handler only stores to an atomic
    unsafe {
        for sig in [Signal::SIGTERM, Signal::SIGINT, Signal::SIGHUP] {
            signal::sigaction(sig, &exit)
                .with_context(|| format!("failed to install a handler for {}", sig))?;
        }
        signal::sigaction(Signal::SIGCHLD, &ignore).context("failed to ignore SIGCHLD")?;
    }

    Ok(())
}

/// Has a terminating signal arrived
pub(crate) fn exit_requested() -> bool {
    EXIT_REQUESTED.load(Ordering::SeqCst)
}

/// Make the main loop stop at the top of its next iteration
pub(crate) fn request_exit() {
    EXIT_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(test)]
pub(crate) fn clear_exit_request() {
    EXIT_REQUESTED.store(false, Ordering::SeqCst);
}

// ]]] === Signals ===
