//! Macros for error printing

/// Print a fatal message and exit
#[macro_export]
macro_rules! slwm_fatal {
    ($($err:tt)*) => ({
        use colored::Colorize;
        eprintln!("{}: {}", "[slwm fatal]".yellow().bold(), format!($($err)*));
        std::process::exit(1);
    })
}
