//! Terminal setup: just logging. Unlike the GUI-adjacent tooling this is
//! adapted from, there's no progress bar or playback UI to coordinate log
//! output around here.

use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Initializes the global logger. `verbosity` is the number of times `-v`
/// was passed: 0 shows info and above, 1 shows debug, 2+ shows trace.
pub fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}
