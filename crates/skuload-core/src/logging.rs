//! Logging: console through indicatif, plus an append-only run log file

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use indicatif::MultiProgress;
use log::{LevelFilter, Log};

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// One line of the run log: `<local time> - <LEVEL> - <message>`
pub fn format_file_line(
    timestamp: &chrono::DateTime<chrono::Local>,
    level: log::Level,
    message: &std::fmt::Arguments<'_>,
) -> String {
    format!(
        "{} - {} - {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level.as_str(),
        message
    )
}

/// Run log writer: `env_logger` piped into `path` opened for append.
///
/// Has its own level, independent of `RUST_LOG` and the console filter.
fn file_logger(path: &Path, level: LevelFilter) -> io::Result<env_logger::Logger> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(env_logger::Builder::new()
        .filter_level(level)
        .write_style(env_logger::WriteStyle::Never)
        .format(|buf, record| {
            let line = format_file_line(&chrono::Local::now(), record.level(), record.args());
            writeln!(buf, "{line}")
        })
        .target(env_logger::Target::Pipe(Box::new(file)))
        .build())
}

/// Logger fanning out to the console (through indicatif in TTY mode) and the run log.
pub struct PipelineLogger {
    console: env_logger::Logger,
    multi: Option<MultiProgress>,
    file: Option<env_logger::Logger>,
}

impl PipelineLogger {
    fn max_level(&self) -> LevelFilter {
        let file_level = self.file.as_ref().map_or(LevelFilter::Off, |f| f.filter());
        self.console.filter().max(file_level)
    }
}

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.console.enabled(metadata) || self.file.as_ref().is_some_and(|f| f.enabled(metadata))
    }

    fn log(&self, record: &log::Record) {
        if self.console.enabled(record.metadata()) {
            match &self.multi {
                Some(multi) => {
                    let (pre, label, post) = level_style(record.level(), true);
                    let line = format!("[{pre}{label}{post}] {}", record.args());
                    multi.suspend(|| eprintln!("{line}"));
                }
                None => self.console.log(record),
            }
        }
        if let Some(file) = &self.file {
            file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}

/// Initialize logging.
///
/// Console: `RUST_LOG` or `info` (`warn` when `quiet`, `debug` when `debug`),
/// routed through `multi` when progress bars are active.
/// File: every record at `info` (`debug` when `debug`) appended to `log_file`.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
    log_file: Option<&Path>,
) -> io::Result<()> {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let console = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format(|buf, record| {
        // Non-TTY: no ANSI colors
        let (_, label, _) = level_style(record.level(), false);
        writeln!(buf, "[{label}] {}", record.args())
    })
    .build();

    let file_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let file = log_file
        .map(|path| file_logger(path, file_level))
        .transpose()?;

    let logger = PipelineLogger {
        console,
        multi: multi.cloned(),
        file,
    };
    let max_level = logger.max_level();

    log::set_boxed_logger(Box::new(logger)).expect("failed to init logger");
    log::set_max_level(max_level);
    Ok(())
}
