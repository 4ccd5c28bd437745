use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{Level, Log, Metadata, Record};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Where console output goes
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// `log` backend writing coloured lines to the console and, optionally,
/// plain lines to a file
pub struct Logger {
    pub console: Option<LogOutput>,
    pub severity: Level,
    pub file: Option<Mutex<File>>,
    pub enable_colors: bool,
}

impl Logger {
    /// Create a new logger; a file that cannot be opened is skipped
    pub fn new(
        file_path: Option<&Path>,
        severity: Level,
        console: Option<LogOutput>,
        enable_colors: bool,
    ) -> Self {
        let file = file_path.and_then(|path| {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
                .map(Mutex::new)
        });

        Logger {
            console,
            severity,
            file,
            enable_colors,
        }
    }

    /// RFC 3339 UTC timestamp
    fn timestamp() -> String {
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "-".to_string())
    }

    fn color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[36m",
            Level::Debug => "\x1b[35m",
            Level::Trace => "\x1b[37m",
        }
    }

    const RESET: &'static str = "\x1b[0m";

    fn line(&self, timestamp: &str, record: &Record, colored: bool) -> String {
        let level = record.level();
        if colored {
            format!(
                "{}[{timestamp}] {:<5}{} {}: {}\n",
                Self::color(level),
                level.as_str(),
                Self::RESET,
                record.target(),
                record.args()
            )
        } else {
            format!("[{timestamp}] {:<5} {}: {}\n", level.as_str(), record.target(), record.args())
        }
    }

    /// Install the logger, configured from the environment:
    /// `LOG_VIEWER_LOG` or `RUST_LOG` for the level, `LOG_VIEWER_LOG_FILE`
    /// for a file sink and `NO_COLOR` to disable colours.
    pub fn init() -> Result<(), log::SetLoggerError> {
        let severity = std::env::var("LOG_VIEWER_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::Info);
        let file_path = std::env::var_os("LOG_VIEWER_LOG_FILE").map(PathBuf::from);
        let enable_colors = std::env::var_os("NO_COLOR").is_none();

        let logger = Logger::new(file_path.as_deref(), severity, Some(LogOutput::Stderr), enable_colors);
        log::set_max_level(severity.to_level_filter());
        log::set_logger(Box::leak(Box::new(logger)))?;
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.severity
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Self::timestamp();

        if let Some(console) = &self.console {
            let message = self.line(&timestamp, record, self.enable_colors);
            let _ = match console {
                LogOutput::Stdout => std::io::stdout().write_all(message.as_bytes()),
                LogOutput::Stderr => std::io::stderr().write_all(message.as_bytes()),
            };
        }

        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                let _ = guard.write_all(self.line(&timestamp, record, false).as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                let _ = guard.flush();
            }
        }
    }
}
