// Logging for devpanel
// Line-oriented logger behind the `log` facade, plus the bridge that lets
// the module registry and dispatcher report through it.
//
// Supports:
// - Text or JSON lines with YYYY-MM-DD HH:mm:ss timestamps
// - Console (stderr), file, or both, with independent levels
// - Record target carried in the JSON `detail` field
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Warn,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("devpanel.log")),
// };
// init_logger(config)?;
// log::info!("Panel started");
// ```

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{Level, LevelFilter};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::host::LogSink;

/// Target used for lines emitted on behalf of the module registry
pub const PANEL_TARGET: &str = "devpanel";

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file_path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn includes_console(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// JSON log line
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Warn,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.file_level {
            Some(file_level) if file_level > self.console_level => file_level,
            _ => self.console_level,
        }
    }
}

/// Logger installed by the binary
pub struct PanelLogger {
    config: LogConfig,
    file: Mutex<Option<File>>,
}

impl PanelLogger {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text_message(&self, level: Level, target: &str, message: &str) -> String {
        format!("{} [{}] {}: {}", Self::format_timestamp(), level.as_str(), target, message)
    }

    fn format_json_message(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.as_str().to_string(),
            message: message.to_string(),
            detail: Some(json!({ "target": target })),
        };

        serde_json::to_string(&entry)
            .context("Failed to serialize log entry to JSON")
    }

    fn format(&self, record: &log::Record) -> String {
        let message = record.args().to_string();
        let (level, target) = (record.level(), record.target());
        match self.config.format {
            LogFormat::Text => self.format_text_message(level, target, &message),
            LogFormat::Json => self.format_json_message(level, target, &message)
                .unwrap_or_else(|_| self.format_text_message(level, target, &message)),
        }
    }

    fn should_log_to_console(&self, level: Level) -> bool {
        self.config.destination.includes_console() && level <= self.config.console_level
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        match (self.config.destination.file_path(), self.config.file_level) {
            (Some(_), Some(file_level)) => level <= file_level,
            _ => false,
        }
    }

    fn write_to_console(&self, line: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", line)
            .context("Failed to write to console")
    }

    /// Append to the log file, opening it on first use
    fn write_to_file(&self, line: &str, path: &Path) -> Result<()> {
        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            *guard = Some(file);
        }
        match guard.as_mut() {
            Some(file) => writeln!(file, "{}", line).context("Failed to write to log file"),
            None => Ok(()),
        }
    }
}

impl log::Log for PanelLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.should_log_to_console(metadata.level()) || self.should_log_to_file(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format(record);
        let level = record.level();

        if self.should_log_to_console(level) {
            if let Err(e) = self.write_to_console(&line) {
                eprintln!("Console logging error: {}", e);
            }
        }

        if self.should_log_to_file(level) {
            if let Some(path) = self.config.destination.file_path() {
                if let Err(e) = self.write_to_file(&line, path) {
                    eprintln!("File logging error: {}", e);
                    // File-only destinations fall back to the console
                    if !self.config.destination.includes_console() {
                        let _ = self.write_to_console(&line);
                    }
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Install the panel logger as the global `log` backend
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();

    log::set_boxed_logger(Box::new(PanelLogger::new(config)))
        .context("Failed to set global logger")?;
    log::set_max_level(max_level);

    Ok(())
}

/// Route panics through the logger at error level once it is installed.
/// Until then, and when error logging is off, the default hook reports them.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if log::log_enabled!(target: PANEL_TARGET, Level::Error) {
            log::error!(target: PANEL_TARGET, "Panic: {}", panic_info);
        } else {
            default_hook(panic_info);
        }
    }));
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off", level_str)),
    }
}

/// Registry/dispatcher log sink forwarding to the `log` facade:
/// internal lines at debug, errors at error, both under [`PANEL_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeLogSink;

impl LogSink for FacadeLogSink {
    fn log_internal(&self, message: &str) {
        log::debug!(target: PANEL_TARGET, "{}", message);
    }

    fn log_error(&self, message: &str) {
        log::error!(target: PANEL_TARGET, "{}", message);
    }
}
