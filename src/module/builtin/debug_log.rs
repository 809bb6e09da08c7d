//! Debug Log Module
//!
//! Read and truncate the host's debug log file from the panel.

use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use anyhow::Context;
use serde_json::{json, Value};
use crate::command::Command;
use crate::module::base::ModuleBehavior;
use crate::module::config::ModuleConfig;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::traits::ModuleInfo;

pub const NAME: &str = "debug_log";

const DEFAULT_LOG_PATH: &str = "debug.log";
const DEFAULT_MAX_LINES: u64 = 100;
const MAX_LINES_LIMIT: u64 = 10_000;

#[derive(Debug, Default)]
pub struct DebugLogModule;

impl DebugLogModule {
    pub fn new() -> Self {
        Self
    }
}

/// Last `count` lines of the file and the total line count; a missing file
/// reads as empty. Bytes that are not UTF-8 are replaced, not rejected.
fn tail(path: &Path, count: usize) -> anyhow::Result<(Vec<String>, usize)> {
    if !path.exists() {
        return Ok((Vec::new(), 0));
    }
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open debug log: {}", path.display()))?;

    let mut kept = VecDeque::with_capacity(count);
    let mut total = 0;
    for raw in BufReader::new(file).split(b'\n') {
        let mut raw = raw.with_context(|| format!("Failed to read debug log: {}", path.display()))?;
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        total += 1;
        if count == 0 {
            continue;
        }
        if kept.len() == count {
            kept.pop_front();
        }
        kept.push_back(String::from_utf8_lossy(&raw).into_owned());
    }
    Ok((kept.into(), total))
}

impl ModuleBehavior for DebugLogModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new(NAME, "Debug Log")
            .with_description("Tail and clear the debug log")
            .with_capability("manage_options")
    }

    fn default_config(&self) -> ModuleConfig {
        ModuleConfig::new()
            .with("log_path", json!(DEFAULT_LOG_PATH))
            .with("max_lines", json!(DEFAULT_MAX_LINES))
    }

    fn validate_module_config(&self, config: &ModuleConfig) -> ModuleResult<()> {
        match config.get_str("log_path") {
            Some(path) if !path.trim().is_empty() => {}
            _ => return Err(ModuleError::invalid_config("log_path must be a non-empty string")),
        }
        match config.get_u64("max_lines") {
            Some(n) if (1..=MAX_LINES_LIMIT).contains(&n) => Ok(()),
            _ => Err(ModuleError::invalid_config(format!(
                "max_lines must be between 1 and {}", MAX_LINES_LIMIT
            ))),
        }
    }

    fn commands(&self, config: &ModuleConfig) -> Vec<Command> {
        let path = PathBuf::from(config.get_str("log_path").unwrap_or(DEFAULT_LOG_PATH));
        let max_lines = config.get_u64("max_lines").unwrap_or(DEFAULT_MAX_LINES);
        let clear_path = path.clone();

        vec![
            Command::new("debug_log_tail", move |payload: &Value| {
                let requested = payload.get("lines").and_then(Value::as_u64).unwrap_or(max_lines);
                let count = requested.clamp(1, max_lines) as usize;
                let (lines, total) = tail(&path, count)?;
                Ok(json!({
                    "path": path.display().to_string(),
                    "exists": path.exists(),
                    "total": total,
                    "lines": lines,
                }))
            })
            .with_description("Last lines of the debug log"),
            Command::new("debug_log_clear", move |_payload: &Value| {
                if clear_path.exists() {
                    fs::write(&clear_path, "")
                        .with_context(|| format!("Failed to clear debug log: {}", clear_path.display()))?;
                }
                Ok(json!({ "cleared": true, "path": clear_path.display().to_string() }))
            })
            .with_description("Truncate the debug log"),
        ]
    }
}
