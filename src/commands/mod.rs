use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use serde::Serialize;

pub mod calendar;
pub mod config;
pub mod exercise;
pub mod log;
pub mod profile;
pub mod program;
pub mod readiness;
pub mod status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFmt {
    Text,
    Json,
}

impl OutputFmt {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Prints `value` as JSON, or runs `text` for the human-readable rendering.
pub fn emit<T: Serialize>(fmt: OutputFmt, value: &T, text: impl FnOnce()) {
    match fmt {
        OutputFmt::Text => text(),
        OutputFmt::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} could not serialize output: {}", "error:".red().bold(), e),
        },
    }
}

/// `YYYY-MM-DD`, or today when absent.
pub fn date_or_today(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date `{}` (expected YYYY-MM-DD)", raw)),
        None => Ok(Local::now().date_naive()),
    }
}

/// Printable width of a string that may contain ANSI color codes.
pub fn plain_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut count = 0;
    while i < bytes.len() {
        if bytes[i] == 0x1B {
            // Skip \x1b[... m
            while i < bytes.len() && bytes[i] != b'm' {
                i += 1;
            }
            i += 1;
        } else {
            count += 1;
            i += 1;
        }
    }
    count
}
