// src/logger.rs
// Colored progress reporting for case execution

use chrono::{DateTime, Local};
use colored::*;
use std::fmt;

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Case,
    Pass,
    Fail,
    Warn,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Case => write!(f, "{}", " CASE ".on_blue().bold().white()),
            LogLevel::Pass => write!(f, "{}", " PASS ".on_green().bold().white()),
            LogLevel::Fail => write!(f, "{}", " FAIL ".on_red().bold().white()),
            LogLevel::Warn => write!(f, "{}", " WARN ".on_yellow().bold().black()),
        }
    }
}

/// Human-facing progress output while a case runs; diagnostics go through the
/// `log` facade instead.
pub struct Reporter {
    pub enable_timestamps: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            enable_timestamps: true,
        }
    }

    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.enable_timestamps = enable;
        self
    }

    fn format_timestamp(&self) -> String {
        if self.enable_timestamps {
            let now: DateTime<Local> = Local::now();
            format!("{} ", now.format("%Y-%m-%d %H:%M:%S").to_string().dimmed())
        } else {
            String::new()
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let timestamp = self.format_timestamp();
        println!("{}{} {}", timestamp, level, message);
    }

    pub fn case_start(&self, case_id: &str) {
        self.log(LogLevel::Case, &format!("{} starting", case_id.bold()));
    }

    pub fn step(&self, case_id: &str, description: &str) {
        self.log(
            LogLevel::Case,
            &format!("{} {}", case_id.bold(), description.cyan()),
        );
    }

    pub fn case_passed(&self, case_id: &str, steps: usize) {
        self.log(
            LogLevel::Pass,
            &format!("{} ({} step(s))", case_id.bold(), steps),
        );
    }

    pub fn case_failed(&self, case_id: &str, failures: &[String]) {
        self.log(
            LogLevel::Fail,
            &format!("{} ({} failed check(s))", case_id.bold(), failures.len()),
        );

        if atty::is(atty::Stream::Stdout) {
            let mut message = format!("{} {}", case_id.bold(), "failed".red().bold());
            for failure in failures {
                message += &format!("\n{} {}", "-".red(), failure);
            }
            self.print_boxed(&message);
        } else {
            for failure in failures {
                println!("  - {}", failure);
            }
        }
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn print_boxed(&self, message: &str) {
        let lines: Vec<&str> = message.lines().collect();
        if lines.is_empty() {
            return;
        }

        let max_width = lines
            .iter()
            .map(|line| strip_ansi_codes(line).len())
            .max()
            .unwrap_or(0);
        let box_width = max_width + 4;

        println!("┌{}┐", "─".repeat(box_width));
        for line in lines {
            let stripped_len = strip_ansi_codes(line).len();
            println!("│  {}{}  │", line, " ".repeat(max_width - stripped_len));
        }
        println!("└{}┘", "─".repeat(box_width));
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

// Helper function to strip ANSI color codes for width calculation
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                in_escape = true;
                continue;
            }
        }

        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
            continue;
        }

        result.push(ch);
    }

    result
}

// Global reporter instance
use std::sync::OnceLock;
static GLOBAL_REPORTER: OnceLock<Reporter> = OnceLock::new();

pub fn init_reporter(enable_timestamps: bool) {
    let _ = GLOBAL_REPORTER.set(Reporter::new().with_timestamps(enable_timestamps));
}

pub fn reporter() -> &'static Reporter {
    GLOBAL_REPORTER.get().unwrap_or(&DEFAULT_REPORTER)
}

static DEFAULT_REPORTER: Reporter = Reporter {
    enable_timestamps: true,
};
