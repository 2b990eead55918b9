//! Bump-allocating combat logger
//!
//! 100% safe Rust. Formatting goes through a reusable bump-allocated
//! scratch buffer and is skipped entirely when the entry would be dropped.
//! Captured entries own their strings and are read back through a guard.

use bumpalo::collections::String as BumpString;
use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt::{self, Write as FmtWrite};
use std::ops::Deref;

/// Log at Verbose level, compiled out without the `verbose-logging` feature
///
/// Avoids building format arguments for per-event detail (every assignment,
/// every applied damage) in builds that never print them.
macro_rules! log_if_verbose {
    ($logger:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $logger.log_fmt(
                $crate::game::VerbosityLevel::Verbose,
                None,
                format_args!($($arg)*),
            );
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$logger;
        }
    };
}
pub(crate) use log_if_verbose;

/// Verbosity level for combat output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Nothing is printed or captured
    Silent = 0,
    /// Warnings and final results
    Minimal = 1,
    /// Steps, deaths and exceptions (default)
    #[default]
    Normal = 2,
    /// Every assignment and applied damage event
    Verbose = 3,
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Machine-readable JSON output (one object per line)
    Json,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Output only to stdout (default)
    #[default]
    Stdout,
    /// Capture only to in-memory buffer (no stdout)
    Memory,
    /// Both stdout and in-memory buffer
    Both,
}

/// A log entry with owned strings (no lifetime parameters)
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// Optional category (e.g. "oracle", "lethality")
    pub category: Option<String>,
}

/// Guard type that provides read-only access to log entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl<'a> LogGuard<'a> {
    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl<'a> Deref for LogGuard<'a> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Centralized logger using bump allocation for temporary formatting
pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_format: OutputFormat,
    output_mode: OutputMode,

    /// Scratch space for formatting; reset after every entry
    format_bump: RefCell<Bump>,

    /// Captured log entries (owned strings)
    log_buffer: RefCell<Vec<LogEntry>>,
}

impl GameLogger {
    /// Create a new logger with default verbosity (Normal)
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            output_format: OutputFormat::default(),
            output_mode: OutputMode::default(),
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Capture to memory only (suppresses stdout)
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn disable_capture(&mut self) {
        self.output_mode = OutputMode::Stdout;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    fn is_printing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both)
    }

    /// Print buffered logs that verbosity allows, then clear the buffer
    pub fn flush_buffer(&mut self) {
        {
            let buffer = self.log_buffer.borrow();
            for entry in buffer.iter().filter(|e| e.level <= self.verbosity) {
                self.log_to_stdout(entry);
            }
        }
        self.clear_logs();
    }

    /// Access captured log entries without copying them
    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    pub fn clear_logs(&mut self) {
        self.log_buffer.borrow_mut().clear();
        self.format_bump.borrow_mut().reset();
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.output_format = format;
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    /// Would an entry at this level be printed or captured?
    #[inline]
    pub fn enabled(&self, level: VerbosityLevel) -> bool {
        level != VerbosityLevel::Silent && (level <= self.verbosity || self.is_capturing())
    }

    fn log_to_stdout(&self, entry: &LogEntry) {
        match self.output_format {
            OutputFormat::Text => {
                if entry.level == VerbosityLevel::Minimal {
                    println!("{}", entry.message);
                } else {
                    println!("  {}", entry.message);
                }
            }
            OutputFormat::Json => match serde_json::to_string(entry) {
                Ok(line) => println!("{line}"),
                Err(_) => println!("{}", entry.message),
            },
        }
    }

    fn emit(&self, level: VerbosityLevel, category: Option<&str>, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let entry = LogEntry {
            level,
            message: message.to_string(),
            category: category.map(str::to_string),
        };
        if self.is_printing() && level <= self.verbosity {
            self.log_to_stdout(&entry);
        }
        if self.is_capturing() {
            self.log_buffer.borrow_mut().push(entry);
        }
    }

    /// Format and log in one step
    ///
    /// The message is rendered into the bump scratch buffer, so nothing is
    /// allocated on the heap unless the entry is actually kept.
    pub fn log_fmt(&self, level: VerbosityLevel, category: Option<&str>, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let mut bump = self.format_bump.borrow_mut();
        {
            let mut scratch = BumpString::new_in(&bump);
            if scratch.write_fmt(args).is_err() {
                return;
            }
            self.emit(level, category, scratch.as_str());
        }
        bump.reset();
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.emit(VerbosityLevel::Minimal, None, message);
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, None, message);
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, None, message);
    }

    /// Something degraded but non-fatal; shown at Minimal
    pub fn warning(&self, category: &str, message: &str) {
        self.log_fmt(
            VerbosityLevel::Minimal,
            Some(category),
            format_args!("WARNING: {message}"),
        );
    }
}

impl Default for GameLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GameLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}

// Clones keep settings but start with an empty buffer
impl Clone for GameLogger {
    fn clone(&self) -> Self {
        GameLogger {
            verbosity: self.verbosity,
            output_format: self.output_format,
            output_mode: self.output_mode,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }
}
