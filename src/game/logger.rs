//! Match output
//!
//! Every human-readable line of a match goes through `GameLogger`: the rules
//! record play-by-play, the session reports rejected actions, and the
//! replication layer reports bookkeeping and contract warnings. Lines are
//! printed, kept in memory, or both. Line formatting uses a bump arena that is
//! reset after every printed line.

use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::str::FromStr;

const WARNING_PREFIX: &str = "WARNING: ";

/// How much of a match is printed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum VerbosityLevel {
    Silent = 0,
    /// Match outcome only
    Minimal = 1,
    /// Play-by-play
    #[default]
    Normal = 2,
    /// Play-by-play plus automation and replication bookkeeping
    Verbose = 3,
}

impl FromStr for VerbosityLevel {
    type Err = String;

    /// Accepts level names or their numbers
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityLevel::Silent),
            "minimal" | "1" => Ok(VerbosityLevel::Minimal),
            "normal" | "2" => Ok(VerbosityLevel::Normal),
            "verbose" | "3" => Ok(VerbosityLevel::Verbose),
            other => Err(format!(
                "unknown verbosity '{other}' (silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

/// Where lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    #[default]
    Stdout,
    Memory,
    Both,
}

impl OutputMode {
    fn prints(self) -> bool {
        matches!(self, OutputMode::Stdout | OutputMode::Both)
    }

    fn captures(self) -> bool {
        matches!(self, OutputMode::Memory | OutputMode::Both)
    }
}

/// One captured line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    /// Subsystem tag such as "replication" or "automation"
    pub category: Option<String>,
    pub message: String,
}

impl LogEntry {
    pub fn is_warning(&self) -> bool {
        self.message.starts_with(WARNING_PREFIX)
    }
}

/// Settings that travel with a serialized match state
#[derive(Serialize, Deserialize)]
struct LoggerSettings {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
}

pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    /// Tag printed before every stdout line, e.g. the peer's seat
    prefix: Option<String>,
    scratch: RefCell<Bump>,
    /// Captured regardless of verbosity
    captured: RefCell<Vec<LogEntry>>,
}

impl GameLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            output_mode: OutputMode::default(),
            prefix: None,
            scratch: RefCell::new(Bump::new()),
            captured: RefCell::new(Vec::new()),
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    /// Keep lines in memory instead of printing them
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = Some(prefix.into());
    }

    /// Borrow the capture buffer without copying it
    pub fn logs(&self) -> Ref<'_, Vec<LogEntry>> {
        self.captured.borrow()
    }

    /// Copy of everything captured so far
    pub fn captured(&self) -> Vec<LogEntry> {
        self.captured.borrow().clone()
    }

    /// Captured warning messages, without their prefix
    pub fn warnings(&self) -> Vec<String> {
        self.captured
            .borrow()
            .iter()
            .filter(|e| e.is_warning())
            .map(|e| e.message[WARNING_PREFIX.len()..].to_string())
            .collect()
    }

    /// Drain the capture buffer
    pub fn take_captured(&mut self) -> Vec<LogEntry> {
        std::mem::take(self.captured.get_mut())
    }

    /// Print captured lines that pass the verbosity filter, then clear them
    pub fn flush_buffer(&mut self) {
        let entries = std::mem::take(self.captured.get_mut());
        for entry in entries.iter().filter(|e| e.level <= self.verbosity) {
            self.print_line(entry.level, &entry.message);
        }
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

    /// Bookkeeping line of one subsystem, shown at Verbose
    #[inline]
    pub fn category(&self, category: &str, message: &str) {
        self.emit(VerbosityLevel::Verbose, Some(category), message);
    }

    /// Contract violation; shown at Normal
    pub fn warn(&self, category: &str, message: &str) {
        self.emit(
            VerbosityLevel::Normal,
            Some(category),
            &format!("{WARNING_PREFIX}{message}"),
        );
    }

    fn emit(&self, level: VerbosityLevel, category: Option<&str>, message: &str) {
        if self.output_mode.captures() {
            self.captured.borrow_mut().push(LogEntry {
                level,
                category: category.map(str::to_string),
                message: message.to_string(),
            });
        }
        if self.output_mode.prints() && level <= self.verbosity {
            self.print_line(level, message);
        }
    }

    fn print_line(&self, level: VerbosityLevel, message: &str) {
        let mut scratch = self.scratch.borrow_mut();
        {
            // Outcome lines stay flush left, play-by-play is indented
            let indent = if level == VerbosityLevel::Minimal { "" } else { "  " };
            let line = match &self.prefix {
                Some(prefix) => bumpalo::format!(in &*scratch, "[{}] {}{}", prefix, indent, message),
                None => bumpalo::format!(in &*scratch, "{}{}", indent, message),
            };
            println!("{line}");
        }
        scratch.reset();
    }
}

impl Default for GameLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("prefix", &self.prefix)
            .field("captured", &self.captured.borrow().len())
            .finish()
    }
}

/// Clones share settings, not captured lines
impl Clone for GameLogger {
    fn clone(&self) -> Self {
        let mut logger = GameLogger::with_verbosity(self.verbosity);
        logger.output_mode = self.output_mode;
        logger.prefix = self.prefix.clone();
        logger
    }
}

impl Serialize for GameLogger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LoggerSettings {
            verbosity: self.verbosity,
            output_mode: self.output_mode,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GameLogger {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let settings = LoggerSettings::deserialize(deserializer)?;
        let mut logger = GameLogger::with_verbosity(settings.verbosity);
        logger.output_mode = settings.output_mode;
        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_ignores_verbosity() {
        let mut logger = GameLogger::with_verbosity(VerbosityLevel::Minimal);
        logger.enable_capture();

        logger.normal("Alice plays Grizzly Bear");
        logger.category("replication", "applied #3");

        let captured = logger.captured();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].message, "Alice plays Grizzly Bear");
        assert_eq!(captured[1].category.as_deref(), Some("replication"));
        assert_eq!(captured[1].level, VerbosityLevel::Verbose);
    }

    #[test]
    fn test_warnings_are_tagged() {
        let mut logger = GameLogger::with_verbosity(VerbosityLevel::Silent);
        logger.enable_capture();
        logger.normal("ordinary");
        logger.warn("replication", "dropped append");

        assert_eq!(logger.warnings(), vec!["dropped append".to_string()]);
        assert!(logger.captured()[1].is_warning());
    }

    #[test]
    fn test_take_captured_drains() {
        let mut logger = GameLogger::new();
        logger.enable_capture();
        logger.normal("one");
        logger.normal("two");

        assert_eq!(logger.take_captured().len(), 2);
        assert!(logger.captured().is_empty());
    }

    #[test]
    fn test_flush_buffer_empties_capture() {
        let mut logger = GameLogger::with_verbosity(VerbosityLevel::Silent);
        logger.enable_capture();
        logger.minimal("Alice wins");
        assert_eq!(logger.logs().len(), 1);

        logger.flush_buffer();
        assert!(logger.logs().is_empty());
    }

    #[test]
    fn test_clone_keeps_settings_only() {
        let mut logger = GameLogger::with_verbosity(VerbosityLevel::Verbose);
        logger.enable_capture();
        logger.set_prefix("P1");
        logger.normal("kept here");

        let copy = logger.clone();
        assert_eq!(copy.verbosity(), VerbosityLevel::Verbose);
        assert_eq!(copy.output_mode(), OutputMode::Memory);
        assert!(copy.captured().is_empty());
    }

    #[test]
    fn test_verbosity_parses_names_and_numbers() {
        assert_eq!("verbose".parse::<VerbosityLevel>(), Ok(VerbosityLevel::Verbose));
        assert_eq!("1".parse::<VerbosityLevel>(), Ok(VerbosityLevel::Minimal));
        assert_eq!("Silent".parse::<VerbosityLevel>(), Ok(VerbosityLevel::Silent));
        assert!("loud".parse::<VerbosityLevel>().is_err());
    }
}
