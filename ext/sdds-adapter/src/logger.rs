// Level-gated logger for the handle API.
// Writes to stderr unless the embedder installs a sink.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::BindingError;

/// Environment variable holding the default level
pub const LOG_LEVEL_ENV: &str = "SDDS_LOG_LEVEL";

/// Severity levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }

    /// The level named by `SDDS_LOG_LEVEL`, or `Warn`
    pub fn from_env() -> Self {
        std::env::var(LOG_LEVEL_ENV)
            .unwrap_or_else(|_| "warn".to_string())
            .parse::<LogLevel>()
            .unwrap_or(LogLevel::Warn)
    }
}

impl FromStr for LogLevel {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "fatal" => LogLevel::Fatal,
            _ => {
                return Err(BindingError::invalid_arguments(format!(
                    "Invalid log level: {}",
                    s
                )))
            }
        })
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every message that passes the level gate
pub type LogSink = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

#[derive(Clone)]
pub struct Logger {
    sink: Option<LogSink>,
    level: LogLevel,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("sink", &self.sink.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Logger {
    /// A logger at `level`, or at the environment level when `None`
    pub fn new(level: Option<LogLevel>, sink: Option<LogSink>) -> Self {
        Self {
            sink,
            level: level.unwrap_or_else(LogLevel::from_env),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level <= level
    }

    /// Log a message at the given level, ignoring the gate
    pub fn log(&self, level: LogLevel, message: &str) {
        match &self.sink {
            Some(sink) => sink(level, message),
            None => eprintln!("[{}] {}", level, message),
        }
    }

    fn gated<F, S>(&self, level: LogLevel, message_fn: F)
    where
        F: FnOnce() -> S,
        S: AsRef<str>,
    {
        if self.enabled(level) {
            let message = message_fn();
            self.log(level, message.as_ref());
        }
    }

    pub fn debug<F, S>(&self, message_fn: F)
    where
        F: FnOnce() -> S,
        S: AsRef<str>,
    {
        self.gated(LogLevel::Debug, message_fn)
    }

    pub fn info<F, S>(&self, message_fn: F)
    where
        F: FnOnce() -> S,
        S: AsRef<str>,
    {
        self.gated(LogLevel::Info, message_fn)
    }

    pub fn warn<F, S>(&self, message_fn: F)
    where
        F: FnOnce() -> S,
        S: AsRef<str>,
    {
        self.gated(LogLevel::Warn, message_fn)
    }

    pub fn error<F, S>(&self, message_fn: F)
    where
        F: FnOnce() -> S,
        S: AsRef<str>,
    {
        self.gated(LogLevel::Error, message_fn)
    }

    pub fn fatal<F, S>(&self, message_fn: F)
    where
        F: FnOnce() -> S,
        S: AsRef<str>,
    {
        self.gated(LogLevel::Fatal, message_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture() -> (LogSink, Arc<Mutex<Vec<(LogLevel, String)>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let store = lines.clone();
        let sink: LogSink = Arc::new(move |level: LogLevel, msg: &str| {
            store.lock().unwrap().push((level, msg.to_string()));
        });
        (sink, lines)
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_messages_below_level_are_skipped() {
        let (sink, lines) = capture();
        let logger = Logger::new(Some(LogLevel::Warn), Some(sink));
        let mut formatted = false;
        logger.debug(|| {
            formatted = true;
            "hidden"
        });
        logger.warn(|| "shown");
        logger.error(|| format!("code {}", 7));
        assert!(!formatted);
        let lines = lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                (LogLevel::Warn, "shown".to_string()),
                (LogLevel::Error, "code 7".to_string())
            ]
        );
    }
}
