//! Error queue, program name registration, warnings and fatal reports

use std::fmt;
use std::io::Write;

use crate::error::BindingError;
use crate::logger::Logger;
use itertools::Itertools;

/// Called by [`Diagnostics::bomb`] in place of process exit
pub type FatalHook = Box<dyn FnMut(&str) + Send>;

/// How `print_errors` renders the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Print nothing and empty the queue
    Silent,
    /// Print the first entry and a count of the rest, keep the queue
    Summary,
    /// Print every entry, keep the queue
    Verbose,
    /// Print every entry, then empty the queue
    VerboseAndClear,
}

impl PrintMode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PrintMode::Silent),
            1 => Some(PrintMode::Summary),
            2 => Some(PrintMode::Verbose),
            3 => Some(PrintMode::VerboseAndClear),
            _ => None,
        }
    }
}

pub struct Diagnostics {
    errors: Vec<String>,
    program_name: Option<String>,
    logger: Logger,
    fatal_hook: Option<FatalHook>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("errors", &self.errors)
            .field("program_name", &self.program_name)
            .field("logger", &self.logger)
            .field("fatal_hook", &self.fatal_hook.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Logger::default())
    }
}

impl Diagnostics {
    pub fn new(logger: Logger) -> Self {
        Self {
            errors: Vec::new(),
            program_name: None,
            logger,
            fatal_hook: None,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// Push one entry onto the queue
    pub fn set_error<S: Into<String>>(&mut self, text: S) {
        let text = text.into();
        self.logger.debug(|| format!("queued error: {}", text));
        self.errors.push(text);
    }

    pub fn number_of_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Tag subsequent reports with `name`. An empty name clears the tag.
    pub fn register_program_name<S: Into<String>>(&mut self, name: S) {
        self.program_name = Some(name.into()).filter(|n| !n.is_empty());
    }

    pub fn program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }

    fn heading(&self) -> String {
        match &self.program_name {
            Some(name) => format!("Error for {}:", name),
            None => "Error:".to_string(),
        }
    }

    /// The text `print_errors` would write, without touching the queue
    pub fn render(&self, mode: PrintMode) -> String {
        if self.errors.is_empty() || mode == PrintMode::Silent {
            return String::new();
        }
        let mut out = self.heading();
        out.push('\n');
        match mode {
            PrintMode::Summary => {
                out.push_str(&format!("  {}\n", self.errors[0]));
                if self.errors.len() > 1 {
                    out.push_str(&format!("  ({} more)\n", self.errors.len() - 1));
                }
            }
            _ => out.push_str(&self.errors.iter().map(|e| format!("  {}\n", e)).join("")),
        }
        out
    }

    /// Render the queue to `writer` according to `mode`
    pub fn print_errors_to<W: Write>(&mut self, writer: &mut W, mode: PrintMode) -> std::io::Result<()> {
        writer.write_all(self.render(mode).as_bytes())?;
        if matches!(mode, PrintMode::Silent | PrintMode::VerboseAndClear) {
            self.errors.clear();
        }
        Ok(())
    }

    /// Render the queue to stderr according to `mode`
    pub fn print_errors(&mut self, mode: PrintMode) {
        let mut stderr = std::io::stderr();
        if let Err(e) = self.print_errors_to(&mut stderr, mode) {
            self.logger.error(|| format!("failed to print errors: {}", e));
        }
    }

    /// Non-fatal message. Goes to the logger, never to the queue.
    pub fn warning(&self, text: &str) {
        match &self.program_name {
            Some(name) => self.logger.warn(|| format!("{}: {}", name, text)),
            None => self.logger.warn(|| text),
        }
    }

    /// Replace process exit in [`Diagnostics::bomb`] with `hook`
    pub fn set_fatal_hook(&mut self, hook: FatalHook) {
        self.fatal_hook = Some(hook);
    }

    /// Fatal report. With a hook installed the hook runs and a
    /// [`BindingError::Fatal`] comes back; otherwise the queue is printed
    /// and the process exits with status 1.
    pub fn bomb(&mut self, text: &str) -> BindingError {
        self.set_error(text);
        self.logger.fatal(|| format!("{} {}", self.heading(), text));
        if let Some(hook) = self.fatal_hook.as_mut() {
            hook(text);
            return BindingError::Fatal(text.to_string());
        }
        self.print_errors(PrintMode::VerboseAndClear);
        std::process::exit(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use std::sync::{Arc, Mutex};

    fn quiet() -> Diagnostics {
        Diagnostics::new(Logger::new(Some(LogLevel::Fatal), Some(Arc::new(|_: LogLevel, _: &str| {}))))
    }

    #[test]
    fn test_queue() {
        let mut diag = quiet();
        diag.set_error("first");
        diag.set_error("second");
        assert_eq!(diag.number_of_errors(), 2);
        diag.clear_errors();
        assert_eq!(diag.number_of_errors(), 0);
    }

    #[test]
    fn test_render_modes() {
        let mut diag = quiet();
        diag.register_program_name("sddsprog");
        diag.set_error("bad column");
        diag.set_error("bad page");

        assert_eq!(
            diag.render(PrintMode::Summary),
            "Error for sddsprog:\n  bad column\n  (1 more)\n"
        );
        assert_eq!(
            diag.render(PrintMode::Verbose),
            "Error for sddsprog:\n  bad column\n  bad page\n"
        );

        let mut out = Vec::new();
        diag.print_errors_to(&mut out, PrintMode::Verbose).unwrap();
        assert_eq!(diag.number_of_errors(), 2);
        out.clear();
        diag.print_errors_to(&mut out, PrintMode::VerboseAndClear).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
        assert_eq!(diag.number_of_errors(), 0);

        diag.register_program_name("");
        diag.set_error("x");
        assert_eq!(diag.render(PrintMode::Verbose), "Error:\n  x\n");
        let mut out = Vec::new();
        diag.print_errors_to(&mut out, PrintMode::Silent).unwrap();
        assert!(out.is_empty());
        assert_eq!(diag.number_of_errors(), 0);
    }

    #[test]
    fn test_warning_goes_to_logger_only() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let store = lines.clone();
        let logger = Logger::new(
            Some(LogLevel::Warn),
            Some(Arc::new(move |_: LogLevel, msg: &str| store.lock().unwrap().push(msg.to_string()))),
        );
        let mut diag = Diagnostics::new(logger);
        diag.register_program_name("prog");
        diag.warning("low beam current");
        assert_eq!(diag.number_of_errors(), 0);
        assert_eq!(*lines.lock().unwrap(), vec!["prog: low beam current".to_string()]);
    }

    #[test]
    fn test_bomb_with_hook() {
        let seen = Arc::new(Mutex::new(None));
        let store = seen.clone();
        let mut diag = quiet();
        diag.set_fatal_hook(Box::new(move |text| {
            *store.lock().unwrap() = Some(text.to_string());
        }));
        let err = diag.bomb("cannot continue");
        assert!(matches!(err, BindingError::Fatal(_)));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("cannot continue"));
        assert_eq!(diag.number_of_errors(), 1);
    }
}
