use crate::logger::{LogLevel, LogSink, Logger};
use sdds_core::NamePolicy;

pub use sdds_core::OutputOptions;

/// Number of handle slots when none is configured
pub const DEFAULT_CAPACITY: usize = 20;

/// Settings for a [`crate::Sdds`] instance
#[derive(Clone)]
pub struct BindingConfig {
    pub capacity: usize,
    pub name_policy: NamePolicy,
    /// Run the consistency check after every page write and read
    pub auto_check: bool,
    pub log_level: Option<LogLevel>,
    pub log_sink: Option<LogSink>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            name_policy: NamePolicy::Strict,
            auto_check: false,
            log_level: None,
            log_sink: None,
        }
    }
}

impl std::fmt::Debug for BindingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingConfig")
            .field("capacity", &self.capacity)
            .field("name_policy", &self.name_policy)
            .field("auto_check", &self.auto_check)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl BindingConfig {
    pub fn builder() -> BindingConfigBuilder {
        BindingConfigBuilder::new()
    }

    pub(crate) fn logger(&self) -> Logger {
        Logger::new(self.log_level, self.log_sink.clone())
    }
}

/// Builder for [`BindingConfig`]
#[derive(Default)]
pub struct BindingConfigBuilder {
    config: BindingConfig,
}

impl BindingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of handle slots
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.config.name_policy = policy;
        self
    }

    pub fn with_auto_check(mut self, enabled: bool) -> Self {
        self.config.auto_check = enabled;
        self
    }

    /// Override the level from `SDDS_LOG_LEVEL`
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = Some(level);
        self
    }

    /// Route log output to `sink` instead of stderr
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.config.log_sink = Some(sink);
        self
    }

    pub fn build(self) -> BindingConfig {
        self.config
    }
}

/// Per-session toggles as seen through the handle API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionFlags {
    pub column_major: bool,
    pub fixed_row_count: bool,
    pub fsync: bool,
    pub defer_layout: bool,
    /// Recorded from `set_terminate_mode`; strings are always owned, so it
    /// has no effect on termination
    pub terminate_mode: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BindingConfig::default();
        assert_eq!(config.capacity, 20);
        assert_eq!(config.name_policy, NamePolicy::Strict);
        assert!(!config.auto_check);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_builder() {
        let config = BindingConfig::builder()
            .with_capacity(4)
            .with_name_policy(NamePolicy::AllowAny)
            .with_auto_check(true)
            .with_log_level(LogLevel::Debug)
            .build();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.name_policy, NamePolicy::AllowAny);
        assert!(config.auto_check);
        assert_eq!(config.logger().level(), LogLevel::Debug);
    }
}
