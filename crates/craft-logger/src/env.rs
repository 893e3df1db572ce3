//! Development-mode environment overrides, read once at construction.

use tracing::debug;

use crate::level::LogLevel;

/// Advisory filters layered before everything else in development mode:
/// a verbosity floor and a module allow-list.
#[derive(Debug, Clone)]
pub(crate) struct EnvOverrides {
    /// `LogLevel::None` means no environment floor is configured.
    pub level: LogLevel,
    pub modules: Vec<String>,
}

impl EnvOverrides {
    pub fn disabled() -> Self {
        Self {
            level: LogLevel::None,
            modules: Vec::new(),
        }
    }

    pub fn from_env(level_var: &str, modules_var: &str) -> Self {
        let mut overrides = Self::disabled();

        if let Ok(raw) = std::env::var(level_var) {
            match raw.parse::<LogLevel>() {
                Ok(level) => {
                    overrides.level = level;
                    debug!(var = level_var, level = %level, "environment log level loaded");
                }
                Err(e) => debug!(var = level_var, error = %e, "ignoring environment log level"),
            }
        }

        if let Ok(raw) = std::env::var(modules_var) {
            overrides.modules = raw
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !overrides.modules.is_empty() {
                debug!(var = modules_var, modules = ?overrides.modules, "environment module filter loaded");
            }
        }

        overrides
    }

    /// Whether a record from `module` at `level` survives both filters.
    pub fn passes(&self, module: &str, level: LogLevel) -> bool {
        if self.level != LogLevel::None && level.rank() < self.level.rank() {
            return false;
        }
        if !module.is_empty()
            && !self.modules.is_empty()
            && !self.modules.iter().any(|m| m == module)
        {
            return false;
        }
        true
    }
}
