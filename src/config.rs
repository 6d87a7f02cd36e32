use std::path::PathBuf;

use chrono::Duration;

use crate::error::{Error, Result};
use crate::evaluate::{DEFAULT_WINDOW_SECS, window_from_secs};

/// Process-wide settings, read from the environment (and `.env`).
///
/// | variable                  | default               |
/// |---------------------------|-----------------------|
/// | `CACHE_DIR`               | `data_sets`           |
/// | `REPORT_DIR`              | `reports`             |
/// | `LOG_FILE_PATH`           | `logs/vsat_rater.log` |
/// | `CONCURRENCY_WINDOW_SECS` | `60` (at most 86400)  |
/// | `TESTS_HEADER_ROW`        | `1`                   |
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub report_dir: PathBuf,
    pub log_file_path: PathBuf,
    pub window_secs: i64,
    pub tests_header_row: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data_sets"),
            report_dir: PathBuf::from("reports"),
            log_file_path: PathBuf::from("logs/vsat_rater.log"),
            window_secs: DEFAULT_WINDOW_SECS,
            tests_header_row: 1,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(dir) = lookup("CACHE_DIR") {
            settings.cache_dir = dir.into();
        }
        if let Some(dir) = lookup("REPORT_DIR") {
            settings.report_dir = dir.into();
        }
        if let Some(path) = lookup("LOG_FILE_PATH") {
            settings.log_file_path = path.into();
        }
        if let Some(value) = lookup("CONCURRENCY_WINDOW_SECS") {
            settings.window_secs = value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| window_from_secs(*secs).is_some())
                .ok_or(Error::InvalidSetting {
                    key: "CONCURRENCY_WINDOW_SECS",
                    value,
                })?;
        }
        if let Some(value) = lookup("TESTS_HEADER_ROW") {
            settings.tests_header_row =
                value.trim().parse::<usize>().map_err(|_| Error::InvalidSetting {
                    key: "TESTS_HEADER_ROW",
                    value,
                })?;
        }

        Ok(settings)
    }

    /// Concurrency window, with `override_secs` taking precedence over
    /// the configured value.
    pub fn window(&self, override_secs: Option<i64>) -> Result<Duration> {
        match override_secs {
            Some(secs) => window_from_secs(secs).ok_or(Error::InvalidSetting {
                key: "--window-secs",
                value: secs.to_string(),
            }),
            None => window_from_secs(self.window_secs).ok_or(Error::InvalidSetting {
                key: "CONCURRENCY_WINDOW_SECS",
                value: self.window_secs.to_string(),
            }),
        }
    }

    pub fn default_report_path(&self) -> PathBuf {
        self.report_dir.join("report.json")
    }
}
