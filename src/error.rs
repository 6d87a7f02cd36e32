//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed timestamp '{value}' in column '{column}' (row {row})")]
    MalformedTimestamp {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("Malformed site identifier '{0}': expected '<ben_id>-...'")]
    MalformedSiteIdentifier(String),

    #[error("Malformed profile label '{0}': expected '<a>:<number>-<b>:<number>'")]
    MalformedProfileLabel(String),

    #[error("Profiles '{first}' and '{second}' both map to sheet suffix '{suffix}'")]
    ProfileSuffixCollision {
        suffix: String,
        first: String,
        second: String,
    },

    #[error("Malformed number '{value}' in column '{column}' (row {row})")]
    MalformedNumber {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("Required column '{0}' is missing from the export")]
    MissingColumn(&'static str),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    #[error("Unknown filter key '{0}'")]
    UnknownFilterKey(String),

    #[error("Invalid value '{value}' for filter key '{key}'")]
    InvalidFilterValue { key: String, value: String },

    #[error("Malformed exclusion list '{0}': expected comma separated site codes")]
    MalformedExclusionList(String),

    #[error("Invalid value '{value}' for setting {key}")]
    InvalidSetting { key: &'static str, value: String },

    #[error("Sheet '{0}' already exists in the workbook")]
    DuplicateSheet(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
