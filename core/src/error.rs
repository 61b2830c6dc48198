use std::fmt;

use thiserror::Error;

/// Which keyed collection a name was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Food,
    Meal,
    Activity,
    DiaryDate,
    DiaryEntry,
    MealLine,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Food => "food",
            RecordKind::Meal => "meal",
            RecordKind::Activity => "activity",
            RecordKind::DiaryDate => "diary date",
            RecordKind::DiaryEntry => "diary entry",
            RecordKind::MealLine => "meal line",
        };
        f.write_str(label)
    }
}

/// Every failure the ledger reports. None of them is fatal to the process:
/// interactive sessions print the error and keep accepting commands.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid index {index}: choose 1 to {available}")]
    InvalidIndex { index: usize, available: usize },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: RecordKind, name: String },

    #[error("{kind} '{name}' already exists; delete it first to replace it")]
    AlreadyExists { kind: RecordKind, name: String },

    #[error("search service failed: {0:#}")]
    RemoteService(anyhow::Error),

    #[error("storage failed: {0:#}")]
    Persistence(anyhow::Error),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(kind: RecordKind, name: impl Into<String>) -> Self {
        LedgerError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: RecordKind, name: impl Into<String>) -> Self {
        LedgerError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
