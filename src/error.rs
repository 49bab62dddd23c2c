use std::fmt;

use serde::Serialize;
use ts_rs::TS;

use crate::compiler::{Diagnostic, DiagnosticKind};
use crate::dsl::disasm::DecodeError;
use crate::library::LibraryError;
use crate::store::StoreError;

/// Structured error type for the service layer. Clients match on `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "code", content = "detail")]
#[ts(export)]
pub enum AppError {
    NotFound {
        what: String,
    },
    ParseError {
        message: String,
        #[ts(type = "number | null")]
        position: Option<usize>,
        detail: Option<String>,
    },
    ValidationError {
        message: String,
    },
    DecodeError {
        message: String,
    },
    InvalidArgument {
        message: String,
    },
    IoError {
        message: String,
    },
    LibraryError {
        message: String,
    },
    SettingsSaveError {
        message: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound { what } => write!(f, "{what}"),
            AppError::ParseError {
                message, detail, ..
            } => match detail {
                Some(detail) => write!(f, "{message}: {detail}"),
                None => write!(f, "{message}"),
            },
            AppError::ValidationError { message } | AppError::InvalidArgument { message } => {
                write!(f, "{message}")
            }
            AppError::DecodeError { message } => write!(f, "Bad bytecode: {message}"),
            AppError::IoError { message } => write!(f, "I/O error: {message}"),
            AppError::LibraryError { message } => write!(f, "Script library error: {message}"),
            AppError::SettingsSaveError { message } => {
                write!(f, "Failed to save settings: {message}")
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<Diagnostic> for AppError {
    fn from(d: Diagnostic) -> Self {
        match d.kind {
            DiagnosticKind::NotFound => AppError::NotFound { what: d.message },
            DiagnosticKind::ParseError => AppError::ParseError {
                message: d.message,
                position: d.position,
                detail: d.detail,
            },
        }
    }
}

impl From<DecodeError> for AppError {
    fn from(e: DecodeError) -> Self {
        AppError::DecodeError {
            message: e.to_string(),
        }
    }
}

impl From<LibraryError> for AppError {
    fn from(e: LibraryError) -> Self {
        AppError::LibraryError {
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io { .. } => AppError::IoError {
                message: e.to_string(),
            },
            StoreError::Json { .. } => AppError::ValidationError {
                message: e.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::IoError {
            message: e.to_string(),
        }
    }
}
