//! Error types.
//!
//! - `EtlError`: fatal failures of a load cycle (source lookup, schema, store I/O)
//! - `AppError`: what the binary reports (message + process exit code)
//!
//! Per-cell parse problems are *not* errors; the normalizer recovers them and
//! counts them in `NormalizeReport`.

use std::path::PathBuf;

use thiserror::Error;

/// A fatal failure while loading or persisting the dataset.
///
/// Any of these aborts the load cycle; no partially-normalized dataset is published.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("table `{table}` not found in store {}", path.display())]
    TableNotFound { path: PathBuf, table: String },

    #[error("sheet `{sheet}` not found in {}", path.display())]
    SheetNotFound { path: PathBuf, sheet: String },

    #[error("missing required column: `{column}`")]
    MissingColumn { column: String },

    #[error("unsupported source format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read spreadsheet {}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    /// Process exit code used when this error reaches `main`.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::SourceNotFound { .. }
            | EtlError::TableNotFound { .. }
            | EtlError::SheetNotFound { .. }
            | EtlError::UnsupportedFormat { .. } => 2,
            EtlError::MissingColumn { .. } => 3,
            EtlError::Spreadsheet { .. } | EtlError::Csv(_) | EtlError::Store(_) | EtlError::Io(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EtlError> for AppError {
    fn from(err: EtlError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etl_errors_map_to_exit_codes() {
        let missing: AppError = EtlError::SourceNotFound { path: PathBuf::from("securite.db") }.into();
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(missing.to_string(), "source not found: securite.db");

        let column: AppError = EtlError::MissingColumn { column: "Date".to_string() }.into();
        assert_eq!(column.exit_code(), 3);
        assert_eq!(column.to_string(), "missing required column: `Date`");
    }
}
