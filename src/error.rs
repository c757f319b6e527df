//! Error types for texflat
//!
//! Uses `thiserror` for library errors. Only two conditions abort a
//! resolution run; everything else accumulates in the `ResolutionReport`.

use std::path::PathBuf;
use thiserror::Error;

use crate::report::ResolutionReport;

/// Result type alias for texflat operations
pub type TexflatResult<T> = Result<T, TexflatError>;

/// Main error type for texflat operations
#[derive(Error, Debug)]
pub enum TexflatError {
    /// Entry document does not exist under the project root
    #[error("entry document not found: {path}")]
    ProjectNotFound { path: PathBuf },

    /// Policy-triggered aggregate failure after a complete run.
    ///
    /// Raised only when `MissingPolicy::Fail` is in effect and at least one
    /// reference could not be resolved. Carries the full report so callers
    /// lose no diagnostics.
    #[error("resolution failed: {} unresolved reference(s)", .report.missing_count())]
    ResolutionFailed { report: ResolutionReport },

    /// Invalid arXiv identifier or URL
    #[error("not a recognized arXiv id or URL: {input}")]
    InvalidArxivId { input: String },
}
