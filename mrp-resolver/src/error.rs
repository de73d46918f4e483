//! Error types for mrp-resolver
//!
//! Only manual-override validation reaches callers of the pipeline. Source and
//! provider failures have their own error types (see `sources` and
//! `keywords::providers`) and are absorbed where they occur.

use thiserror::Error;

/// Errors surfaced by resolver operations
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Manual override URL is not a well-formed http(s) URL
    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    /// Candidate selection index past the generated list
    #[error("Candidate index {index} out of range (entry has {len} candidates)")]
    CandidateOutOfRange { index: usize, len: usize },
}

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
