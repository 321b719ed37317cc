//! Error types for repository access.
//!
//! [`GitError`] is returned by every [`Repository`](crate::Repository) method.
//! Absence is not an error: lookups that can legitimately miss (an object
//! beyond a shallow boundary, an unknown branch) return `Ok(None)` instead.

use thiserror::Error;

/// Errors returned by [`Repository`](crate::Repository) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository itself could not be found or opened.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// The underlying git backend returned an unclassified error.
    ///
    /// The `message` should include enough context to diagnose the failure.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl GitError {
    pub(crate) fn backend(e: impl std::fmt::Display) -> Self {
        Self::BackendError {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_render_their_message() {
        let err = GitError::backend("pack index is corrupt");
        assert_eq!(err.to_string(), "git backend error: pack index is corrupt");
        let err = GitError::NotFound {
            message: "no repository at /tmp/x".to_owned(),
        };
        assert_eq!(err.to_string(), "not found: no repository at /tmp/x");
    }
}
