//! gix-backed dirty detection.

use crate::error::GitError;
use crate::gix_repo::GixRepo;

pub fn is_dirty(repo: &GixRepo) -> Result<bool, GitError> {
    // A bare repository has no working tree to be dirty.
    if repo.workdir.is_none() {
        return Ok(false);
    }
    repo.repo.is_dirty().map_err(GitError::backend)
}
