//! gix-backed commit reads.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::refs_impl::{from_gix_oid, to_gix_oid};
use crate::types::{CommitInfo, GitOid};

pub fn lookup(repo: &GixRepo, id: GitOid) -> Result<Option<CommitInfo>, GitError> {
    let object = repo
        .repo
        .try_find_object(to_gix_oid(id))
        .map_err(|e| GitError::BackendError {
            message: format!("object {id}: {e}"),
        })?;
    let Some(object) = object else {
        return Ok(None);
    };
    let Ok(commit) = object.try_into_commit() else {
        return Ok(None);
    };

    let decoded = commit.decode().map_err(|e| GitError::BackendError {
        message: format!("failed to decode commit {id}: {e}"),
    })?;

    let time = decoded
        .author()
        .time()
        .map_err(|e| GitError::BackendError {
            message: format!("failed to read author time of commit {id}: {e}"),
        })?
        .seconds;

    Ok(Some(CommitInfo {
        id,
        tree_oid: from_gix_oid(decoded.tree().as_ref()),
        parents: decoded.parents().map(|p| from_gix_oid(p.as_ref())).collect(),
        time,
    }))
}
