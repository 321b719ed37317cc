//! gix-backed ref and rev-parse operations.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::GitOid;

const LOCAL_PREFIX: &str = "refs/heads/";
const REMOTE_PREFIX: &str = "refs/remotes/";
const TAG_PREFIX: &str = "refs/tags/";

/// Convert a `gix::ObjectId` (or `&gix::oid`) to a `GitOid`.
pub(crate) fn from_gix_oid(oid: &gix::oid) -> GitOid {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&oid.as_bytes()[..20]);
    GitOid::from_bytes(bytes)
}

/// Convert a `GitOid` to a `gix::ObjectId`.
pub(crate) fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from(*oid.as_bytes())
}

pub fn resolve(repo: &GixRepo, spec: &str) -> Result<Option<GitOid>, GitError> {
    // Peel through annotated tags so a tag name resolves to its commit.
    let peeled = format!("{spec}^{{commit}}");
    match repo.repo.rev_parse_single(peeled.as_str()) {
        Ok(id) => Ok(Some(from_gix_oid(id.as_ref()))),
        // Malformed specs, missing refs and unborn HEAD are all "cannot be
        // resolved" from the caller's point of view.
        Err(e) => {
            tracing::debug!(spec, error = %e, "revision did not resolve");
            Ok(None)
        }
    }
}

pub fn head_branch(repo: &GixRepo) -> Result<Option<String>, GitError> {
    let name = repo.repo.head_name().map_err(GitError::backend)?;
    Ok(name.and_then(|full| {
        full.as_bstr()
            .to_string()
            .strip_prefix(LOCAL_PREFIX)
            .map(str::to_owned)
    }))
}

pub fn branch_tip(repo: &GixRepo, name: &str) -> Result<Option<GitOid>, GitError> {
    for prefix in [LOCAL_PREFIX, REMOTE_PREFIX] {
        let full = format!("{prefix}{name}");
        if let Some(oid) = read_ref(repo, &full)? {
            return Ok(Some(oid));
        }
    }
    Ok(None)
}

fn read_ref(repo: &GixRepo, name: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.try_find_reference(name) {
        Ok(Some(mut r)) => {
            let id = r.peel_to_id_in_place().map_err(GitError::backend)?;
            Ok(Some(from_gix_oid(id.as_ref())))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(GitError::backend(e)),
    }
}

pub fn tags(repo: &GixRepo) -> Result<Vec<(String, GitOid)>, GitError> {
    let mut tags = list_refs(repo, TAG_PREFIX)?
        .into_iter()
        .filter_map(|(name, oid)| {
            name.strip_prefix(TAG_PREFIX)
                .map(|short| (short.to_owned(), oid))
        })
        .collect::<Vec<_>>();
    tags.sort();
    Ok(tags)
}

pub fn branches_pointing_at(repo: &GixRepo, id: GitOid) -> Result<Vec<String>, GitError> {
    let mut names = Vec::new();
    for prefix in [LOCAL_PREFIX, REMOTE_PREFIX] {
        for (name, oid) in list_refs(repo, prefix)? {
            if oid != id {
                continue;
            }
            let Some(short) = name.strip_prefix(prefix) else {
                continue;
            };
            // `refs/remotes/origin/HEAD` is a symbolic alias, not a branch.
            if prefix == REMOTE_PREFIX && short.ends_with("/HEAD") {
                continue;
            }
            names.push(short.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// List `(full ref name, peeled oid)` pairs under `prefix`.
fn list_refs(repo: &GixRepo, prefix: &str) -> Result<Vec<(String, GitOid)>, GitError> {
    let platform = repo.repo.references().map_err(GitError::backend)?;
    let refs_iter = platform.prefixed(prefix).map_err(GitError::backend)?;

    let mut result = Vec::new();
    for r in refs_iter {
        let mut r = r.map_err(GitError::backend)?;
        let name = r.name().as_bstr().to_string();
        match r.peel_to_id_in_place() {
            Ok(id) => result.push((name, from_gix_oid(id.as_ref()))),
            Err(e) => {
                // A dangling ref should not hide every other tag or branch.
                tracing::warn!(reference = %name, error = %e, "skipping unpeelable ref");
            }
        }
    }
    Ok(result)
}
