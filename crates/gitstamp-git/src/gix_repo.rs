//! The gix-backed implementation of [`Repository`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::Repository;
use crate::types::{CommitInfo, GitOid};

/// A [`Repository`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// Construct via [`GixRepo::open`] or [`GixRepo::open_at`].
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: Option<PathBuf>,
}

impl GixRepo {
    /// Open the git repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(path).map_err(|e| GitError::NotFound {
            message: format!("no git repository at or above {}: {e}", path.display()),
        })?;
        let workdir = repo.workdir().map(Path::to_path_buf);
        Ok(Self { repo, workdir })
    }

    /// Open a git repository at exactly `path` (no parent discovery).
    pub fn open_at(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open_opts(path, gix::open::Options::isolated()).map_err(|e| {
            GitError::NotFound {
                message: format!("no git repository at {}: {e}", path.display()),
            }
        })?;
        let workdir = repo.workdir().map(Path::to_path_buf);
        Ok(Self { repo, workdir })
    }

    /// Root of the working tree, `None` for bare repositories.
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }
}

impl Repository for GixRepo {
    fn head(&self) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::resolve(self, "HEAD")
    }

    fn head_branch(&self) -> Result<Option<String>, GitError> {
        crate::refs_impl::head_branch(self)
    }

    fn lookup(&self, id: GitOid) -> Result<Option<CommitInfo>, GitError> {
        crate::objects_impl::lookup(self, id)
    }

    fn resolve(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::resolve(self, spec)
    }

    fn branch_tip(&self, name: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::branch_tip(self, name)
    }

    fn tags(&self) -> Result<Vec<(String, GitOid)>, GitError> {
        crate::refs_impl::tags(self)
    }

    fn branches_pointing_at(&self, id: GitOid) -> Result<Vec<String>, GitError> {
        crate::refs_impl::branches_pointing_at(self, id)
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        crate::status_impl::is_dirty(self)
    }

    fn is_shallow(&self) -> Result<bool, GitError> {
        Ok(self.repo.is_shallow())
    }
}
