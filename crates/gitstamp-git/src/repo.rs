//! The [`Repository`] trait: the abstraction boundary between the version
//! engine and git.
//!
//! Everything here is read-only: the engine never writes refs, objects, or
//! the working tree. The trait is object-safe so callers can hand the engine
//! a `&dyn Repository`.
//!
//! | Group     | Methods                                            |
//! |-----------|----------------------------------------------------|
//! | Head      | `head`, `head_branch`, `is_dirty`                  |
//! | Objects   | `lookup`                                           |
//! | Rev-parse | `resolve`, `branch_tip`                            |
//! | Refs      | `tags`, `branches_pointing_at`                     |
//! | Shape     | `is_shallow`                                       |

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid};

/// Read access to a commit graph.
///
/// Implementations may be backed by gix ([`GixRepo`](crate::GixRepo)) or by
/// an in-memory snapshot ([`MemoryRepo`](crate::MemoryRepo)).
pub trait Repository {
    /// The commit HEAD points to, or `None` for an unborn HEAD (a freshly
    /// initialized repository without commits).
    fn head(&self) -> Result<Option<GitOid>, GitError>;

    /// Short name of the checked-out branch (`"main"`), or `None` when HEAD
    /// is detached.
    fn head_branch(&self) -> Result<Option<String>, GitError>;

    /// Read a commit.
    ///
    /// Returns `None` when the object is absent (typically a parent beyond
    /// the boundary of a shallow clone) or is not a commit.
    fn lookup(&self, id: GitOid) -> Result<Option<CommitInfo>, GitError>;

    /// Resolve a revision specification (full sha, branch, tag, `HEAD~2`, ...)
    /// to a commit id. Returns `None` if it cannot be resolved.
    fn resolve(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    /// Tip of a branch. `name` is looked up as a local branch first, then as a
    /// remote-tracking branch (`"origin/develop"`).
    fn branch_tip(&self, name: &str) -> Result<Option<GitOid>, GitError>;

    /// Every tag as `(short tag name, commit id)`, annotated tags peeled to the
    /// commit they point to. Sorted by tag name.
    fn tags(&self) -> Result<Vec<(String, GitOid)>, GitError>;

    /// Names of the branches whose tip is `id`: local branches by short name
    /// (`"develop"`), remote-tracking branches as `"remote/name"`. Sorted.
    fn branches_pointing_at(&self, id: GitOid) -> Result<Vec<String>, GitError>;

    /// Returns `true` if the working tree or index has uncommitted changes.
    fn is_dirty(&self) -> Result<bool, GitError>;

    /// Returns `true` if this is a shallow clone (history is truncated).
    fn is_shallow(&self) -> Result<bool, GitError>;
}
