//! An in-memory commit graph implementing [`Repository`].
//!
//! `MemoryRepo` lets tests, benches and embedding callers describe a graph
//! directly instead of shelling out to git. Object ids are sha2 digests of
//! the commit's position, parents and content, so building the same graph
//! twice yields identical ids.
//!
//! ```
//! use gitstamp_git::{MemoryRepo, Repository};
//!
//! let mut repo = MemoryRepo::new();
//! let root = repo.commit(&[]);
//! let tip = repo.commit(&[root]);
//! repo.tag("v1.0.0", root);
//! repo.branch("main", tip);
//! repo.checkout("main");
//! assert_eq!(repo.head().unwrap(), Some(tip));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use crate::error::GitError;
use crate::repo::Repository;
use crate::types::{CommitInfo, GitOid};

/// Commit timestamps start here and advance one minute per commit.
const EPOCH: i64 = 1_700_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Head {
    Unborn,
    Branch(String),
    Detached(GitOid),
}

/// A deterministic, in-memory [`Repository`].
#[derive(Clone, Debug)]
pub struct MemoryRepo {
    commits: BTreeMap<GitOid, CommitInfo>,
    tags: BTreeMap<String, GitOid>,
    branches: BTreeMap<String, GitOid>,
    head: Head,
    dirty: bool,
    shallow: bool,
    counter: u64,
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepo {
    /// An empty repository with an unborn HEAD.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commits: BTreeMap::new(),
            tags: BTreeMap::new(),
            branches: BTreeMap::new(),
            head: Head::Unborn,
            dirty: false,
            shallow: false,
            counter: 0,
        }
    }

    /// Add a commit with fresh, unique content.
    pub fn commit(&mut self, parents: &[GitOid]) -> GitOid {
        let content = format!("content-{}", self.counter);
        self.commit_with_content(parents, &content)
    }

    /// Add a commit whose tree is identified by `content`. Commits created
    /// with the same `content` share a tree id, as cherry-picks and merges
    /// that reproduce a tree do.
    pub fn commit_with_content(&mut self, parents: &[GitOid], content: &str) -> GitOid {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"commit\0");
        hasher.update(self.counter.to_le_bytes());
        for parent in parents {
            hasher.update(parent.as_bytes());
        }
        hasher.update(content.as_bytes());
        let id = digest_oid(hasher);

        let info = CommitInfo {
            id,
            tree_oid: tree_oid(content),
            parents: parents.to_vec(),
            time: EPOCH + i64::try_from(self.counter).unwrap_or(i64::MAX) * 60,
        };
        self.commits.insert(id, info);
        id
    }

    /// Add a linear chain of `len` commits on top of `parent`; returns the ids
    /// in order (the last one is the tip). [`GitOid::ZERO`] starts a new root.
    pub fn chain(&mut self, parent: GitOid, len: usize) -> Vec<GitOid> {
        let mut ids = Vec::with_capacity(len);
        let mut tip = parent;
        for _ in 0..len {
            tip = if tip.is_zero() {
                self.commit(&[])
            } else {
                self.commit(&[tip])
            };
            ids.push(tip);
        }
        ids
    }

    /// Create or move a tag.
    pub fn tag(&mut self, name: &str, id: GitOid) {
        self.tags.insert(name.to_owned(), id);
    }

    /// Create or move a local branch.
    pub fn branch(&mut self, name: &str, id: GitOid) {
        self.branches.insert(name.to_owned(), id);
    }

    /// Create or move a remote-tracking branch (`remote/name`).
    pub fn remote_branch(&mut self, remote: &str, name: &str, id: GitOid) {
        self.branches.insert(format!("{remote}/{name}"), id);
    }

    /// Point HEAD at a local branch.
    pub fn checkout(&mut self, branch: &str) {
        self.head = Head::Branch(branch.to_owned());
    }

    /// Detach HEAD at a commit.
    pub fn detach(&mut self, id: GitOid) {
        self.head = Head::Detached(id);
    }

    /// Mark the working tree as having uncommitted changes.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Drop every strict ancestor of `boundary`, as a depth-limited clone
    /// would, and mark the repository shallow. `boundary` keeps its parent
    /// ids, which no longer resolve.
    pub fn make_shallow(&mut self, boundary: GitOid) {
        let mut pending: Vec<GitOid> = self
            .commits
            .get(&boundary)
            .map(|c| c.parents.clone())
            .unwrap_or_default();
        let mut seen = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(info) = self.commits.remove(&id) {
                pending.extend(info.parents);
            }
        }
        self.shallow = true;
    }

    /// Number of commits currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// `true` if no commit was added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

fn tree_oid(content: &str) -> GitOid {
    let mut hasher = Sha256::new();
    hasher.update(b"tree\0");
    hasher.update(content.as_bytes());
    digest_oid(hasher)
}

fn digest_oid(hasher: Sha256) -> GitOid {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[..20]);
    GitOid::from_bytes(bytes)
}

impl Repository for MemoryRepo {
    fn head(&self) -> Result<Option<GitOid>, GitError> {
        Ok(match &self.head {
            Head::Unborn => None,
            Head::Branch(name) => self.branches.get(name).copied(),
            Head::Detached(id) => Some(*id),
        })
    }

    fn head_branch(&self) -> Result<Option<String>, GitError> {
        Ok(match &self.head {
            Head::Branch(name) => Some(name.clone()),
            Head::Unborn | Head::Detached(_) => None,
        })
    }

    fn lookup(&self, id: GitOid) -> Result<Option<CommitInfo>, GitError> {
        Ok(self.commits.get(&id).cloned())
    }

    fn resolve(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        if spec == "HEAD" {
            return self.head();
        }
        if let Ok(id) = spec.parse::<GitOid>() {
            return Ok(self.commits.contains_key(&id).then_some(id));
        }
        if let Some(id) = self.branches.get(spec) {
            return Ok(Some(*id));
        }
        Ok(self.tags.get(spec).copied())
    }

    fn branch_tip(&self, name: &str) -> Result<Option<GitOid>, GitError> {
        Ok(self.branches.get(name).copied())
    }

    fn tags(&self) -> Result<Vec<(String, GitOid)>, GitError> {
        Ok(self
            .tags
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect())
    }

    fn branches_pointing_at(&self, id: GitOid) -> Result<Vec<String>, GitError> {
        Ok(self
            .branches
            .iter()
            .filter(|(_, tip)| **tip == id)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        Ok(self.dirty)
    }

    fn is_shallow(&self) -> Result<bool, GitError> {
        Ok(self.shallow)
    }
}
