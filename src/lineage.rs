//! Lineage walk: the best version visible at a commit, and how far below it
//! the commit sits.
//!
//! For every commit the walk combines two candidates:
//!
//! - **local**: the best tag of the commit's content group;
//! - **inherited**: the best of the parents' results. Parents are compared
//!   by version, then by depth, so on a tie the longest path back to the
//!   version wins and CI build numbers keep growing across merges.
//!
//! A local tag strictly above the inherited version becomes the best at
//! depth 0; otherwise the commit inherits, one step deeper.
//!
//! Results are memoized per `(commit, excluded version)`. The excluded view
//! pretends every tag of one version is absent; it validates a commit's own
//! release tag against what lies below it.
//!
//! The walk is an explicit post-order traversal, so arbitrarily long
//! histories do not grow the call stack. Parents that are missing from the
//! object database (shallow clones) are skipped and the result is flagged
//! `shallow`.

use std::collections::HashMap;

use gitstamp_git::{GitError, GitOid, Repository};
use gitstamp_version::Version;
use tracing::{debug, trace};

use crate::catalog::Catalog;

// ---------------------------------------------------------------------------
// LineageInfo
// ---------------------------------------------------------------------------

/// A version visible at a commit: a catalog tag and the number of commits
/// between it and the commit (longest path).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Anchor {
    /// Index into the [`Catalog`].
    pub tag: usize,
    pub depth: u32,
}

/// What the walk knows about one commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineageInfo {
    /// Best tag of the commit's content group, after exclusion.
    pub local: Option<usize>,
    /// Best anchor among the parents, at the parent's depth.
    pub inherited: Option<Anchor>,
    /// Best anchor at this commit. `None` when no version exists on or
    /// below the commit.
    pub best: Option<Anchor>,
    /// A parent was missing from history.
    pub shallow: bool,
}

impl LineageInfo {
    /// The best version at this commit.
    #[must_use]
    pub fn best_version<'c>(&self, catalog: &'c Catalog) -> Option<&'c Version> {
        self.best.map(|a| &catalog.tag(a.tag).version)
    }

    /// Depth below the best version (0 when there is none).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.best.map_or(0, |a| a.depth)
    }

    /// The inherited version, when it is the one this commit reports: the
    /// nearest version strictly below on the graph.
    #[must_use]
    pub fn best_below(&self) -> Option<Anchor> {
        match (self.best, self.inherited) {
            (Some(best), Some(inherited)) if best.tag == inherited.tag && best.depth > 0 => {
                Some(inherited)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Lineage
// ---------------------------------------------------------------------------

type Key = (GitOid, Option<Version>);

#[derive(Clone, Debug)]
struct Node {
    tree: GitOid,
    parents: Vec<GitOid>,
}

/// Memoized lineage queries over one catalog. Build one per resolution run.
pub struct Lineage<'a> {
    repo: &'a dyn Repository,
    catalog: &'a Catalog,
    /// `None`: the commit is not in the object database.
    nodes: HashMap<GitOid, Option<Node>>,
    memo: HashMap<Key, LineageInfo>,
}

impl<'a> Lineage<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, catalog: &'a Catalog) -> Self {
        Self {
            repo,
            catalog,
            nodes: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    /// Number of commits loaded so far.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.nodes.len()
    }

    /// Lineage of `commit`, pretending tags of version `excluded` do not
    /// exist.
    ///
    /// # Errors
    /// [`GitError::NotFound`] if `commit` itself is not in the repository;
    /// any error of the repository while reading commits.
    pub fn get(&mut self, commit: GitOid, excluded: Option<&Version>) -> Result<LineageInfo, GitError> {
        let excluded = excluded.copied();
        if let Some(info) = self.memo.get(&(commit, excluded)) {
            return Ok(info.clone());
        }
        if self.node(commit)?.is_none() {
            return Err(GitError::NotFound {
                message: format!("commit {commit} is not in the repository"),
            });
        }

        let before = self.memo.len();
        let mut stack: Vec<(GitOid, bool)> = vec![(commit, false)];
        while let Some((id, expanded)) = stack.pop() {
            let key = (id, excluded);
            if self.memo.contains_key(&key) {
                continue;
            }
            let Some(node) = self.node(id)?.cloned() else {
                continue;
            };

            if !expanded {
                stack.push((id, true));
                for parent in node.parents.iter().rev() {
                    if !self.memo.contains_key(&(*parent, excluded)) && self.node(*parent)?.is_some() {
                        stack.push((*parent, false));
                    }
                }
                continue;
            }

            let info = self.combine(&node, excluded.as_ref());
            trace!(commit = %id.short(), best = ?info.best, "lineage");
            self.memo.insert(key, info);
        }

        debug!(
            commit = %commit.short(),
            computed = self.memo.len() - before,
            loaded = self.nodes.len(),
            "lineage walk"
        );
        Ok(self.memo.get(&(commit, excluded)).cloned().unwrap_or_default())
    }

    /// Combine a commit's own tags with its parents' memoized results.
    fn combine(&self, node: &Node, excluded: Option<&Version>) -> LineageInfo {
        let mut shallow = false;
        let mut inherited: Option<Anchor> = None;
        for parent in &node.parents {
            let Some(info) = self.memo.get(&(*parent, excluded.copied())) else {
                // Missing from history.
                shallow = true;
                continue;
            };
            shallow |= info.shallow;
            if let Some(candidate) = info.best
                && inherited.is_none_or(|current| self.dominates(candidate, current))
            {
                inherited = Some(candidate);
            }
        }

        let local = self.catalog.best_in_group(node.tree, excluded);
        let best = match (local, inherited) {
            (Some(tag), Some(parent))
                if self.catalog.tag(tag).version > self.catalog.tag(parent.tag).version =>
            {
                Some(Anchor { tag, depth: 0 })
            }
            (Some(tag), None) => Some(Anchor { tag, depth: 0 }),
            (_, Some(parent)) => Some(Anchor {
                tag: parent.tag,
                depth: parent.depth.saturating_add(1),
            }),
            (None, None) => None,
        };

        LineageInfo {
            local,
            inherited,
            best,
            shallow,
        }
    }

    /// `a` beats `b`: higher version, or same version and longer path.
    fn dominates(&self, a: Anchor, b: Anchor) -> bool {
        let (va, vb) = (&self.catalog.tag(a.tag).version, &self.catalog.tag(b.tag).version);
        va.cmp(vb).then(a.depth.cmp(&b.depth)).is_gt()
    }

    fn node(&mut self, id: GitOid) -> Result<Option<&Node>, GitError> {
        if !self.nodes.contains_key(&id) {
            let node = self.repo.lookup(id)?.map(|info| Node {
                tree: info.tree_oid,
                parents: info.parents,
            });
            self.nodes.insert(id, node);
        }
        Ok(self.nodes.get(&id).and_then(Option::as_ref))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
