//! Version catalog: every version tag of the repository, resolved to one
//! version per commit and sorted ascending.
//!
//! Built once per resolution run from [`Repository::tags`] plus the policy's
//! overridden tags:
//!
//! - names that do not parse as a [`Version`] are ignored;
//! - versions below the starting version are ignored;
//! - versions outside `single_major` are kept aside (a release tag outside
//!   the allowed major is still reported as such);
//! - the same version under several names on one commit keeps the smallest
//!   name (`1.0.0` before `v1.0.0`);
//! - distinct versions on one commit are a [`TagConflict`]: the commit is
//!   left out of the catalog.
//!
//! Tags are linked by content identity: commits that produced the same tree
//! share their tags, whatever their distance in the graph.

use std::collections::{BTreeMap, HashMap};

use gitstamp_git::{GitOid, Repository};
use gitstamp_version::Version;
use tracing::{debug, instrument, trace, warn};

use crate::config::{HEAD_OVERRIDE_KEY, Policy};
use crate::error::{Error, ErrorCode, ResolveError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The resolved version tag of one commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagCommit {
    /// The tagged commit.
    pub commit: GitOid,
    /// Its tree: the content identity.
    pub tree: GitOid,
    /// The tag name that was kept.
    pub name: String,
    pub version: Version,
}

/// Distinct versions tagged on the same commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagConflict {
    pub commit: GitOid,
    /// `(name, version)` pairs, ascending by version.
    pub tags: Vec<(String, Version)>,
}

impl TagConflict {
    fn describe(&self) -> String {
        let names: Vec<&str> = self.tags.iter().map(|(n, _)| n.as_str()).collect();
        format!("commit {} is tagged {}", self.commit.short(), names.join(", "))
    }
}

/// Ascending, conflict-free catalog of version tags.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    /// Ascending by `(version, commit)`.
    tags: Vec<TagCommit>,
    by_commit: HashMap<GitOid, usize>,
    /// Tree → ascending indexes into `tags`.
    by_tree: HashMap<GitOid, Vec<usize>>,
    conflicts: Vec<TagConflict>,
    /// Highest version outside `single_major`, per commit.
    out_of_major: HashMap<GitOid, Version>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Catalog {
    /// Build the catalog of `repo`.
    ///
    /// `head` is the commit the `head` override key designates.
    ///
    /// # Errors
    /// [`ErrorCode::InvalidOverride`] when an override key names no commit;
    /// [`Error::Git`] when the repository cannot be read.
    #[instrument(skip_all, fields(head = %head.short()))]
    pub fn build(
        repo: &dyn Repository,
        policy: &Policy,
        starting_version: Option<&Version>,
        head: GitOid,
    ) -> Result<Self, Error> {
        let mut collector = Collector {
            starting_version,
            single_major: policy.single_major,
            per_commit: BTreeMap::new(),
            out_of_major: HashMap::new(),
        };

        for (name, id) in repo.tags()? {
            collector.add(&name, id);
        }

        for (key, names) in &policy.overridden_tags {
            let id = if key == HEAD_OVERRIDE_KEY {
                head
            } else {
                match repo.resolve(key)? {
                    Some(id) if repo.lookup(id)?.is_some() => id,
                    _ => {
                        return Err(Error::resolve(
                            ErrorCode::InvalidOverride,
                            format!("override key '{key}' is neither `head` nor a known commit."),
                        ));
                    }
                }
            };
            for name in names {
                collector.add(name, id);
            }
        }

        let mut catalog = Self {
            out_of_major: collector.out_of_major,
            ..Self::default()
        };

        for (commit, versions) in collector.per_commit {
            if versions.len() > 1 {
                let conflict = TagConflict {
                    commit,
                    tags: versions.into_iter().map(|(v, n)| (n, v)).collect(),
                };
                warn!(conflict = %conflict.describe(), "multiple version tags on one commit");
                catalog.conflicts.push(conflict);
                continue;
            }
            let Some((version, name)) = versions.into_iter().next() else {
                continue;
            };
            let Some(info) = repo.lookup(commit)? else {
                debug!(%name, commit = %commit.short(), "tagged commit not in history, skipping");
                continue;
            };
            catalog.tags.push(TagCommit {
                commit,
                tree: info.tree_oid,
                name,
                version,
            });
        }

        catalog
            .tags
            .sort_by(|a, b| a.version.cmp(&b.version).then(a.commit.cmp(&b.commit)));
        for (idx, tag) in catalog.tags.iter().enumerate() {
            catalog.by_commit.insert(tag.commit, idx);
            catalog.by_tree.entry(tag.tree).or_default().push(idx);
        }

        debug!(
            tags = catalog.tags.len(),
            conflicts = catalog.conflicts.len(),
            "catalog built"
        );
        Ok(catalog)
    }
}

struct Collector<'a> {
    starting_version: Option<&'a Version>,
    single_major: Option<u32>,
    /// Commit → version → smallest name.
    per_commit: BTreeMap<GitOid, BTreeMap<Version, String>>,
    out_of_major: HashMap<GitOid, Version>,
}

impl Collector<'_> {
    fn add(&mut self, name: &str, id: GitOid) {
        let Some(version) = Version::parse(name) else {
            trace!(%name, "not a version tag");
            return;
        };
        if self.starting_version.is_some_and(|start| version < *start) {
            trace!(%name, "below starting version");
            return;
        }
        if let Some(major) = self.single_major
            && version.major != major
        {
            trace!(%name, major, "outside single major");
            let entry = self.out_of_major.entry(id).or_insert(version);
            if version > *entry {
                *entry = version;
            }
            return;
        }
        let names = self.per_commit.entry(id).or_default();
        match names.get_mut(&version) {
            Some(kept) if name < kept.as_str() => name.clone_into(kept),
            Some(_) => {}
            None => {
                names.insert(version, name.to_owned());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl Catalog {
    /// All tags, ascending.
    #[must_use]
    pub fn tags(&self) -> &[TagCommit] {
        &self.tags
    }

    #[must_use]
    pub fn tag(&self, idx: usize) -> &TagCommit {
        &self.tags[idx]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Commits left out because they carry distinct versions.
    #[must_use]
    pub fn conflicts(&self) -> &[TagConflict] {
        &self.conflicts
    }

    /// The conflict error, if any commit carries distinct versions.
    #[must_use]
    pub fn conflict_error(&self) -> Option<ResolveError> {
        if self.conflicts.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.conflicts.iter().map(TagConflict::describe).collect();
        Some(ResolveError::new(
            ErrorCode::MultipleVersionTagConflict,
            format!("conflicting version tags:\n  {}", lines.join("\n  ")),
        ))
    }

    /// The tag carried by `commit` itself.
    #[must_use]
    pub fn tag_on(&self, commit: GitOid) -> Option<&TagCommit> {
        self.by_commit.get(&commit).map(|&idx| &self.tags[idx])
    }

    /// The highest version on `commit` that `single_major` filtered out.
    #[must_use]
    pub fn out_of_major_on(&self, commit: GitOid) -> Option<&Version> {
        self.out_of_major.get(&commit)
    }

    /// Index of the best tag among commits that produced `tree`, ignoring
    /// tags of version `excluded`.
    #[must_use]
    pub fn best_in_group(&self, tree: GitOid, excluded: Option<&Version>) -> Option<usize> {
        self.by_tree
            .get(&tree)?
            .iter()
            .rev()
            .copied()
            .find(|&idx| Some(&self.tags[idx].version) != excluded)
    }

    /// The best tag that another commit with the same content already carries.
    #[must_use]
    pub fn already_existing(&self, tree: GitOid, commit: GitOid) -> Option<&TagCommit> {
        self.by_tree
            .get(&tree)?
            .iter()
            .rev()
            .map(|&idx| &self.tags[idx])
            .find(|tag| tag.commit != commit)
    }

    /// The smallest cataloged version strictly above `floor`, ignoring
    /// `excluded`.
    #[must_use]
    pub fn next_above(&self, floor: Option<&Version>, excluded: Option<&Version>) -> Option<&Version> {
        self.tags
            .iter()
            .map(|t| &t.version)
            .filter(|v| Some(*v) != excluded)
            .find(|v| floor.is_none_or(|f| *v > f))
    }

    /// Check that the existing versions form a sequence without holes.
    ///
    /// The first version must be `starting_version` when one is set, one of
    /// the first possible versions otherwise. Every version must directly
    /// follow the previous one.
    ///
    /// # Errors
    /// `CheckExistingVersionStartingVersionNotFound`,
    /// `CheckExistingVersionFirstMissing` or `CheckExistingVersionHoleFound`.
    pub fn check_existing(&self, starting_version: Option<&Version>) -> Result<(), ResolveError> {
        let mut versions: Vec<&Version> = self.tags.iter().map(|t| &t.version).collect();
        versions.dedup();
        let Some(first) = versions.first() else {
            return Ok(());
        };

        match starting_version {
            Some(start) if *first != start => {
                return Err(ResolveError::new(
                    ErrorCode::CheckExistingVersionStartingVersionNotFound,
                    format!("starting version '{start}' is not tagged; first version is '{first}'."),
                ));
            }
            None if !first.is_direct_successor_of(None) => {
                return Err(ResolveError::new(
                    ErrorCode::CheckExistingVersionFirstMissing,
                    format!("first version '{first}' is not a first possible version."),
                ));
            }
            _ => {}
        }

        for pair in versions.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if !next.is_direct_successor_of(Some(prev)) {
                return Err(ResolveError::new(
                    ErrorCode::CheckExistingVersionHoleFound,
                    format!("'{next}' does not directly follow '{prev}': version(s) missing."),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gitstamp_git::MemoryRepo;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn build(repo: &MemoryRepo, policy: &Policy, head: GitOid) -> Catalog {
        let start = policy.starting_version().unwrap();
        Catalog::build(repo, policy, start.as_ref(), head).unwrap()
    }

    fn versions(catalog: &Catalog) -> Vec<String> {
        catalog.tags().iter().map(|t| t.version.to_string()).collect()
    }

    #[test]
    fn ignores_non_versions_and_sorts() {
        let mut repo = MemoryRepo::new();
        let ids = repo.chain(GitOid::ZERO, 4);
        repo.tag("v1.1.0", ids[0]);
        repo.tag("release-candidate", ids[1]);
        repo.tag("v1.0.0", ids[2]);
        repo.tag("1.0.1-beta", ids[3]);

        let catalog = build(&repo, &Policy::default(), ids[3]);
        assert_eq!(versions(&catalog), ["1.0.0", "1.0.1-beta", "1.1.0"]);
        assert!(catalog.conflicts().is_empty());
        assert_eq!(catalog.tag_on(ids[2]).unwrap().name, "v1.0.0");
        assert!(catalog.tag_on(ids[1]).is_none());
    }

    #[test]
    fn same_version_keeps_smallest_name() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.tag("v1.0.0", c);
        repo.tag("1.0.0", c);

        let catalog = build(&repo, &Policy::default(), c);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.tags()[0].name, "1.0.0");
        assert!(catalog.conflict_error().is_none());
    }

    #[test]
    fn distinct_versions_conflict_and_drop_commit() {
        let mut repo = MemoryRepo::new();
        let a = repo.commit(&[]);
        let b = repo.commit(&[a]);
        repo.tag("v1.0.0", a);
        repo.tag("v1.1.0", b);
        repo.tag("v2.0.0", b);

        let catalog = build(&repo, &Policy::default(), b);
        assert_eq!(versions(&catalog), ["1.0.0"]);
        assert!(catalog.tag_on(b).is_none());
        assert_eq!(catalog.conflicts().len(), 1);
        assert_eq!(catalog.conflicts()[0].commit, b);
        let err = catalog.conflict_error().unwrap();
        assert_eq!(err.code, ErrorCode::MultipleVersionTagConflict);
        assert!(err.message.contains("v1.1.0, v2.0.0"), "{}", err.message);
    }

    #[test]
    fn starting_version_and_single_major_filter() {
        let mut repo = MemoryRepo::new();
        let ids = repo.chain(GitOid::ZERO, 4);
        repo.tag("v0.9.0", ids[0]);
        repo.tag("v1.0.0", ids[1]);
        repo.tag("v1.0.1", ids[2]);
        repo.tag("v2.0.0", ids[3]);

        let policy = Policy {
            starting_version: Some("1.0.0".to_owned()),
            single_major: Some(1),
            ..Policy::default()
        };
        let catalog = build(&repo, &policy, ids[3]);
        assert_eq!(versions(&catalog), ["1.0.0", "1.0.1"]);
        assert_eq!(catalog.out_of_major_on(ids[3]), Some(&v("2.0.0")));
        assert_eq!(catalog.out_of_major_on(ids[0]), None);
    }

    #[test]
    fn overrides_apply_to_head_and_sha() {
        let mut repo = MemoryRepo::new();
        let a = repo.commit(&[]);
        let b = repo.commit(&[a]);

        let mut policy = Policy::default();
        policy
            .overridden_tags
            .insert("head".to_owned(), vec!["v1.1.0".to_owned()]);
        policy
            .overridden_tags
            .insert(a.to_string(), vec!["v1.0.0".to_owned(), "junk".to_owned()]);

        let catalog = build(&repo, &policy, b);
        assert_eq!(catalog.tag_on(a).unwrap().version, v("1.0.0"));
        assert_eq!(catalog.tag_on(b).unwrap().version, v("1.1.0"));
    }

    #[test]
    fn unknown_override_key_is_invalid() {
        let mut repo = MemoryRepo::new();
        let a = repo.commit(&[]);
        let mut policy = Policy::default();
        policy
            .overridden_tags
            .insert("nowhere".to_owned(), vec!["v1.0.0".to_owned()]);

        let err = Catalog::build(&repo, &policy, None, a).unwrap_err();
        match err {
            Error::Resolve(e) => assert_eq!(e.code, ErrorCode::InvalidOverride),
            Error::Git(e) => panic!("unexpected git error: {e}"),
        }
    }

    #[test]
    fn content_groups_link_unrelated_commits() {
        let mut repo = MemoryRepo::new();
        let a = repo.commit_with_content(&[], "same");
        let b = repo.commit_with_content(&[], "same");
        let c = repo.commit_with_content(&[], "other");
        repo.tag("v1.0.0", a);

        let catalog = build(&repo, &Policy::default(), b);
        let tree = catalog.tag_on(a).unwrap().tree;
        assert_eq!(catalog.best_in_group(tree, None), Some(0));
        assert_eq!(catalog.best_in_group(tree, Some(&v("1.0.0"))), None);
        assert_eq!(catalog.already_existing(tree, b).unwrap().commit, a);
        assert!(catalog.already_existing(tree, a).is_none());

        let other = repo.lookup(c).unwrap().unwrap().tree_oid;
        assert_eq!(catalog.best_in_group(other, None), None);
    }

    #[test]
    fn next_above_skips_excluded() {
        let mut repo = MemoryRepo::new();
        let ids = repo.chain(GitOid::ZERO, 3);
        repo.tag("v1.0.0", ids[0]);
        repo.tag("v1.0.1", ids[1]);
        repo.tag("v1.1.0", ids[2]);

        let catalog = build(&repo, &Policy::default(), ids[2]);
        assert_eq!(catalog.next_above(None, None), Some(&v("1.0.0")));
        assert_eq!(catalog.next_above(Some(&v("1.0.0")), None), Some(&v("1.0.1")));
        assert_eq!(
            catalog.next_above(Some(&v("1.0.0")), Some(&v("1.0.1"))),
            Some(&v("1.1.0"))
        );
        assert_eq!(catalog.next_above(Some(&v("1.1.0")), None), None);
    }

    #[test]
    fn check_existing_detects_holes() {
        let mut repo = MemoryRepo::new();
        let ids = repo.chain(GitOid::ZERO, 2);
        repo.tag("v1.0.0", ids[0]);
        repo.tag("v1.0.2", ids[1]);
        let catalog = build(&repo, &Policy::default(), ids[1]);
        let err = catalog.check_existing(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckExistingVersionHoleFound);

        let mut repo = MemoryRepo::new();
        let ids = repo.chain(GitOid::ZERO, 2);
        repo.tag("v1.0.0", ids[0]);
        repo.tag("v1.0.1", ids[1]);
        let catalog = build(&repo, &Policy::default(), ids[1]);
        assert!(catalog.check_existing(None).is_ok());
    }

    #[test]
    fn check_existing_first_version() {
        let mut repo = MemoryRepo::new();
        let a = repo.commit(&[]);
        repo.tag("v2.0.0", a);
        let catalog = build(&repo, &Policy::default(), a);

        let err = catalog.check_existing(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckExistingVersionFirstMissing);

        assert!(catalog.check_existing(Some(&v("2.0.0"))).is_ok());
        let err = catalog.check_existing(Some(&v("1.5.0"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckExistingVersionStartingVersionNotFound);
    }

    #[test]
    fn same_version_on_two_commits_is_not_a_hole() {
        let mut repo = MemoryRepo::new();
        let ids = repo.chain(GitOid::ZERO, 3);
        repo.tag("v1.0.0", ids[0]);
        repo.tag("1.0.0", ids[1]);
        repo.tag("v1.0.1", ids[2]);
        let catalog = build(&repo, &Policy::default(), ids[2]);
        assert_eq!(catalog.len(), 3);
        assert!(catalog.check_existing(None).is_ok());
    }
}
