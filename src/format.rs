use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::resolve::ResolutionResult;

/// Output format for structured data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text for build logs
    #[default]
    Text,
    /// JSON - machine-parseable
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => bail!("Invalid format '{s}'. Use: text or json"),
        }
    }
}

impl OutputFormat {
    /// Serialize data to the requested format
    pub fn serialize<T: Serialize>(self, data: &T) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(data)
                .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}")),
            Self::Text => {
                // Text format shouldn't use this path - caller should return raw text
                bail!("Text format should not use serialize()")
            }
        }
    }

    /// Render a resolution result.
    pub fn result(self, result: &ResolutionResult) -> Result<String> {
        match self {
            Self::Json => self.serialize(result),
            Self::Text => Ok(result_text(result)),
        }
    }

    /// Render the tag catalog.
    pub fn catalog(self, catalog: &Catalog) -> Result<String> {
        match self {
            Self::Json => self.serialize(&CatalogView::new(catalog)),
            Self::Text => Ok(catalog_text(catalog)),
        }
    }
}

fn versions_line(versions: &[gitstamp_version::Version]) -> String {
    if versions.is_empty() {
        return "none".to_owned();
    }
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn result_text(r: &ResolutionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Version:       {}", r.final_version);
    let _ = writeln!(out, "Informational: {}", r.informational_version);
    let _ = writeln!(out, "Configuration: {}", r.build_configuration);
    if let Some(commit) = &r.commit {
        let _ = writeln!(out, "Commit:        {commit}");
    }
    if let Some(branch) = &r.branch {
        let _ = writeln!(out, "Branch:        {branch}");
    }
    if let Some(tag) = &r.release_tag {
        let _ = writeln!(out, "Release tag:   {}", tag.name);
    }
    if let Some(ci) = &r.ci_version {
        let base = ci.base.map_or_else(|| "none".to_owned(), |b| b.to_string());
        let _ = writeln!(out, "CI base:       {base} (depth {})", ci.depth);
    }
    if let Some(below) = &r.best_commit_below {
        let _ = writeln!(out, "Below:         {} ({})", below.name, short(&below.commit));
    }
    if let Some(existing) = &r.already_existing_version {
        let _ = writeln!(
            out,
            "Same content:  {} ({})",
            existing.name,
            short(&existing.commit)
        );
    }
    let _ = writeln!(out, "Possible:      {}", versions_line(&r.possible_versions));
    let _ = writeln!(out, "Next possible: {}", versions_line(&r.next_possible_versions));
    if r.shallow {
        let _ = writeln!(out, "Warning:       shallow history, older versions may be hidden");
    }
    if let Some(err) = &r.error {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error: {err}");
    }
    out
}

fn short(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn catalog_text(catalog: &Catalog) -> String {
    let mut out = String::new();
    if catalog.is_empty() {
        let _ = writeln!(out, "No version tags.");
    }
    for tag in catalog.tags() {
        let _ = writeln!(
            out,
            "{:<16} {:<24} {}",
            tag.version.to_string(),
            tag.name,
            tag.commit.short()
        );
    }
    for conflict in catalog.conflicts() {
        let names: Vec<&str> = conflict.tags.iter().map(|(n, _)| n.as_str()).collect();
        let _ = writeln!(
            out,
            "CONFLICT         {:<24} {}",
            names.join(", "),
            conflict.commit.short()
        );
    }
    out
}

#[derive(Serialize)]
struct CatalogView {
    tags: Vec<TagView>,
    conflicts: Vec<ConflictView>,
}

#[derive(Serialize)]
struct TagView {
    version: String,
    name: String,
    commit: String,
    tree: String,
}

#[derive(Serialize)]
struct ConflictView {
    commit: String,
    names: Vec<String>,
}

impl CatalogView {
    fn new(catalog: &Catalog) -> Self {
        Self {
            tags: catalog
                .tags()
                .iter()
                .map(|t| TagView {
                    version: t.version.to_string(),
                    name: t.name.clone(),
                    commit: t.commit.to_string(),
                    tree: t.tree.to_string(),
                })
                .collect(),
            conflicts: catalog
                .conflicts()
                .iter()
                .map(|c| ConflictView {
                    commit: c.commit.to_string(),
                    names: c.tags.iter().map(|(n, _)| n.clone()).collect(),
                })
                .collect(),
        }
    }
}
