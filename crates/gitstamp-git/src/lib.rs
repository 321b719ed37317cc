//! Read-only repository access for gitstamp.
//!
//! This crate defines the [`Repository`] trait, the only way the version
//! engine looks at a commit graph. The engine never imports gix directly; it
//! programs against the trait and receives either a [`GixRepo`] (a real
//! repository on disk) or a [`MemoryRepo`] (an in-memory snapshot).
//!
//! # Crate layout
//!
//! - [`repo`]: the [`Repository`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`], [`CommitInfo`]).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.
//! - [`memory`]: [`MemoryRepo`], a deterministic in-memory commit graph.

pub mod error;
pub mod memory;
pub mod repo;
pub mod types;

// gix-backed implementation modules
mod gix_repo;
mod objects_impl;
mod refs_impl;
mod status_impl;

pub use gix_repo::GixRepo;

pub use error::GitError;
pub use memory::MemoryRepo;
pub use repo::Repository;
pub use types::{CommitInfo, GitOid, OidParseError};
