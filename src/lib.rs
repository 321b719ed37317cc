//! gitstamp library crate.
//!
//! Computes the version of a commit from the repository's version tags, its
//! ancestry and a small policy: the commit's own release tag when it is a
//! legal next version, otherwise a CI pseudo-version for its branch.
//!
//! ```
//! use gitstamp::{Policy, default_classifier, resolve};
//! use gitstamp_git::MemoryRepo;
//!
//! let mut repo = MemoryRepo::new();
//! let root = repo.commit(&[]);
//! repo.tag("v1.0.0", root);
//! repo.branch("main", root);
//! repo.checkout("main");
//!
//! let result = resolve(&repo, &Policy::default(), &default_classifier).unwrap();
//! assert_eq!(result.final_version, "1.0.0");
//! ```

pub mod catalog;
pub mod ci;
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod lineage;
pub mod resolve;
pub mod telemetry;
pub mod window;

pub use classify::{BuildConfiguration, Classify, default_classifier};
pub use config::{BranchPolicy, CiMode, Policy};
pub use error::{ErrorCode, ResolveError};
pub use resolve::{ResolutionResult, resolve};
