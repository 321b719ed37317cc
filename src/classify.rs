//! Build-configuration classification.
//!
//! The resolver asks a caller-supplied classifier whether a version builds
//! as `Debug` or `Release`. [`default_classifier`] releases stable versions
//! and pre-releases at or above the branch threshold; CI builds are debug.

use std::fmt;

use gitstamp_version::{PreReleaseKind, Version};
use serde::Serialize;

use crate::ci::CiVersion;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum BuildConfiguration {
    #[default]
    Debug,
    Release,
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "Debug"),
            Self::Release => write!(f, "Release"),
        }
    }
}

/// What is being classified.
#[derive(Clone, Copy, Debug)]
pub enum Classify<'a> {
    /// A release tag, with the branch's `release_from` threshold.
    Tag {
        version: &'a Version,
        threshold: Option<PreReleaseKind>,
    },
    /// A synthesized CI build.
    Ci(&'a CiVersion),
}

/// The classifier signature the resolver takes.
pub type Classifier<'a> = &'a dyn Fn(&Classify<'_>) -> BuildConfiguration;

#[must_use]
pub fn default_classifier(subject: &Classify<'_>) -> BuildConfiguration {
    match subject {
        Classify::Tag { version, threshold } => match (version.pre, threshold) {
            (None, _) => BuildConfiguration::Release,
            (Some(pre), Some(min)) if pre.kind >= *min => BuildConfiguration::Release,
            (Some(_), _) => BuildConfiguration::Debug,
        },
        Classify::Ci(_) => BuildConfiguration::Debug,
    }
}
