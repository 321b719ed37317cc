use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed, ordered list of pre-release names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreReleaseKind {
    Alpha,
    Beta,
    Delta,
    Epsilon,
    Gamma,
    Kappa,
    Pre,
    Rc,
}

impl PreReleaseKind {
    /// Every kind, in ascending order.
    pub const ALL: [Self; 8] = [
        Self::Alpha,
        Self::Beta,
        Self::Delta,
        Self::Epsilon,
        Self::Gamma,
        Self::Kappa,
        Self::Pre,
        Self::Rc,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Delta => "delta",
            Self::Epsilon => "epsilon",
            Self::Gamma => "gamma",
            Self::Kappa => "kappa",
            Self::Pre => "pre",
            Self::Rc => "rc",
        }
    }

    /// Kinds strictly greater than `self`.
    pub fn above(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |k| *k > self)
    }
}

impl fmt::Display for PreReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreReleaseKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_ordered() {
        let mut sorted = PreReleaseKind::ALL;
        sorted.sort();
        assert_eq!(sorted, PreReleaseKind::ALL);
    }

    #[test]
    fn above_excludes_self() {
        let above: Vec<_> = PreReleaseKind::Kappa.above().collect();
        assert_eq!(above, vec![PreReleaseKind::Pre, PreReleaseKind::Rc]);
        assert_eq!(PreReleaseKind::Rc.above().count(), 0);
    }

    #[test]
    fn parse_names() {
        for kind in PreReleaseKind::ALL {
            assert_eq!(kind.as_str().parse::<PreReleaseKind>(), Ok(kind));
        }
        assert!("RC".parse::<PreReleaseKind>().is_err());
        assert!("prerelease".parse::<PreReleaseKind>().is_err());
    }
}
