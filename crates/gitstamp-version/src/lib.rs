//! Totally ordered release versions.
//!
//! A [`Version`] is `MAJOR.MINOR.PATCH` with an optional pre-release
//! (`-alpha`, `-beta.3`, `-rc`). The pre-release names are a fixed, ordered
//! list ([`PreReleaseKind`]) so that every version has a finite, enumerable
//! set of **direct successors**: the versions that may legally be released
//! right after it without leaving a hole.
//!
//! The crate also owns the textual forms of the two CI pseudo-versions:
//!
//! - [`Version::ci_build`], anchored to a release: `1.0.1--0003-develop`.
//! - [`zero_timed`], anchored to time: `0.0.0--0n0f3kq-develop+1.0.0`.
//!
//! Both sort before any real pre-release of the version they lead to, because
//! `-` sorts before letters and digits in semver pre-release comparison.

mod kind;
mod version;

pub use kind::PreReleaseKind;
pub use version::{PreRelease, Version, VersionParseError};

use chrono::{DateTime, Utc};

/// The well-known zero value reported when no version could be computed.
pub const ZERO_VERSION: &str = "0.0.0-0";

/// Width of the base-36 time code in zero-timed versions.
const TIME_CODE_WIDTH: usize = 7;

/// Format a time-anchored CI version.
///
/// The code is the UTC time in seconds since the Unix epoch, in fixed-width
/// lowercase base 36, so lexical order follows time. `base` is appended as
/// build metadata: it traces the last release but never affects ordering.
#[must_use]
pub fn zero_timed(label: &str, time: DateTime<Utc>, base: Option<&Version>) -> String {
    let seconds = u64::try_from(time.timestamp()).unwrap_or(0);
    let code = base36(seconds, TIME_CODE_WIDTH);
    match base {
        Some(v) => format!("0.0.0--{code}-{label}+{v}"),
        None => format!("0.0.0--{code}-{label}"),
    }
}

fn base36(mut n: u64, width: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::with_capacity(width);
    while n > 0 {
        out.push(DIGITS[usize::try_from(n % 36).unwrap_or(0)]);
        n /= 36;
    }
    while out.len() < width {
        out.push(b'0');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
