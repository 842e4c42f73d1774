//! Loci: dot-addressed positions in the dialogue tree.
//!
//! A locus is where an utterance attaches. The root locus renders as `"0"`
//! and children extend their parent with positive suffixes: `"0.1"`,
//! `"0.1.2"`. Internally a path stores only the suffixes below the root, so
//! the root is the empty vector. `LocusPath` orders lexicographically, which
//! makes `BTreeMap<LocusPath, _>` walk the tree depth-first.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The set of child suffixes an act instantiates at its locus.
///
/// A positive act with a ramification of more than one suffix opens an
/// additive branch point: interaction must pick exactly one branch.
pub type Ramification = BTreeSet<u32>;

/// A position in the locus tree, addressed from the root `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocusPath(Vec<u32>);

impl LocusPath {
    /// The root locus, `"0"`.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Builds a path from the suffixes below the root.
    #[must_use]
    pub fn from_suffixes(suffixes: Vec<u32>) -> Self {
        Self(suffixes)
    }

    /// Number of steps below the root. The root has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the root locus.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The child locus reached by appending `suffix`.
    #[must_use]
    pub fn child(&self, suffix: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(suffix);
        Self(segments)
    }

    /// The enclosing locus, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The last suffix, or `None` at the root.
    #[must_use]
    pub fn last_suffix(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Returns true if `self` is a (non-strict) ancestor of `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// The suffix segments below the root.
    #[must_use]
    pub fn suffixes(&self) -> &[u32] {
        &self.0
    }
}

impl Default for LocusPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for LocusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0")?;
        for segment in &self.0 {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for LocusPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ValidationError::MalformedLocusPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = s.split('.');
        match parts.next() {
            Some("0") => {}
            _ => return Err(malformed("must start with the root segment '0'")),
        }
        let mut segments = Vec::new();
        for part in parts {
            let value: u32 = part
                .parse()
                .map_err(|_| malformed("segments must be decimal integers"))?;
            if value == 0 {
                return Err(malformed("child suffixes must be positive"));
            }
            segments.push(value);
        }
        Ok(Self(segments))
    }
}
