//! Effective version resolution
//!
//! A version-agnostic read or delete acts on exactly one stored version of a
//! business key: the *effective* one. Which tag that is depends on the
//! deployment's [`ResolutionPolicy`].
//!
//! ## CreationOrder (default)
//!
//! The most recently **created** tag wins. Updating an older tag does not
//! promote it; erasing the winner uncovers the next most recent creation.
//! Writes `"1"`, `"2"`, `"10"` resolve to `"10"`; writes `"R2"`, `"R1"`
//! resolve to `"R1"`.
//!
//! ## LexicalOrder
//!
//! The byte-wise greatest tag wins, regardless of write order. `"9"` beats
//! `"10"`: tags are opaque strings and are never parsed as numbers.

use std::fmt;

use grantstate_core::{StateError, StateResult, VersionTag};
use serde::{Deserialize, Serialize};

/// How the effective version of a key is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Most recently created tag wins
    #[default]
    CreationOrder,
    /// Greatest tag by byte-wise string ordering wins
    LexicalOrder,
}

impl ResolutionPolicy {
    /// Parse a policy name as written in configuration
    ///
    /// # Errors
    ///
    /// Returns `MalformedRequest` for anything other than `"creation_order"`
    /// or `"lexical_order"`.
    pub fn parse(s: &str) -> StateResult<Self> {
        match s {
            "creation_order" => Ok(ResolutionPolicy::CreationOrder),
            "lexical_order" => Ok(ResolutionPolicy::LexicalOrder),
            other => Err(StateError::malformed(format!(
                "unknown resolution policy '{}', expected \"creation_order\" or \"lexical_order\"",
                other
            ))),
        }
    }

    /// Configuration name of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPolicy::CreationOrder => "creation_order",
            ResolutionPolicy::LexicalOrder => "lexical_order",
        }
    }

    /// Pick the effective tag from `tags`, given oldest creation first
    ///
    /// Returns `None` only when `tags` is empty.
    pub fn resolve<'a>(&self, tags: &'a [VersionTag]) -> Option<&'a VersionTag> {
        match self {
            ResolutionPolicy::CreationOrder => tags.last(),
            ResolutionPolicy::LexicalOrder => tags.iter().max_by(|a, b| a.as_str().cmp(b.as_str())),
        }
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
