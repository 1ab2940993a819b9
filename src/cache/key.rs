// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Cache keys and argument normalization.
//!
//! A contract read is identified by the member name plus its normalized
//! positional arguments. The key is kept structured, so an argument that
//! happens to contain the `:` separator can never collide with a neighbouring
//! segment; the `name:arg:arg` text form is only used for display and logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used by the text form of a [`CallKey`].
pub const KEY_SEPARATOR: char = ':';

/// A positional argument for a contract call.
///
/// Path segments that are exactly `"true"` or `"false"` become booleans;
/// everything else is passed through untouched. Numbers are deliberately not
/// parsed so that large integers keep their full decimal precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    /// A `"true"` / `"false"` path segment
    Bool(bool),
    /// Any other path segment, verbatim
    Text(String),
}

impl Argument {
    /// Normalizes a single raw path segment.
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "true" => Argument::Bool(true),
            "false" => Argument::Bool(false),
            other => Argument::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Bool(value) => write!(f, "{value}"),
            Argument::Text(value) => f.write_str(value),
        }
    }
}

/// Identifies one cacheable contract read: a member name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallKey {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<Argument>,
}

impl CallKey {
    /// Key for a zero-argument constant getter.
    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Key for a function call with already-normalized arguments.
    pub fn new(name: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The contract member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized arguments, in call order.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, "{KEY_SEPARATOR}{arg}")?;
        }
        Ok(())
    }
}

/// Builds the cache key and the gateway argument vector for a function call.
///
/// Empty segments are dropped, which makes a trailing slash in the request
/// path harmless. The returned arguments are exactly the ones embedded in the
/// key, so the cached value always corresponds to the call that produced it.
///
/// # Examples
///
/// ```
/// use contract_read_cache::cache::{build_key, Argument};
///
/// let (key, args) = build_key("getLoan", &["true", "5", ""]);
/// assert_eq!(key.to_string(), "getLoan:true:5");
/// assert_eq!(args, vec![Argument::Bool(true), Argument::Text("5".into())]);
/// ```
pub fn build_key<S: AsRef<str>>(name: &str, raw_args: &[S]) -> (CallKey, Vec<Argument>) {
    let args: Vec<Argument> = raw_args
        .iter()
        .map(AsRef::as_ref)
        .filter(|segment| !segment.is_empty())
        .map(Argument::normalize)
        .collect();

    (CallKey::new(name, args.clone()), args)
}
