// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Allow-list of contract members reachable over HTTP.

use std::collections::{BTreeMap, BTreeSet};

use alloy_json_abi::{JsonAbi, StateMutability};

use crate::errors::ProxyError;

/// How a member may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// `/v1/constant/{name}`
    Constant,
    /// `/v1/request/{name}/...` with this many arguments
    Function {
        /// Number of ABI inputs
        arity: usize,
    },
}

/// The set of read-only contract members the proxy will invoke.
///
/// Requests for anything else are rejected before the gateway is reached.
/// Constants are zero-input `view`/`pure` functions; every `view`/`pure`
/// function, constants included, may also be requested as a function call.
/// Overloads are tracked by arity.
///
/// # Examples
///
/// ```
/// use contract_read_cache::gateway::MemberTable;
///
/// let members = MemberTable::default()
///     .with_constant("totalSupply")
///     .with_function("getLoan", 2);
///
/// assert!(members.check_constant("totalSupply").is_ok());
/// assert!(members.check_function("getLoan", 2).is_ok());
/// assert!(members.check_function("getLoan", 1).is_err());
/// assert!(members.check_constant("transfer").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemberTable {
    constants: BTreeSet<String>,
    functions: BTreeMap<String, BTreeSet<usize>>,
}

impl MemberTable {
    /// Builds the table from every `view` and `pure` function in the ABI.
    pub fn from_abi(abi: &JsonAbi) -> Self {
        let mut table = Self::default();
        for function in abi.functions() {
            if !matches!(
                function.state_mutability,
                StateMutability::View | StateMutability::Pure
            ) {
                continue;
            }
            if function.inputs.is_empty() {
                table = table.with_constant(&function.name);
            } else {
                table = table.with_function(&function.name, function.inputs.len());
            }
        }
        table
    }

    /// Allows `name` as a constant (and as a zero-argument function call).
    #[must_use]
    pub fn with_constant(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.functions.entry(name.clone()).or_default().insert(0);
        self.constants.insert(name);
        self
    }

    /// Allows `name` as a function call taking `arity` arguments.
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.functions.entry(name.into()).or_default().insert(arity);
        self
    }

    /// Rejects `name` unless it is an allowed constant.
    pub fn check_constant(&self, name: &str) -> Result<MemberKind, ProxyError> {
        if self.constants.contains(name) {
            Ok(MemberKind::Constant)
        } else {
            Err(ProxyError::unknown_member(name))
        }
    }

    /// Rejects `name` unless it is an allowed function taking `args` arguments.
    pub fn check_function(&self, name: &str, args: usize) -> Result<MemberKind, ProxyError> {
        let arities = self
            .functions
            .get(name)
            .ok_or_else(|| ProxyError::unknown_member(name))?;

        if arities.contains(&args) {
            return Ok(MemberKind::Function { arity: args });
        }

        // Report the overload closest to what was supplied.
        let expected = arities
            .iter()
            .copied()
            .min_by_key(|arity| arity.abs_diff(args))
            .unwrap_or_default();

        Err(ProxyError::InvalidArguments {
            member: name.to_string(),
            expected,
            got: args,
        })
    }

    /// Number of allowed constants.
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    /// Number of allowed function names.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
