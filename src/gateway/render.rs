// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical string form of decoded contract outputs.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::hex;
use serde_json::Value;

/// Renders decoded outputs as the string stored in the cache.
///
/// A single scalar output is rendered bare: integers in decimal, addresses
/// checksummed, bytes as `0x`-prefixed hex. Multiple outputs, arrays and
/// tuples are rendered as a JSON array whose scalar leaves follow the same
/// rules (integers stay strings so no precision is lost).
///
/// # Examples
///
/// ```
/// use alloy_dyn_abi::DynSolValue;
/// use alloy_primitives::U256;
/// use contract_read_cache::gateway::render_outputs;
///
/// let supply = DynSolValue::Uint(U256::from(1_000_000u64), 256);
/// assert_eq!(render_outputs(&[supply]), "1000000");
/// ```
pub fn render_outputs(outputs: &[DynSolValue]) -> String {
    match outputs {
        [single] => render_value(single),
        many => Value::Array(many.iter().map(to_json).collect()).to_string(),
    }
}

fn render_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Array(_) | DynSolValue::FixedArray(_) | DynSolValue::Tuple(_) => {
            to_json(value).to_string()
        }
        scalar => render_scalar(scalar),
    }
}

fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        scalar => Value::String(render_scalar(scalar)),
    }
}

fn render_scalar(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        other => format!("{other:?}"),
    }
}
