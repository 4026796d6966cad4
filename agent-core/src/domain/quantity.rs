//! Kubernetes resource quantities
//!
//! Workflow definitions carry CPU and memory as free-form strings. They are
//! checked against the Kubernetes quantity grammar before they are placed in
//! a pod spec, since the API server would reject the whole ProwJob otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;

const CPU_FALLBACK: &str = "100m";
const MEMORY_FALLBACK: &str = "128Mi";

const BINARY_SUFFIXES: [&str; 6] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_SUFFIXES: [&str; 10] = ["n", "u", "m", "", "k", "M", "G", "T", "P", "E"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("quantities must match the regular expression '^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$': \"{0}\"")]
pub struct QuantityError(pub String);

/// A validated resource quantity (`500m`, `2`, `1Gi`, `1e3`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(String);

impl Quantity {
    /// Parse a quantity, rejecting anything the API server would not accept
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let invalid = || QuantityError(input.to_string());

        let unsigned = input
            .strip_prefix('+')
            .or_else(|| input.strip_prefix('-'))
            .unwrap_or(input);

        let number_len = unsigned
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .count();
        let (number, suffix) = unsigned.split_at(number_len);

        if !is_decimal(number) {
            return Err(invalid());
        }
        if !is_suffix(suffix) {
            return Err(invalid());
        }

        Ok(Self(input.to_string()))
    }

    /// Parse a configured quantity, falling back to a conservative default
    /// when the string is not a valid quantity. An empty string means zero.
    pub fn parse_or_fallback(input: &str) -> Self {
        if input.is_empty() {
            return Self::zero();
        }

        match Self::parse(input) {
            Ok(quantity) => quantity,
            Err(e) => {
                let fallback = fallback_for(input);
                tracing::warn!(
                    "Failed to parse resource quantity '{}': {}. Using fallback value {}.",
                    input,
                    e,
                    fallback
                );
                Self(fallback.to_string())
            }
        }
    }

    pub fn zero() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick a fallback by sniffing the unparsable string for unit hints
fn fallback_for(input: &str) -> &'static str {
    let lower = input.to_lowercase();
    let has_binary_hint = lower.contains("mi") || lower.contains("gi") || lower.contains("ti");

    if lower.contains("cpu") || lower.contains("core") || (lower.contains('m') && !has_binary_hint)
    {
        CPU_FALLBACK
    } else if lower.contains("memory") || has_binary_hint || lower.contains("byte") {
        MEMORY_FALLBACK
    } else {
        CPU_FALLBACK
    }
}

fn is_decimal(number: &str) -> bool {
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");

    !(whole.is_empty() && frac.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn is_suffix(suffix: &str) -> bool {
    if BINARY_SUFFIXES.contains(&suffix) || DECIMAL_SUFFIXES.contains(&suffix) {
        return true;
    }

    // Decimal exponent form: e3, E-2, e+6
    let Some(exponent) = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
    else {
        return false;
    };
    let digits = exponent
        .strip_prefix('+')
        .or_else(|| exponent.strip_prefix('-'))
        .unwrap_or(exponent);

    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
