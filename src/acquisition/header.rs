// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Text header of self-describing containers
//!
//! The header is a list of `key = value` lines. Values carry engineering
//! suffixes (`k`, `m`, `u`, `M`) which are rewritten into exponents before
//! any numeric parsing happens.

use std::collections::BTreeMap;

use super::DecodeError;

/// Rewrite engineering suffixes into exponent notation.
///
/// Every occurrence is substituted, in this order: `k` → `e3`, `m` → `e-3`,
/// `u` → `e-6`, then `M` → `e6` only if the value contains neither `AM` nor
/// `PM` (those values are clock times). The rule is purely textual and case
/// sensitive, so a value such as `"Hamming"` is rewritten as well.
///
/// # Example
///
/// ```
/// use rust_iqtools::acquisition::header::expand_unit_suffixes;
///
/// assert_eq!(expand_unit_suffixes("1m"), "1e-3");
/// assert_eq!(expand_unit_suffixes("2.5M"), "2.5e6");
/// assert_eq!(expand_unit_suffixes("01/01/2020 12:00:00 PM"), "01/01/2020 12:00:00 PM");
/// ```
pub fn expand_unit_suffixes(value: &str) -> String {
    let value = value
        .replace('k', "e3")
        .replace('m', "e-3")
        .replace('u', "e-6");
    if value.contains("PM") || value.contains("AM") {
        value
    } else {
        value.replace('M', "e6")
    }
}

/// Transient key/value view of a container header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderDictionary {
    entries: BTreeMap<String, String>,
}

impl HeaderDictionary {
    /// Parse newline separated `key = value` records.
    ///
    /// Keys and values are trimmed, values go through
    /// [`expand_unit_suffixes`]. A line without `=` is kept with an empty
    /// value, blank lines are ignored. A repeated key keeps its last value.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let (name, value) = match line.split_once('=') {
                Some((name, value)) => (name, value),
                None => (line, ""),
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            entries.insert(name.to_string(), expand_unit_suffixes(value.trim()));
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Fetch a key that must be present
    pub fn require_str(&self, key: &str) -> Result<&str, DecodeError> {
        self.get(key)
            .ok_or_else(|| DecodeError::MissingKey(key.to_string()))
    }

    /// Fetch a required floating point field
    pub fn require_f64(&self, key: &str) -> Result<f64, DecodeError> {
        let raw = self.require_str(key)?;
        raw.parse::<f64>().map_err(|_| DecodeError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    /// Fetch a required non-negative integer field.
    ///
    /// Exponent notation produced by suffix expansion (`"1e3"`) is accepted
    /// as long as it denotes a whole number.
    pub fn require_usize(&self, key: &str) -> Result<usize, DecodeError> {
        let raw = self.require_str(key)?;
        let invalid = || DecodeError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        };
        if let Ok(v) = raw.parse::<usize>() {
            return Ok(v);
        }
        let v = raw.parse::<f64>().map_err(|_| invalid())?;
        if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
            Ok(v as usize)
        } else {
            Err(invalid())
        }
    }

    /// Fetch an optional floating point field, ignoring unparsable values
    pub fn optional_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse::<f64>().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
