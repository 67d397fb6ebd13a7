//! Total coercions from untrusted JSON into well-shaped primitives.
//!
//! Nothing in this module fails. Every function returns a valid value for any
//! input, falling back to an empty or zero default. The migration chain and
//! the typed profile both lean on these so a corrupted save degrades one
//! field at a time instead of being rejected wholesale.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

/// `true` for a JSON object (arrays and scalars are not "plain objects").
#[must_use]
pub fn is_plain_object(v: &Value) -> bool {
    v.is_object()
}

/// Trimmed string content, or `None` for non-strings and blank strings.
#[must_use]
pub fn non_empty_string(v: &Value) -> Option<String> {
    let s = v.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// A finite JSON number, or `None`. Strings are not coerced.
#[must_use]
pub fn finite_number(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

/// Coerce numbers, numeric strings and booleans to a finite number.
#[must_use]
pub fn coerce_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Floor `n` and clamp it into `[min, max]`. Non-finite input maps to `min`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn clamp_int(n: f64, min: i64, max: i64) -> i64 {
    if !n.is_finite() {
        return min;
    }
    let floored = n.floor();
    if floored <= min as f64 {
        min
    } else if floored >= max as f64 {
        max
    } else {
        floored as i64
    }
}

/// Like [`clamp_int`] for a non-negative range, returning `u64`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn clamp_u64(n: f64, max: u64) -> u64 {
    let max = i64::try_from(max).unwrap_or(i64::MAX);
    clamp_int(n, 0, max) as u64
}

/// Keep the trimmed, non-empty string elements of an array, first occurrence
/// wins, original order preserved. Non-arrays yield an empty list.
#[must_use]
pub fn sanitize_string_list(v: &Value) -> Vec<String> {
    let Some(items) = v.as_array() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(non_empty_string)
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Keep entries whose key and value are both non-empty strings after trimming.
#[must_use]
pub fn sanitize_string_map(v: &Value) -> BTreeMap<String, String> {
    let Some(obj) = v.as_object() else {
        return BTreeMap::new();
    };
    obj.iter()
        .filter_map(|(k, v)| {
            let key = k.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), non_empty_string(v)?))
        })
        .collect()
}

/// Coerce every value to a finite number clamped at zero, dropping entries
/// that do not produce one.
#[must_use]
pub fn sanitize_non_negative_number_map(v: &Value) -> BTreeMap<String, f64> {
    let Some(obj) = v.as_object() else {
        return BTreeMap::new();
    };
    obj.iter()
        .filter_map(|(k, v)| {
            let key = k.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), coerce_number(v)?.max(0.0)))
        })
        .collect()
}

/// Lenient `deserialize_with` helpers for the typed profile.
///
/// Each helper accepts any JSON at its position and substitutes a default for
/// whatever it cannot understand.
pub mod lenient {
    use std::collections::BTreeMap;

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use crate::types::AttributeId;

    /// Decode as `T`, or fall back to `T::default()`.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let v = Value::deserialize(d)?;
        Ok(serde_json::from_value(v).unwrap_or_default())
    }

    /// A non-negative integer counter; fractions are floored, garbage is 0.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn counter<'de, D>(d: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::finite_number(&v).map_or(0, |n| super::clamp_u64(n, u64::MAX)))
    }

    /// A finite number, 0 otherwise.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn number<'de, D>(d: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::finite_number(&v).unwrap_or(0.0))
    }

    /// A finite number clamped at zero.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn non_negative<'de, D>(d: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        number(d).map(|n| n.max(0.0))
    }

    /// An optional finite number.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn optional_number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::finite_number(&v))
    }

    /// An optional trimmed, non-empty string.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn optional_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::non_empty_string(&v))
    }

    /// An optional attribute; unknown names become `None`.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn optional_attribute<'de, D>(d: D) -> Result<Option<AttributeId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::non_empty_string(&v).and_then(|s| s.parse().ok()))
    }

    /// See [`super::sanitize_string_list`].
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn string_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::sanitize_string_list(&v))
    }

    /// See [`super::sanitize_string_map`].
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn string_map<'de, D>(d: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::sanitize_string_map(&v))
    }

    /// See [`super::sanitize_non_negative_number_map`].
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn number_map<'de, D>(d: D) -> Result<BTreeMap<String, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        Ok(super::sanitize_non_negative_number_map(&v))
    }

    /// A map whose values are each sanitized string maps.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn nested_string_map<'de, D>(
        d: D,
    ) -> Result<BTreeMap<String, BTreeMap<String, String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(d)?;
        let Some(obj) = v.as_object() else {
            return Ok(BTreeMap::new());
        };
        Ok(obj
            .iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| (k.trim().to_string(), super::sanitize_string_map(v)))
            .collect())
    }

    /// Keep the array elements that decode as `T`, dropping the rest.
    ///
    /// # Errors
    /// Only fails if the input is not valid JSON at all.
    pub fn filtered_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let v = Value::deserialize(d)?;
        let Value::Array(items) = v else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_list_dedupes_and_trims() {
        let v = json!([" a ", "b", "a", "", 3, null, "  ", "c", "b"]);
        assert_eq!(sanitize_string_list(&v), vec!["a", "b", "c"]);
    }

    #[test]
    fn string_list_rejects_non_arrays() {
        assert!(sanitize_string_list(&json!({"a": 1})).is_empty());
        assert!(sanitize_string_list(&json!("abc")).is_empty());
        assert!(sanitize_string_list(&Value::Null).is_empty());
    }

    #[test]
    fn string_map_keeps_only_string_pairs() {
        let v = json!({"g1": " n1 ", "g2": "", "g3": 4, " ": "x", "g4": "n4"});
        let m = sanitize_string_map(&v);
        assert_eq!(m.len(), 2);
        assert_eq!(m["g1"], "n1");
        assert_eq!(m["g4"], "n4");
        assert!(sanitize_string_map(&json!(["g1"])).is_empty());
    }

    #[test]
    fn number_map_coerces_and_clamps() {
        let v = json!({"a": 2.5, "b": -3, "c": "7", "d": "abc", "e": null, "f": true});
        let m = sanitize_non_negative_number_map(&v);
        assert_eq!(m.get("a"), Some(&2.5));
        assert_eq!(m.get("b"), Some(&0.0));
        assert_eq!(m.get("c"), Some(&7.0));
        assert_eq!(m.get("f"), Some(&1.0));
        assert!(!m.contains_key("d"));
        assert!(!m.contains_key("e"));
    }

    #[test]
    fn clamp_int_floors_and_bounds() {
        assert_eq!(clamp_int(3.9, 0, 10), 3);
        assert_eq!(clamp_int(-5.0, 0, 10), 0);
        assert_eq!(clamp_int(1e30, 0, 10), 10);
        assert_eq!(clamp_int(f64::NAN, 1, 10), 1);
    }
}
