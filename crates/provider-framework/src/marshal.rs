//! # Marshalling
//!
//! The two conversion functions between the typed [`PropertyMap`] and the plain
//! structured data (`serde_json`) that resource implementations consume.
//!
//! Both directions are total: every property map has a plain rendering and every
//! plain object has a typed reading. What happens to the two markers that plain
//! data cannot express natively is governed by [`MarshalOptions`]:
//!
//! | Marker  | kept                                                  | not kept              |
//! |---------|-------------------------------------------------------|-----------------------|
//! | unknown | the string [`UNKNOWN_SENTINEL`]                       | property dropped      |
//! | secret  | `{ SECRET_SIG_KEY: SECRET_SIG, "value": <inner> }`    | inner value, unwrapped |
//!
//! [`from_plain`] recognises both encodings, so a kept marker survives a round trip.

use crate::value::{PropertyMap, PropertyValue};
use serde_json::{Map, Number, Value};

/// Plain structured data exchanged with resource implementations.
pub type PlainMap = Map<String, Value>;

/// Sentinel string standing in for a value that is not known yet.
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

/// Key marking a plain object as an encoded special value.
pub const SECRET_SIG_KEY: &str = "4dabf18193072939515e22adb298388d";

/// Signature value identifying an encoded secret.
pub const SECRET_SIG: &str = "1b47061264138c4ac30d75fd1eb44270";

/// Controls how markers and nulls cross the plain-data boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Drop properties whose value is `null`.
    pub skip_nulls: bool,
    /// Encode unknowns as [`UNKNOWN_SENTINEL`] instead of dropping them.
    pub keep_unknowns: bool,
    /// Encode secrets with their signature instead of unwrapping them.
    pub keep_secrets: bool,
}

impl MarshalOptions {
    /// Options for handing inputs to a resource implementation: nulls skipped,
    /// unknowns dropped, secrets unwrapped.
    pub fn implementation() -> Self {
        Self {
            skip_nulls: true,
            keep_unknowns: false,
            keep_secrets: false,
        }
    }

    /// Options that preserve every marker, for lossless transport.
    pub fn lossless() -> Self {
        Self {
            skip_nulls: false,
            keep_unknowns: true,
            keep_secrets: true,
        }
    }
}

/// Converts a property bag into plain data.
pub fn to_plain(map: &PropertyMap, opts: MarshalOptions) -> PlainMap {
    let mut plain = Map::new();
    for (key, value) in map {
        if opts.skip_nulls && value.is_null() {
            continue;
        }
        if let Some(v) = value_to_plain(value, opts) {
            plain.insert(key.clone(), v);
        }
    }
    plain
}

/// Converts a single value into plain data.
///
/// Returns `None` when the value has no rendering under `opts` (an unknown that
/// is not being kept); callers drop the enclosing property.
pub fn value_to_plain(value: &PropertyValue, opts: MarshalOptions) -> Option<Value> {
    match value {
        PropertyValue::Null => Some(Value::Null),
        PropertyValue::Bool(b) => Some(Value::Bool(*b)),
        PropertyValue::Number(n) => Some(number_to_plain(*n)),
        PropertyValue::String(s) => Some(Value::String(s.clone())),
        PropertyValue::Array(items) => Some(Value::Array(
            items
                .iter()
                // Positions matter inside arrays, so a dropped element becomes null.
                .map(|item| value_to_plain(item, opts).unwrap_or(Value::Null))
                .collect(),
        )),
        PropertyValue::Object(map) => Some(Value::Object(to_plain(map, opts))),
        PropertyValue::Unknown => opts
            .keep_unknowns
            .then(|| Value::String(UNKNOWN_SENTINEL.to_string())),
        PropertyValue::Secret(inner) => {
            let inner = value_to_plain(inner, opts)?;
            if opts.keep_secrets {
                let mut encoded = Map::new();
                encoded.insert(SECRET_SIG_KEY.to_string(), Value::String(SECRET_SIG.to_string()));
                encoded.insert("value".to_string(), inner);
                Some(Value::Object(encoded))
            } else {
                Some(inner)
            }
        }
    }
}

fn number_to_plain(n: f64) -> Value {
    // Whole numbers travel as integers so implementations can read them as such.
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// Converts plain data into a property bag, decoding encoded markers.
pub fn from_plain(map: &PlainMap) -> PropertyMap {
    map.iter()
        .map(|(key, value)| (key.clone(), value_from_plain(value)))
        .collect()
}

/// Converts a single plain value into a property value.
pub fn value_from_plain(value: &Value) -> PropertyValue {
    match value {
        Value::Null => PropertyValue::Null,
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(PropertyValue::Null, PropertyValue::Number),
        Value::String(s) if s == UNKNOWN_SENTINEL => PropertyValue::Unknown,
        Value::String(s) => PropertyValue::String(s.clone()),
        Value::Array(items) => PropertyValue::Array(items.iter().map(value_from_plain).collect()),
        Value::Object(obj) if is_encoded_secret(obj) => {
            let inner = obj.get("value").map_or(PropertyValue::Null, value_from_plain);
            PropertyValue::secret(inner)
        }
        Value::Object(obj) => PropertyValue::Object(from_plain(obj)),
    }
}

fn is_encoded_secret(obj: &PlainMap) -> bool {
    matches!(obj.get(SECRET_SIG_KEY), Some(Value::String(sig)) if sig == SECRET_SIG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PropertyMap {
        PropertyMap::from([
            ("length".to_string(), PropertyValue::from(10.0)),
            ("ratio".to_string(), PropertyValue::from(0.5)),
            ("token".to_string(), PropertyValue::secret("s3cr3t")),
            ("pending".to_string(), PropertyValue::Unknown),
            ("nothing".to_string(), PropertyValue::Null),
        ])
    }

    #[test]
    fn implementation_view_strips_markers() {
        let plain = to_plain(&sample(), MarshalOptions::implementation());
        assert_eq!(
            Value::Object(plain),
            json!({ "length": 10, "ratio": 0.5, "token": "s3cr3t" })
        );
    }

    #[test]
    fn lossless_view_round_trips() {
        let original = sample();
        let plain = to_plain(&original, MarshalOptions::lossless());

        assert_eq!(plain["pending"], json!(UNKNOWN_SENTINEL));
        assert_eq!(plain["token"][SECRET_SIG_KEY], json!(SECRET_SIG));
        assert_eq!(plain["nothing"], Value::Null);

        assert_eq!(from_plain(&plain), original);
    }

    #[test]
    fn unknown_array_elements_keep_their_position() {
        let value = PropertyValue::from(vec![PropertyValue::from("a"), PropertyValue::Unknown]);
        let plain = value_to_plain(&value, MarshalOptions::implementation());
        assert_eq!(plain, Some(json!(["a", null])));
    }

    #[test]
    fn malformed_signature_is_an_ordinary_object() {
        let plain = json!({ "x": { SECRET_SIG_KEY: "not-a-signature", "value": 1 } });
        let Value::Object(obj) = plain else { unreachable!() };
        let map = from_plain(&obj);
        assert!(matches!(map["x"], PropertyValue::Object(_)));
    }
}
