//! # Property Values
//!
//! The typed value model used at the edges of the lifecycle dispatcher.
//!
//! A [`PropertyValue`] is self-describing: besides the usual JSON-like shapes it can
//! carry two markers that plain data cannot express directly:
//!
//! - [`PropertyValue::Unknown`] - the value will only exist after an operation runs
//!   (for example an output of a resource that has not been created yet). It must
//!   survive validation and diffing without being mistaken for `null`.
//! - [`PropertyValue::Secret`] - wraps any other value. The engine preserves the tag
//!   through marshalling and never renders the wrapped value in `Debug` output, so
//!   structured logs cannot leak it.
//!
//! A [`PropertyMap`] (a "property bag") maps property names to values. It is a
//! `BTreeMap`, so iteration order is deterministic and independent of how the bag
//! was built.

use std::collections::BTreeMap;
use std::fmt;

/// A named, typed collection of values describing a resource's inputs or outputs.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single property value.
#[derive(Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
    /// Not yet computed. Known only once the owning operation completes.
    Unknown,
    /// Sensitive value. Never logged or persisted in clear form by collaborators.
    Secret(Box<PropertyValue>),
}

impl PropertyValue {
    /// Wraps `value` as a secret. Already-secret values are returned unchanged.
    pub fn secret(value: impl Into<PropertyValue>) -> Self {
        match value.into() {
            secret @ PropertyValue::Secret(_) => secret,
            other => PropertyValue::Secret(Box::new(other)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PropertyValue::Unknown)
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, PropertyValue::Secret(_))
    }

    /// Whether this value, or anything nested inside it, is unknown.
    pub fn contains_unknowns(&self) -> bool {
        match self {
            PropertyValue::Unknown => true,
            PropertyValue::Secret(inner) => inner.contains_unknowns(),
            PropertyValue::Array(items) => items.iter().any(PropertyValue::contains_unknowns),
            PropertyValue::Object(map) => map.values().any(PropertyValue::contains_unknowns),
            _ => false,
        }
    }

    /// Whether this value, or anything nested inside it, is secret.
    pub fn contains_secrets(&self) -> bool {
        match self {
            PropertyValue::Secret(_) => true,
            PropertyValue::Array(items) => items.iter().any(PropertyValue::contains_secrets),
            PropertyValue::Object(map) => map.values().any(PropertyValue::contains_secrets),
            _ => false,
        }
    }

    /// Peels every secret layer and returns the innermost value.
    pub fn unsecret(&self) -> &PropertyValue {
        match self {
            PropertyValue::Secret(inner) => inner.unsecret(),
            other => other,
        }
    }

    /// A copy with every secret layer removed, at any depth.
    pub fn without_secrets(&self) -> PropertyValue {
        match self {
            PropertyValue::Secret(inner) => inner.without_secrets(),
            PropertyValue::Array(items) => {
                PropertyValue::Array(items.iter().map(PropertyValue::without_secrets).collect())
            }
            PropertyValue::Object(map) => PropertyValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.without_secrets()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Re-applies the secret tags of `source` to the same positions in `self`.
    ///
    /// Walks objects by key and arrays by index. A position that was secret in
    /// `source` is wrapped whole; positions `source` does not have are left as
    /// they are.
    pub fn with_secrets_from(self, source: &PropertyValue) -> PropertyValue {
        match (self, source) {
            (value, PropertyValue::Secret(_)) if !value.is_null() => PropertyValue::secret(value),
            (PropertyValue::Object(map), PropertyValue::Object(shape)) => PropertyValue::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        let v = match shape.get(&k) {
                            Some(s) => v.with_secrets_from(s),
                            None => v,
                        };
                        (k, v)
                    })
                    .collect(),
            ),
            (PropertyValue::Array(items), PropertyValue::Array(shape)) => PropertyValue::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| match shape.get(i) {
                        Some(s) => v.with_secrets_from(s),
                        None => v,
                    })
                    .collect(),
            ),
            (value, _) => value,
        }
    }

    /// Name of the value's shape, as used in validation messages.
    ///
    /// Secrets report the shape of the value they wrap.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Object(_) => "object",
            PropertyValue::Unknown => "unknown",
            PropertyValue::Secret(inner) => inner.type_name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Deep structural equality with diff semantics.
    ///
    /// Differs from `==` in two ways:
    /// - `Unknown` is never equal to anything, not even another `Unknown`, so a
    ///   pending value is always re-evaluated once it becomes known.
    /// - Secrets compare on their unwrapped value, but a secret is never equal to
    ///   a non-secret, since the visibility of the value changed.
    pub fn deep_equals(&self, other: &PropertyValue) -> bool {
        use PropertyValue::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) => false,
            (Secret(a), Secret(b)) => a.deep_equals(b),
            (Secret(_), _) | (_, Secret(_)) => false,
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.deep_equals(y))
            }
            (Object(a), Object(b)) => maps_deep_equal(a, b),
            _ => false,
        }
    }

    /// Renders the value as one fragment of a resource identity.
    ///
    /// Only plain scalars qualify. Whole numbers render without a fractional part
    /// (`10.0` becomes `"10"`). Secrets are refused because identities are logged
    /// and stored in clear.
    pub fn identity_fragment(&self) -> Option<String> {
        match self {
            PropertyValue::String(s) if !s.is_empty() => Some(s.clone()),
            PropertyValue::Number(n) if n.is_finite() => Some(format_number(*n)),
            PropertyValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Deep equality of two property bags: same key set, every value [`deep_equals`].
///
/// [`deep_equals`]: PropertyValue::deep_equals
pub fn maps_deep_equal(a: &PropertyMap, b: &PropertyMap) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| value.deep_equals(other)))
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => f.write_str(&format_number(*n)),
            PropertyValue::String(s) => write!(f, "{s:?}"),
            PropertyValue::Array(items) => f.debug_list().entries(items).finish(),
            PropertyValue::Object(map) => f.debug_map().entries(map).finish(),
            PropertyValue::Unknown => f.write_str("<unknown>"),
            PropertyValue::Secret(_) => f.write_str("<secret>"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Number(f64::from(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(value)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        PropertyValue::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_never_deep_equals() {
        assert!(!PropertyValue::Unknown.deep_equals(&PropertyValue::Unknown));
        assert!(!PropertyValue::Unknown.deep_equals(&PropertyValue::Null));
        // Structural equality still treats the markers as the same shape.
        assert_eq!(PropertyValue::Unknown, PropertyValue::Unknown);
    }

    #[test]
    fn secrets_compare_on_inner_value_and_visibility() {
        let plain = PropertyValue::from("hunter2");
        let secret = PropertyValue::secret("hunter2");

        assert!(secret.deep_equals(&PropertyValue::secret("hunter2")));
        assert!(!secret.deep_equals(&PropertyValue::secret("hunter3")));
        assert!(!secret.deep_equals(&plain));
        assert!(!plain.deep_equals(&secret));
    }

    #[test]
    fn nested_values_compare_structurally() {
        let a = PropertyValue::from(vec![
            PropertyValue::from(1.0),
            PropertyValue::from(PropertyMap::from([("k".to_string(), "v".into())])),
        ]);
        let b = a.clone();
        let c = PropertyValue::from(vec![PropertyValue::from(1.0), PropertyValue::Unknown]);

        assert!(a.deep_equals(&b));
        assert!(!a.deep_equals(&c));
        assert!(c.contains_unknowns());
    }

    #[test]
    fn debug_redacts_secrets() {
        let map = PropertyMap::from([
            ("password".to_string(), PropertyValue::secret("hunter2")),
            ("length".to_string(), PropertyValue::from(8.0)),
        ]);
        let rendered = format!("{:?}", map);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<secret>"));
        assert!(rendered.contains("\"length\": 8"));
    }

    #[test]
    fn secret_does_not_double_wrap() {
        let once = PropertyValue::secret("x");
        let twice = PropertyValue::secret(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.unsecret(), &PropertyValue::from("x"));
        assert_eq!(twice.type_name(), "string");
    }

    #[test]
    fn secrets_reapply_at_their_nested_position() {
        let source = PropertyValue::from(PropertyMap::from([
            ("env".to_string(), PropertyValue::secret("prod")),
            ("team".to_string(), "ops".into()),
        ]));
        let output = source.without_secrets();
        assert!(!output.contains_secrets());

        let restored = output.with_secrets_from(&source);
        assert!(!restored.is_secret());
        let tags = restored.as_object().unwrap();
        assert_eq!(tags["env"], PropertyValue::secret("prod"));
        assert_eq!(tags["team"], PropertyValue::from("ops"));
        assert!(restored.deep_equals(&source));

        let whole = PropertyValue::from("x").with_secrets_from(&PropertyValue::secret("y"));
        assert!(whole.is_secret());
        let items = PropertyValue::from(vec!["a".into(), "b".into()])
            .with_secrets_from(&PropertyValue::from(vec!["a".into(), PropertyValue::secret("b")]));
        assert_eq!(items.as_array().unwrap()[1], PropertyValue::secret("b"));
        assert!(!items.as_array().unwrap()[0].is_secret());
    }

    #[test]
    fn identity_fragments() {
        assert_eq!(PropertyValue::from(10.0).identity_fragment(), Some("10".to_string()));
        assert_eq!(PropertyValue::from(2.5).identity_fragment(), Some("2.5".to_string()));
        assert_eq!(PropertyValue::from("abc").identity_fragment(), Some("abc".to_string()));
        assert_eq!(PropertyValue::from("").identity_fragment(), None);
        assert_eq!(PropertyValue::secret("abc").identity_fragment(), None);
        assert_eq!(PropertyValue::Unknown.identity_fragment(), None);
    }
}
