//! # Schema Validation
//!
//! Checks a proposed property bag against a definition's input schema. Problems
//! are collected, not raised: the caller receives every failure at once together
//! with the inputs it proposed, untouched.

use crate::error::ProviderError;
use crate::resource::ResourceDefinition;
use crate::schema::TypeSpec;
use crate::value::{PropertyMap, PropertyValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of a check: the accepted inputs plus any validation failures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckResult {
    pub inputs: PropertyMap,
    pub failures: Vec<CheckFailure>,
}

impl CheckResult {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    /// Dotted path to the offending value, e.g. `tags.env` or `items[2]`.
    pub property: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureKind {
    MissingRequiredProperty,
    UnknownProperty,
    TypeMismatch { expected: String, actual: String },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::MissingRequiredProperty => {
                write!(f, "missing required property `{}`", self.property)
            }
            FailureKind::UnknownProperty => write!(f, "unknown property `{}`", self.property),
            FailureKind::TypeMismatch { expected, actual } => write!(
                f,
                "property `{}`: expected {expected}, got {actual}",
                self.property
            ),
        }
    }
}

/// Validates `news` against the input schema of `definition`.
///
/// Unknown values always pass, as do nulls (absent values are only a problem
/// for required inputs). Secrets are checked on the value they wrap.
pub fn check(
    definition: &ResourceDefinition,
    news: &PropertyMap,
) -> Result<CheckResult, ProviderError> {
    if definition.create_operation().is_none() {
        return Err(ProviderError::UnsupportedResourceType {
            token: definition.token().to_string(),
        });
    }

    let schema = definition.schema();
    let mut failures = Vec::new();

    for (name, value) in news {
        match schema.inputs.get(name) {
            Some(spec) => check_value(name, &spec.type_spec, value, &mut failures),
            None => failures.push(CheckFailure {
                property: name.clone(),
                kind: FailureKind::UnknownProperty,
            }),
        }
    }

    for name in &schema.required_inputs {
        let absent = news.get(name).map_or(true, |v| v.unsecret().is_null());
        if absent {
            failures.push(CheckFailure {
                property: name.clone(),
                kind: FailureKind::MissingRequiredProperty,
            });
        }
    }

    Ok(CheckResult {
        inputs: news.clone(),
        failures,
    })
}

fn check_value(path: &str, spec: &TypeSpec, value: &PropertyValue, failures: &mut Vec<CheckFailure>) {
    let value = value.unsecret();
    if value.is_unknown() || value.is_null() {
        return;
    }

    let mismatch = |failures: &mut Vec<CheckFailure>| {
        failures.push(CheckFailure {
            property: path.to_string(),
            kind: FailureKind::TypeMismatch {
                expected: spec.describe(),
                actual: value.type_name().to_string(),
            },
        })
    };

    match (spec, value) {
        (TypeSpec::Any, _) => {}
        (TypeSpec::Boolean, PropertyValue::Bool(_)) => {}
        (TypeSpec::Number, PropertyValue::Number(_)) => {}
        (TypeSpec::Integer, PropertyValue::Number(n)) if n.is_finite() && n.fract() == 0.0 => {}
        (TypeSpec::String, PropertyValue::String(_)) => {}
        (TypeSpec::Array(items), PropertyValue::Array(values)) => {
            for (index, item) in values.iter().enumerate() {
                check_value(&format!("{path}[{index}]"), items, item, failures);
            }
        }
        (TypeSpec::Map(values), PropertyValue::Object(map)) => {
            for (key, item) in map {
                check_value(&format!("{path}.{key}"), values, item, failures);
            }
        }
        (TypeSpec::Object(props), PropertyValue::Object(map)) => {
            check_object(path, props, map, failures)
        }
        _ => mismatch(failures),
    }
}

fn check_object(
    path: &str,
    props: &BTreeMap<String, TypeSpec>,
    map: &PropertyMap,
    failures: &mut Vec<CheckFailure>,
) {
    for (key, item) in map {
        let child = format!("{path}.{key}");
        match props.get(key) {
            Some(spec) => check_value(&child, spec, item, failures),
            None => failures.push(CheckFailure {
                property: child,
                kind: FailureKind::UnknownProperty,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::PlainMap;
    use crate::resource::{CreateOperation, OperationContext, OperationError};
    use crate::schema::{PropertySpec, ResourceSchema};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CreateOperation for Noop {
        async fn create(&self, _: &OperationContext, inputs: PlainMap) -> Result<PlainMap, OperationError> {
            Ok(inputs)
        }
    }

    fn definition() -> ResourceDefinition {
        let server = TypeSpec::Object(BTreeMap::from([
            ("host".to_string(), TypeSpec::String),
            ("port".to_string(), TypeSpec::Integer),
        ]));
        let schema = ResourceSchema::new("")
            .with_required_input("length", PropertySpec::integer(""))
            .with_input("tags", PropertySpec::new(TypeSpec::map_of(TypeSpec::String), ""))
            .with_input("ports", PropertySpec::new(TypeSpec::array_of(TypeSpec::Integer), ""))
            .with_input("server", PropertySpec::new(server, ""))
            .with_input("blob", PropertySpec::new(TypeSpec::Any, ""));
        ResourceDefinition::new("t:m:A", schema).with_create(Noop)
    }

    fn bag(entries: Vec<(&str, PropertyValue)>) -> PropertyMap {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn valid_inputs_are_returned_verbatim() {
        let news = bag(vec![
            ("length", PropertyValue::from(8.0)),
            ("tags", PropertyValue::from(bag(vec![("env", "prod".into())]))),
            ("blob", PropertyValue::from(vec![true.into(), "x".into()])),
        ]);
        let result = check(&definition(), &news).unwrap();
        assert!(result.is_valid(), "{:?}", result.failures);
        assert_eq!(result.inputs, news);
    }

    #[test]
    fn missing_required_property_is_reported_once() {
        let result = check(&definition(), &PropertyMap::new()).unwrap();
        assert_eq!(
            result.failures,
            vec![CheckFailure {
                property: "length".into(),
                kind: FailureKind::MissingRequiredProperty,
            }]
        );
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let result = check(&definition(), &bag(vec![("length", PropertyValue::Null)])).unwrap();
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].kind, FailureKind::MissingRequiredProperty);
    }

    #[test]
    fn unknown_values_pass_validation() {
        let news = bag(vec![
            ("length", PropertyValue::Unknown),
            ("ports", PropertyValue::from(vec![PropertyValue::from(1.0), PropertyValue::Unknown])),
        ]);
        assert!(check(&definition(), &news).unwrap().is_valid());
    }

    #[test]
    fn secrets_are_checked_on_their_inner_value() {
        let ok = bag(vec![("length", PropertyValue::secret(4.0))]);
        assert!(check(&definition(), &ok).unwrap().is_valid());

        let bad = bag(vec![("length", PropertyValue::secret("four"))]);
        let failures = check(&definition(), &bad).unwrap().failures;
        assert_eq!(
            failures[0].kind,
            FailureKind::TypeMismatch {
                expected: "integer".into(),
                actual: "string".into()
            }
        );
    }

    #[test]
    fn nested_failures_carry_paths() {
        let news = bag(vec![
            ("length", PropertyValue::from(2.5)),
            ("color", "red".into()),
            ("tags", PropertyValue::from(bag(vec![("env", PropertyValue::from(1.0))]))),
            ("ports", PropertyValue::from(vec![PropertyValue::from(80.0), PropertyValue::from(443.0), "x".into()])),
            (
                "server",
                PropertyValue::from(bag(vec![("host", "h".into()), ("tls", true.into())])),
            ),
        ]);
        let failures = check(&definition(), &news).unwrap().failures;
        let rendered: Vec<String> = failures.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "unknown property `color`",
                "property `length`: expected integer, got number",
                "property `ports[2]`: expected integer, got string",
                "unknown property `server.tls`",
                "property `tags.env`: expected string, got number",
            ]
        );
    }

    #[test]
    fn type_without_create_is_unsupported() {
        let definition = ResourceDefinition::new("t:m:B", ResourceSchema::new(""));
        assert!(matches!(
            check(&definition, &PropertyMap::new()),
            Err(ProviderError::UnsupportedResourceType { .. })
        ));
    }
}
