//! # Diff Engine
//!
//! Decides whether moving a resource from its recorded state to new inputs is an
//! in-place update, a replacement, or nothing at all.
//!
//! Only inputs are compared: the declared input properties plus whatever the new
//! inputs carry. Computed outputs in the old state are ignored. A `null` value is
//! treated the same as an absent one.
//!
//! Becoming secret or ceasing to be secret is a change, except for properties the
//! schema declares secret: those are always stored secret, so only their
//! underlying value is compared.

use crate::resource::ResourceDefinition;
use crate::value::{PropertyMap, PropertyValue};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// How a single property changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyDiffKind {
    Add,
    AddReplace,
    Delete,
    DeleteReplace,
    Update,
    UpdateReplace,
}

impl PropertyDiffKind {
    fn classify(old: Option<&PropertyValue>, new: Option<&PropertyValue>, replace: bool) -> Self {
        match (old, new, replace) {
            (None, _, false) => PropertyDiffKind::Add,
            (None, _, true) => PropertyDiffKind::AddReplace,
            (_, None, false) => PropertyDiffKind::Delete,
            (_, None, true) => PropertyDiffKind::DeleteReplace,
            (_, _, false) => PropertyDiffKind::Update,
            (_, _, true) => PropertyDiffKind::UpdateReplace,
        }
    }

    pub fn is_replace(&self) -> bool {
        matches!(
            self,
            PropertyDiffKind::AddReplace
                | PropertyDiffKind::DeleteReplace
                | PropertyDiffKind::UpdateReplace
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub changes: bool,
    /// Properties whose change forces replacement. Empty for an in-place update.
    pub replace_properties: Vec<String>,
    /// Only set when a replacement is required.
    pub delete_before_replace: bool,
    pub changed_properties: Vec<String>,
    pub detailed_diff: BTreeMap<String, PropertyDiffKind>,
}

impl DiffResult {
    pub fn requires_replacement(&self) -> bool {
        !self.replace_properties.is_empty()
    }
}

/// Compares the recorded `olds` with the proposed `news` for `definition`.
pub fn diff(definition: &ResourceDefinition, olds: &PropertyMap, news: &PropertyMap) -> DiffResult {
    let schema = definition.schema();
    let compared: BTreeSet<&String> = schema.inputs.keys().chain(news.keys()).collect();

    let changed: Vec<&String> = compared
        .into_iter()
        .filter(|name| match (present(olds, name), present(news, name)) {
            (None, None) => false,
            (Some(old), Some(new)) if schema.is_secret(name) => {
                !old.without_secrets().deep_equals(&new.without_secrets())
            }
            (Some(old), Some(new)) => !old.deep_equals(new),
            _ => true,
        })
        .collect();

    let replace_properties: Vec<String> = if changed.is_empty() {
        Vec::new()
    } else if definition.update_operation().is_none() {
        schema.inputs.keys().cloned().collect()
    } else {
        changed
            .iter()
            .filter(|name| schema.replace_on_changes.contains(name.as_str()))
            .map(|name| name.to_string())
            .collect()
    };

    let detailed_diff = changed
        .iter()
        .map(|name| {
            let replace = replace_properties.iter().any(|r| r == *name);
            let kind = PropertyDiffKind::classify(present(olds, name), present(news, name), replace);
            (name.to_string(), kind)
        })
        .collect();

    DiffResult {
        changes: !changed.is_empty(),
        delete_before_replace: !replace_properties.is_empty() && schema.delete_before_replace,
        replace_properties,
        changed_properties: changed.into_iter().cloned().collect(),
        detailed_diff,
    }
}

fn present<'a>(bag: &'a PropertyMap, name: &str) -> Option<&'a PropertyValue> {
    bag.get(name).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::PlainMap;
    use crate::resource::{OperationContext, OperationError, UpdateOperation};
    use crate::schema::{PropertySpec, ResourceSchema};
    use async_trait::async_trait;

    struct Patch;

    #[async_trait]
    impl UpdateOperation for Patch {
        async fn update(
            &self,
            _: &OperationContext,
            _: &str,
            _: PlainMap,
            news: PlainMap,
        ) -> Result<PlainMap, OperationError> {
            Ok(news)
        }
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new("")
            .with_required_input("key", PropertySpec::string(""))
            .with_input("value", PropertySpec::string(""))
            .with_required_output("key", PropertySpec::string(""))
            .with_output("value", PropertySpec::string(""))
            .with_output("revision", PropertySpec::integer(""))
            .replace_on_change("key")
    }

    fn replace_only() -> ResourceDefinition {
        ResourceDefinition::new("t:m:R", schema().delete_before_replace(true))
    }

    fn updatable() -> ResourceDefinition {
        ResourceDefinition::new("t:m:U", schema().delete_before_replace(true)).with_update(Patch)
    }

    fn bag(entries: &[(&str, PropertyValue)]) -> PropertyMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn identical_bags_have_no_changes() {
        let olds = bag(&[("key", "a".into()), ("value", "1".into()), ("revision", PropertyValue::from(3.0))]);
        let news = bag(&[("key", "a".into()), ("value", "1".into())]);
        for definition in [replace_only(), updatable()] {
            let result = diff(&definition, &olds, &news);
            assert_eq!(result, DiffResult::default());
        }
    }

    #[test]
    fn without_update_any_change_replaces_every_input() {
        let olds = bag(&[("key", "a".into()), ("value", "1".into())]);
        let news = bag(&[("key", "a".into()), ("value", "2".into())]);
        let result = diff(&replace_only(), &olds, &news);
        assert!(result.changes);
        assert_eq!(result.replace_properties, vec!["key", "value"]);
        assert_eq!(result.changed_properties, vec!["value"]);
        assert!(result.delete_before_replace);
        assert_eq!(result.detailed_diff["value"], PropertyDiffKind::UpdateReplace);
    }

    #[test]
    fn with_update_only_replace_on_change_properties_replace() {
        let olds = bag(&[("key", "a".into()), ("value", "1".into())]);

        let in_place = diff(&updatable(), &olds, &bag(&[("key", "a".into())]));
        assert!(in_place.changes);
        assert!(!in_place.requires_replacement());
        assert!(!in_place.delete_before_replace);
        assert_eq!(in_place.detailed_diff["value"], PropertyDiffKind::Delete);

        let replaced = diff(&updatable(), &olds, &bag(&[("key", "b".into()), ("value", "1".into())]));
        assert_eq!(replaced.replace_properties, vec!["key"]);
        assert!(replaced.delete_before_replace);
        assert_eq!(replaced.detailed_diff["key"], PropertyDiffKind::UpdateReplace);
    }

    #[test]
    fn unknown_always_differs() {
        let olds = bag(&[("key", "a".into()), ("value", PropertyValue::Unknown)]);
        let news = bag(&[("key", "a".into()), ("value", PropertyValue::Unknown)]);
        let result = diff(&updatable(), &olds, &news);
        assert_eq!(result.changed_properties, vec!["value"]);
    }

    #[test]
    fn becoming_secret_is_a_change() {
        let olds = bag(&[("key", "a".into()), ("value", "v".into())]);
        let same = bag(&[("key", "a".into()), ("value", "v".into())]);
        let secret = bag(&[("key", "a".into()), ("value", PropertyValue::secret("v"))]);
        assert!(!diff(&updatable(), &olds, &same).changes);
        assert!(diff(&updatable(), &olds, &secret).changes);
    }

    #[test]
    fn declared_secrets_compare_on_value_only() {
        let definition = ResourceDefinition::new(
            "t:m:S",
            schema()
                .with_input("value", PropertySpec::string("").secret())
                .with_output("value", PropertySpec::string("").secret()),
        )
        .with_update(Patch);
        let olds = bag(&[("key", "a".into()), ("value", PropertyValue::secret("v"))]);

        let plain = bag(&[("key", "a".into()), ("value", "v".into())]);
        assert!(!diff(&definition, &olds, &plain).changes);

        let changed = bag(&[("key", "a".into()), ("value", "w".into())]);
        assert_eq!(diff(&definition, &olds, &changed).changed_properties, vec!["value"]);
    }

    #[test]
    fn undeclared_new_keys_are_compared() {
        let olds = bag(&[("key", "a".into())]);
        let news = bag(&[("key", "a".into()), ("extra", PropertyValue::from(true))]);
        let result = diff(&updatable(), &olds, &news);
        assert_eq!(result.detailed_diff["extra"], PropertyDiffKind::Add);
    }

    #[test]
    fn null_equals_absent() {
        let olds = bag(&[("key", "a".into())]);
        let news = bag(&[("key", "a".into()), ("value", PropertyValue::Null)]);
        assert!(!diff(&updatable(), &olds, &news).changes);
    }
}
