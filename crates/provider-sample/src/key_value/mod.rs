//! # KeyValue
//!
//! `xyz:index:KeyValue` stores a secret value under a key in the in-process
//! [entry store](crate::store). It implements all four operations:
//!
//! | Operation | Store call | Notes |
//! |-----------|------------|-------|
//! | Create    | `insert`   | fails if the key is taken |
//! | Read      | `get`      | a missing key reports the resource as gone |
//! | Update    | `replace`  | bumps `revision`; `key` cannot change in place |
//! | Delete    | `remove`   | removing a missing key succeeds |
//!
//! The identity is the key. Changing `key` forces replacement; changing
//! `value` or `tags` is an in-place update.

pub mod error;

pub use error::KeyValueError;

use crate::model::{Entry, EntryWrite};
use crate::store::StoreClient;
use async_trait::async_trait;
use provider_framework::{
    CreateOperation, DeleteOperation, OperationContext, OperationError, PlainMap, PropertySpec,
    ReadOperation, ResourceDefinition, ResourceSchema, TypeSpec, UpdateOperation,
};
use serde_json::Value;

pub const TOKEN: &str = "xyz:index:KeyValue";

pub fn schema() -> ResourceSchema {
    let key = || PropertySpec::string("Unique key of the entry.");
    let value = || PropertySpec::string("Value stored under the key.").secret();
    let tags = || PropertySpec::new(TypeSpec::map_of(TypeSpec::String), "Free-form labels.");
    ResourceSchema::new("A secret value stored under a unique key.")
        .with_required_input("key", key())
        .with_required_input("value", value())
        .with_input("tags", tags())
        .with_required_output("key", key())
        .with_required_output("value", value())
        .with_output("tags", tags())
        .with_required_output(
            "revision",
            PropertySpec::integer("Incremented by every in-place update."),
        )
        .replace_on_change("key")
}

/// Builds the definition, with every operation backed by `store`.
pub fn definition(store: StoreClient) -> ResourceDefinition {
    let ops = KeyValue::new(store);
    ResourceDefinition::new(TOKEN, schema())
        .with_identity(["key"])
        .with_create(ops.clone())
        .with_read(ops.clone())
        .with_update(ops.clone())
        .with_delete(ops)
}

/// The operation implementations.
#[derive(Debug, Clone)]
pub struct KeyValue {
    store: StoreClient,
}

impl KeyValue {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }
}

fn parse_write(inputs: PlainMap) -> Result<EntryWrite, KeyValueError> {
    Ok(serde_json::from_value(Value::Object(inputs))?)
}

fn to_outputs(entry: &Entry) -> Result<PlainMap, KeyValueError> {
    match serde_json::to_value(entry)? {
        Value::Object(map) => Ok(map),
        // Entry is a struct, so it always serializes to an object.
        _ => Ok(PlainMap::new()),
    }
}

#[async_trait]
impl CreateOperation for KeyValue {
    async fn create(&self, _ctx: &OperationContext, inputs: PlainMap) -> Result<PlainMap, OperationError> {
        let write = parse_write(inputs)?;
        let entry = self.store.insert(write).await.map_err(KeyValueError::from)?;
        Ok(to_outputs(&entry)?)
    }
}

#[async_trait]
impl ReadOperation for KeyValue {
    async fn read(
        &self,
        _ctx: &OperationContext,
        id: &str,
        _state: PlainMap,
    ) -> Result<Option<PlainMap>, OperationError> {
        let entry = self.store.get(id).await.map_err(KeyValueError::from)?;
        match entry {
            Some(entry) => Ok(Some(to_outputs(&entry)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UpdateOperation for KeyValue {
    async fn update(
        &self,
        _ctx: &OperationContext,
        id: &str,
        _olds: PlainMap,
        news: PlainMap,
    ) -> Result<PlainMap, OperationError> {
        let write = parse_write(news)?;
        if write.key != id {
            return Err(KeyValueError::KeyMismatch {
                key: write.key,
                id: id.to_string(),
            }
            .into());
        }
        let entry = self.store.replace(write).await.map_err(KeyValueError::from)?;
        Ok(to_outputs(&entry)?)
    }
}

#[async_trait]
impl DeleteOperation for KeyValue {
    async fn delete(&self, _ctx: &OperationContext, id: &str, _state: PlainMap) -> Result<(), OperationError> {
        self.store.remove(id).await.map_err(KeyValueError::from)?;
        Ok(())
    }
}
