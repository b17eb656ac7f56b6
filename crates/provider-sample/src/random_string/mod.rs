//! # RandomString
//!
//! `xyz:index:RandomString` generates a string of `length` random alphanumeric
//! characters (`[a-zA-Z0-9]`). It only implements Create, so:
//!
//! - every input change replaces the resource,
//! - Read returns the recorded state,
//! - Delete has nothing to clean up.
//!
//! The identity is the length itself, so `{ length: 8 }` is always `"8"`.

pub mod error;

pub use error::RandomStringError;

use async_trait::async_trait;
use provider_framework::{
    CreateOperation, OperationContext, OperationError, PlainMap, PropertySpec, ResourceDefinition,
    ResourceSchema,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

pub const TOKEN: &str = "xyz:index:RandomString";

/// Upper bound on `length`, keeping one call's allocation sane.
pub const MAX_LENGTH: u64 = 1 << 20;

pub fn schema() -> ResourceSchema {
    let length = || PropertySpec::integer("Number of characters to generate.");
    ResourceSchema::new("A random alphanumeric string of a fixed length.")
        .with_required_input("length", length())
        .with_required_output("length", length())
        .with_required_output("result", PropertySpec::string("The generated string."))
}

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(TOKEN, schema())
        .with_identity(["length"])
        .with_create(RandomString)
}

/// Generates `length` characters from `[a-zA-Z0-9]`.
pub fn generate(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn parse_length(inputs: &PlainMap) -> Result<u64, RandomStringError> {
    let length = inputs
        .get("length")
        .and_then(Value::as_f64)
        .ok_or(RandomStringError::MissingLength)?;
    if length < 0.0 || length.fract() != 0.0 || length > MAX_LENGTH as f64 {
        return Err(RandomStringError::InvalidLength(length));
    }
    Ok(length as u64)
}

/// The Create implementation.
pub struct RandomString;

#[async_trait]
impl CreateOperation for RandomString {
    async fn create(&self, _ctx: &OperationContext, inputs: PlainMap) -> Result<PlainMap, OperationError> {
        let length = parse_length(&inputs)?;
        debug!(length, "Generating");

        let mut outputs = PlainMap::new();
        outputs.insert("length".into(), Value::from(length));
        outputs.insert("result".into(), Value::String(generate(length as usize)));
        Ok(outputs)
    }
}
