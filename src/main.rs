//! # xyz provider
//!
//! Serves the sample `xyz` resource types through a [`Provider`](provider_framework::Provider).
//!
//! ## Running
//!
//! ```bash
//! # Walk a KeyValue and a RandomString through their lifecycle
//! RUST_LOG=info cargo run
//!
//! # Print the exported package schema
//! cargo run -- schema
//! ```
//!
//! `XYZ_OPERATION_TIMEOUT_SECS` bounds every operation call.

use provider_framework::tracing::setup_tracing;
use provider_framework::{ConfigError, PropertyMap, PropertyValue, Provider, ProviderError, ProviderOptions};
use provider_sample::lifecycle::{SampleSystem, SystemError};
use provider_sample::{key_value, random_string, PACKAGE};
use tracing::{error, info, Instrument};

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Check failed: {0}")]
    Invalid(String),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing();

    let options = ProviderOptions::from_env(PACKAGE, env!("CARGO_PKG_VERSION"))?;
    let system = SampleSystem::start(options)?;

    if std::env::args().nth(1).as_deref() == Some("schema") {
        println!("{}", system.provider.get_schema()?);
    } else {
        info!("Starting demonstration lifecycle");

        let span = tracing::info_span!("random_string");
        if let Err(e) = random_string_demo(&system.provider).instrument(span).await {
            error!(error = %e, "RandomString demo failed");
        }

        let span = tracing::info_span!("key_value");
        if let Err(e) = key_value_demo(&system.provider).instrument(span).await {
            error!(error = %e, "KeyValue demo failed");
        }
    }

    system.shutdown().await?;
    info!("Provider stopped");
    Ok(())
}

fn bag<const N: usize>(entries: [(&str, PropertyValue); N]) -> PropertyMap {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn checked(provider: &Provider, token: &str, news: PropertyMap) -> Result<PropertyMap, AppError> {
    let result = provider.check(token, &PropertyMap::new(), news)?;
    if !result.is_valid() {
        let failures: Vec<String> = result.failures.iter().map(ToString::to_string).collect();
        return Err(AppError::Invalid(failures.join("; ")));
    }
    Ok(result.inputs)
}

async fn random_string_demo(provider: &Provider) -> Result<(), AppError> {
    let inputs = checked(provider, random_string::TOKEN, bag([("length", PropertyValue::from(12.0))]))?;
    let created = provider.create(random_string::TOKEN, inputs).await?;
    info!(id = %created.id, result = ?created.properties.get("result"), "RandomString created");

    let longer = bag([("length", PropertyValue::from(16.0))]);
    let diff = provider.diff(random_string::TOKEN, &created.id, &created.properties, &longer)?;
    info!(replaces = ?diff.replace_properties, "Changing length forces replacement");

    provider.delete(random_string::TOKEN, &created.id, created.properties).await?;
    Ok(())
}

async fn key_value_demo(provider: &Provider) -> Result<(), AppError> {
    let inputs = checked(
        provider,
        key_value::TOKEN,
        bag([("key", "db-password".into()), ("value", PropertyValue::secret("hunter2"))]),
    )?;
    let created = provider.create(key_value::TOKEN, inputs).await?;
    info!(id = %created.id, properties = ?created.properties, "KeyValue created");

    let news = checked(
        provider,
        key_value::TOKEN,
        bag([("key", "db-password".into()), ("value", PropertyValue::secret("correct-horse"))]),
    )?;
    let diff = provider.diff(key_value::TOKEN, &created.id, &created.properties, &news)?;
    info!(changed = ?diff.changed_properties, replace = diff.requires_replacement(), "Diff computed");

    let updated = provider
        .update(key_value::TOKEN, &created.id, created.properties, news.clone())
        .await?;
    info!(revision = ?updated.properties.get("revision"), "KeyValue updated");

    let read = provider
        .read(key_value::TOKEN, &created.id, updated.properties.clone(), news)
        .await?;
    info!(exists = read.exists, "KeyValue refreshed");

    provider.delete(key_value::TOKEN, &created.id, updated.properties).await?;
    info!(id = %created.id, "KeyValue deleted");
    Ok(())
}
