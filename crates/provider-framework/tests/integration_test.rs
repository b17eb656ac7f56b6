use provider_framework::mock::{plain, MockOperations};
use provider_framework::{
    FailureKind, Operation, PropertyMap, PropertySpec, PropertyValue, Provider, ProviderError,
    ProviderOptions, Registry, ResourceDefinition, ResourceSchema,
};
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

// --- Test Types ---

const SERVER: &str = "test:index:Server";
const SNAPSHOT: &str = "test:index:Snapshot";

fn server_schema() -> ResourceSchema {
    ResourceSchema::new("A server.")
        .with_required_input("name", PropertySpec::string("Server name."))
        .with_input("password", PropertySpec::string("Admin password."))
        .with_required_output("name", PropertySpec::string("Server name."))
        .with_output("password", PropertySpec::string("Admin password."))
        .with_required_output("token", PropertySpec::string("Access token.").secret())
        .replace_on_change("name")
}

/// Server supports every operation; Snapshot is create-only.
fn setup(options: ProviderOptions) -> (Provider, MockOperations) {
    let mock = MockOperations::new();
    let server = ResourceDefinition::new(SERVER, server_schema())
        .with_identity(["name"])
        .with_create(mock.clone())
        .with_read(mock.clone())
        .with_update(mock.clone())
        .with_delete(mock.clone());
    let snapshot_schema = ResourceSchema::new("A snapshot.")
        .with_required_input("label", PropertySpec::string(""))
        .with_required_output("label", PropertySpec::string(""));
    let snapshot = ResourceDefinition::new(SNAPSHOT, snapshot_schema)
        .with_identity(["label"])
        .with_create(mock.clone());

    let registry = Registry::builder()
        .register(server)
        .unwrap()
        .register(snapshot)
        .unwrap()
        .build();
    (Provider::new(Arc::new(registry), options), mock)
}

fn options() -> ProviderOptions {
    ProviderOptions::new("test", "1.0.0")
}

fn bag(value: serde_json::Value) -> PropertyMap {
    provider_framework::from_plain(&plain(value))
}

// --- Tests ---

#[tokio::test]
async fn test_create_derives_identity_and_keeps_secrets() {
    let (provider, mock) = setup(options());
    mock.expect_create().return_ok(plain(json!({
        "name": "web-1",
        "password": "hunter2",
        "token": "t0k3n"
    })));

    let mut inputs = bag(json!({ "name": "web-1" }));
    inputs.insert("password".into(), PropertyValue::secret("hunter2"));

    let created = provider.create(SERVER, inputs).await.unwrap();

    assert_eq!(created.id, "web-1");
    assert_eq!(created.properties["name"], PropertyValue::from("web-1"));
    assert_eq!(created.properties["password"], PropertyValue::secret("hunter2"));
    assert_eq!(created.properties["token"], PropertyValue::secret("t0k3n"));
    mock.verify();
}

#[tokio::test]
async fn test_missing_identity_is_an_error() {
    let (provider, mock) = setup(options());
    mock.expect_create().return_ok(plain(json!({ "token": "t" })));

    let err = provider
        .create(SERVER, bag(json!({ "name": "web-1" })))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProviderError::IdentityUnavailable { ref missing, .. } if missing == &vec!["name".to_string()]
    ));
}

#[tokio::test]
async fn test_urn_and_unknown_types() {
    let (provider, mock) = setup(options());
    mock.expect_create().return_ok(plain(json!({ "label": "nightly" })));

    let urn = format!("urn:pulumi:dev::proj::{SNAPSHOT}::snap");
    let created = provider.create(&urn, bag(json!({ "label": "nightly" }))).await.unwrap();
    assert_eq!(created.id, "nightly");

    let err = provider.create("test:index:Nope", PropertyMap::new()).await.unwrap_err();
    assert!(matches!(err, ProviderError::UnknownResourceType(t) if t == "test:index:Nope"));
}

#[tokio::test]
async fn test_check_reports_failures_as_data() {
    let (provider, _mock) = setup(options());
    let result = provider
        .check(SERVER, &PropertyMap::new(), bag(json!({ "password": 42 })))
        .unwrap();

    let kinds: Vec<_> = result.failures.iter().map(|f| (f.property.as_str(), &f.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (
                "password",
                &FailureKind::TypeMismatch {
                    expected: "string".into(),
                    actual: "number".into()
                }
            ),
            ("name", &FailureKind::MissingRequiredProperty),
        ]
    );
    assert_eq!(result.inputs, bag(json!({ "password": 42 })));
}

#[tokio::test]
async fn test_read_variants() {
    let (provider, mock) = setup(options());
    let state = bag(json!({ "name": "web-1", "token": "t" }));

    mock.expect_read("web-1").return_ok(Some(plain(json!({ "name": "web-1", "token": "t2" }))));
    let read = provider
        .read(SERVER, "web-1", state.clone(), PropertyMap::new())
        .await
        .unwrap();
    assert!(read.exists);
    assert_eq!(read.id, "web-1");
    assert_eq!(read.properties["token"], PropertyValue::secret("t2"));

    mock.expect_read("web-1").return_ok(None);
    let gone = provider
        .read(SERVER, "web-1", state.clone(), PropertyMap::new())
        .await
        .unwrap();
    assert!(!gone.exists);
    assert!(gone.id.is_empty());

    // Snapshot has no Read: the recorded state comes back unchanged.
    let snapshot_state = bag(json!({ "label": "nightly" }));
    let echoed = provider
        .read(SNAPSHOT, "nightly", snapshot_state.clone(), PropertyMap::new())
        .await
        .unwrap();
    assert!(echoed.exists);
    assert_eq!(echoed.properties, snapshot_state);
    mock.verify();
}

#[tokio::test]
async fn test_update_without_update_operation_has_no_side_effect() {
    let (provider, mock) = setup(options());
    let err = provider
        .update(
            SNAPSHOT,
            "nightly",
            bag(json!({ "label": "nightly" })),
            bag(json!({ "label": "weekly" })),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProviderError::UnsupportedOperation { operation: Operation::Update, .. }
    ));
    assert!(mock.received().is_empty());
}

#[tokio::test]
async fn test_update_and_delete() {
    let (provider, mock) = setup(options());
    mock.expect_update("web-1").return_ok(plain(json!({ "name": "web-1", "password": "new", "token": "t" })));
    mock.expect_delete("web-1").return_ok();

    let mut news = bag(json!({ "name": "web-1" }));
    news.insert("password".into(), PropertyValue::secret("new"));
    let updated = provider
        .update(SERVER, "web-1", bag(json!({ "name": "web-1" })), news)
        .await
        .unwrap();
    assert_eq!(updated.properties["password"], PropertyValue::secret("new"));

    provider.delete(SERVER, "web-1", updated.properties).await.unwrap();

    // Snapshot has no Delete: nothing to do.
    provider.delete(SNAPSHOT, "nightly", PropertyMap::new()).await.unwrap();
    mock.verify();
}

#[tokio::test]
async fn test_created_state_diffs_clean_against_its_inputs() {
    let (provider, mock) = setup(options());
    let outputs = plain(json!({ "name": "web-1", "password": "hunter2", "token": "t" }));
    mock.expect_create().return_ok(outputs.clone());
    mock.expect_create().return_ok(outputs);

    let clear = bag(json!({ "name": "web-1", "password": "hunter2" }));
    let mut hidden = bag(json!({ "name": "web-1" }));
    hidden.insert("password".into(), PropertyValue::secret("hunter2"));

    for inputs in [clear, hidden] {
        let checked = provider.check(SERVER, &PropertyMap::new(), inputs).unwrap();
        let created = provider.create(SERVER, checked.inputs.clone()).await.unwrap();
        assert_eq!(
            created.properties["password"].is_secret(),
            checked.inputs["password"].is_secret()
        );

        let result = provider
            .diff(SERVER, &created.id, &created.properties, &checked.inputs)
            .unwrap();
        assert!(!result.changes, "unexpected changes: {:?}", result.detailed_diff);
    }
    mock.verify();
}

#[tokio::test]
async fn test_operation_errors_keep_their_source() {
    let (provider, mock) = setup(options());
    mock.expect_delete("web-1").return_err("backend unavailable");

    let err = provider.delete(SERVER, "web-1", PropertyMap::new()).await.unwrap_err();

    match &err {
        ProviderError::Operation { token, operation, id, .. } => {
            assert_eq!(token, SERVER);
            assert_eq!(*operation, Operation::Delete);
            assert_eq!(id.as_deref(), Some("web-1"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.source().unwrap().to_string(), "backend unavailable");
    assert!(err.to_string().contains("(web-1)"));
}

#[tokio::test]
async fn test_cancel_interrupts_in_flight_create() {
    let (provider, mock) = setup(options());
    let provider = Arc::new(provider);
    mock.expect_create().return_pending();

    let call = {
        let provider = provider.clone();
        tokio::spawn(async move { provider.create(SNAPSHOT, bag(json!({ "label": "x" }))).await })
    };
    // Let the call reach the implementation before cancelling.
    while mock.received().is_empty() {
        tokio::task::yield_now().await;
    }
    provider.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled { operation: Operation::Create, .. }));

    // Later calls are refused before reaching the implementation.
    let err = provider.delete(SERVER, "web-1", PropertyMap::new()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled { .. }));
    assert_eq!(mock.received().len(), 1);
}

#[tokio::test]
async fn test_operation_timeout() {
    let (provider, mock) = setup(options().with_operation_timeout(Duration::from_millis(20)));
    mock.expect_read("web-1").return_pending();

    let err = provider
        .read(SERVER, "web-1", PropertyMap::new(), PropertyMap::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProviderError::TimedOut { operation: Operation::Read, after, .. } if after == Duration::from_millis(20)
    ));
}

#[tokio::test]
async fn test_concurrent_creates() {
    let (provider, mock) = setup(options());
    let provider = Arc::new(provider);
    for _ in 0..16 {
        mock.expect_create()
            .after(Duration::from_millis(5))
            .return_ok(plain(json!({ "label": "same" })));
    }

    let calls: Vec<_> = (0..16)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.create(SNAPSHOT, bag(json!({ "label": "same" }))).await })
        })
        .collect();

    for call in calls {
        assert_eq!(call.await.unwrap().unwrap().id, "same");
    }
    // No de-duplication: every request reached the implementation.
    assert_eq!(mock.received().len(), 16);
    mock.verify();
}

#[tokio::test]
async fn test_provider_surface() {
    let (provider, _mock) = setup(options());

    assert_eq!(provider.get_plugin_info().version, "1.0.0");

    let schema: serde_json::Value = serde_json::from_str(&provider.get_schema().unwrap()).unwrap();
    assert_eq!(schema["name"], "test");
    assert_eq!(schema["resources"][SERVER]["requiredInputs"], json!(["name"]));
    assert_eq!(schema["resources"][SERVER]["properties"]["token"]["secret"], json!(true));

    let config = bag(json!({ "region": "eu" }));
    let checked = provider.check_config(config.clone());
    assert!(checked.is_valid());
    assert_eq!(checked.inputs, config);
    assert!(!provider.diff_config(&config, &PropertyMap::new()).changes);
    provider.configure(&config).unwrap();

    assert!(matches!(
        provider.invoke("test:index:fn", PropertyMap::new()).await,
        Err(ProviderError::Unimplemented("Invoke"))
    ));
    assert!(matches!(
        provider.stream_invoke("test:index:fn", PropertyMap::new()).await,
        Err(ProviderError::Unimplemented("StreamInvoke"))
    ));
    assert!(matches!(
        provider.construct(SERVER, PropertyMap::new()).await,
        Err(ProviderError::Unimplemented("Construct"))
    ));
}
