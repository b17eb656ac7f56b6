//! # Scripted Operations for Tests
//!
//! [`MockOperations`] implements all four operation traits from a queue of
//! expectations. Each call pops the next expectation, asserts that it is the
//! operation (and resource id) the test scripted, and replays the scripted
//! response. Register clones of one mock as whichever operations a test
//! definition should have.
//!
//! | Feature | MockOperations | Real implementation |
//! |---------|----------------|---------------------|
//! | **Speed** | Instant (in-memory) | Depends on the backing system |
//! | **Determinism** | Fully scripted | Subject to the backing system |
//! | **Error injection** | `return_err` | Hard |
//! | **In-flight calls** | `return_pending` | Hard |
//!
//! ```rust
//! use provider_framework::mock::{plain, MockOperations};
//! use provider_framework::{
//!     PropertyMap, PropertySpec, Provider, ProviderOptions, Registry, ResourceDefinition,
//!     ResourceSchema,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockOperations::new();
//!     mock.expect_create().return_ok(plain(json!({ "name": "web" })));
//!
//!     let schema = ResourceSchema::new("")
//!         .with_required_input("name", PropertySpec::string(""))
//!         .with_required_output("name", PropertySpec::string(""));
//!     let registry = Registry::builder()
//!         .register(
//!             ResourceDefinition::new("demo:index:Site", schema)
//!                 .with_identity(["name"])
//!                 .with_create(mock.clone()),
//!         )
//!         .unwrap()
//!         .build();
//!
//!     let provider = Provider::new(Arc::new(registry), ProviderOptions::new("demo", "0.0.1"));
//!     let inputs = PropertyMap::from([("name".to_string(), "web".into())]);
//!     let created = provider.create("demo:index:Site", inputs).await.unwrap();
//!
//!     assert_eq!(created.id, "web");
//!     mock.verify();
//! }
//! ```

use crate::marshal::PlainMap;
use crate::resource::{
    CreateOperation, DeleteOperation, Operation, OperationContext, OperationError, ReadOperation,
    UpdateOperation,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Converts a JSON object literal into a [`PlainMap`]. Panics on non-objects.
pub fn plain(value: Value) -> PlainMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

enum Reply {
    Outputs(Result<PlainMap, OperationError>),
    Read(Result<Option<PlainMap>, OperationError>),
    Done(Result<(), OperationError>),
    /// Never completes; the call only ends when it is cancelled or times out.
    Pending,
}

struct Expectation {
    operation: Operation,
    id: Option<String>,
    delay: Option<Duration>,
    reply: Reply,
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

/// Scripted implementation of every operation trait.
#[derive(Clone, Default)]
pub struct MockOperations {
    expectations: Queue,
    received: Arc<Mutex<Vec<(Operation, Option<String>)>>>,
}

impl MockOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_create(&self) -> ExpectationBuilder<PlainMap> {
        self.builder(Operation::Create, None)
    }

    pub fn expect_read(&self, id: impl Into<String>) -> ExpectationBuilder<Option<PlainMap>> {
        self.builder(Operation::Read, Some(id.into()))
    }

    pub fn expect_update(&self, id: impl Into<String>) -> ExpectationBuilder<PlainMap> {
        self.builder(Operation::Update, Some(id.into()))
    }

    pub fn expect_delete(&self, id: impl Into<String>) -> ExpectationBuilder<()> {
        self.builder(Operation::Delete, Some(id.into()))
    }

    /// Every call received so far, in order, with the resource id it targeted.
    pub fn received(&self) -> Vec<(Operation, Option<String>)> {
        self.received.lock().unwrap().clone()
    }

    /// Panics unless every scripted expectation was consumed.
    pub fn verify(&self) {
        let remaining = self.expectations.lock().unwrap().len();
        if remaining != 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }

    fn builder<T>(&self, operation: Operation, id: Option<String>) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            operation,
            id,
            delay: None,
            expectations: self.expectations.clone(),
            _response: PhantomData,
        }
    }

    async fn next(&self, operation: Operation, id: Option<&str>) -> Reply {
        self.received
            .lock()
            .unwrap()
            .push((operation, id.map(str::to_string)));

        let expectation = self.expectations.lock().unwrap().pop_front();
        let Some(expectation) = expectation else {
            panic!("Unexpected {operation} call: no expectations left");
        };
        assert_eq!(expectation.operation, operation, "unexpected operation");
        assert_eq!(expectation.id.as_deref(), id, "unexpected resource id for {operation}");

        if let Some(delay) = expectation.delay {
            tokio::time::sleep(delay).await;
        }
        if let Reply::Pending = expectation.reply {
            std::future::pending::<()>().await;
        }
        expectation.reply
    }
}

/// Scripts the response to one expected call.
pub struct ExpectationBuilder<T> {
    operation: Operation,
    id: Option<String>,
    delay: Option<Duration>,
    expectations: Queue,
    _response: PhantomData<T>,
}

impl<T> ExpectationBuilder<T> {
    /// Waits `delay` before responding.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The call never completes on its own.
    pub fn return_pending(self) {
        self.push(Reply::Pending);
    }

    fn push(self, reply: Reply) {
        self.expectations.lock().unwrap().push_back(Expectation {
            operation: self.operation,
            id: self.id,
            delay: self.delay,
            reply,
        });
    }
}

impl ExpectationBuilder<PlainMap> {
    pub fn return_ok(self, outputs: PlainMap) {
        self.push(Reply::Outputs(Ok(outputs)));
    }

    pub fn return_err(self, error: impl Into<OperationError>) {
        self.push(Reply::Outputs(Err(error.into())));
    }
}

impl ExpectationBuilder<Option<PlainMap>> {
    pub fn return_ok(self, outputs: Option<PlainMap>) {
        self.push(Reply::Read(Ok(outputs)));
    }

    pub fn return_err(self, error: impl Into<OperationError>) {
        self.push(Reply::Read(Err(error.into())));
    }
}

impl ExpectationBuilder<()> {
    pub fn return_ok(self) {
        self.push(Reply::Done(Ok(())));
    }

    pub fn return_err(self, error: impl Into<OperationError>) {
        self.push(Reply::Done(Err(error.into())));
    }
}

#[async_trait]
impl CreateOperation for MockOperations {
    async fn create(&self, _ctx: &OperationContext, _inputs: PlainMap) -> Result<PlainMap, OperationError> {
        match self.next(Operation::Create, None).await {
            Reply::Outputs(result) => result,
            _ => panic!("create expectation scripted with a non-create response"),
        }
    }
}

#[async_trait]
impl ReadOperation for MockOperations {
    async fn read(
        &self,
        _ctx: &OperationContext,
        id: &str,
        _state: PlainMap,
    ) -> Result<Option<PlainMap>, OperationError> {
        match self.next(Operation::Read, Some(id)).await {
            Reply::Read(result) => result,
            _ => panic!("read expectation scripted with a non-read response"),
        }
    }
}

#[async_trait]
impl UpdateOperation for MockOperations {
    async fn update(
        &self,
        _ctx: &OperationContext,
        id: &str,
        _olds: PlainMap,
        _news: PlainMap,
    ) -> Result<PlainMap, OperationError> {
        match self.next(Operation::Update, Some(id)).await {
            Reply::Outputs(result) => result,
            _ => panic!("update expectation scripted with a non-update response"),
        }
    }
}

#[async_trait]
impl DeleteOperation for MockOperations {
    async fn delete(&self, _ctx: &OperationContext, id: &str, _state: PlainMap) -> Result<(), OperationError> {
        match self.next(Operation::Delete, Some(id)).await {
            Reply::Done(result) => result,
            _ => panic!("delete expectation scripted with a non-delete response"),
        }
    }
}
