//! # Method Registry
//!
//! Name-to-handler table served by [`RpcServer`](crate::RpcServer). Handlers
//! come in three shapes:
//!
//! - [`RpcHandler`] implementations (stateful handlers)
//! - closures over the raw positional argument array ([`MethodRegistry::register_fn`])
//! - typed closures whose argument tuple is deserialized from the argument
//!   array and whose result is serialized back ([`MethodRegistry::register_typed`])
//!
//! Every registration also records a [`MethodDescriptor`]; the serialized
//! [`catalogue`](MethodRegistry::catalogue) is what the client-side code
//! generator consumes.
//!
//! ```ignore
//! let mut registry = MethodRegistry::new();
//! registry
//!     .register_typed("get_user", |(user_id,): (u64,)| async move {
//!         Ok::<_, HandlerError>(lookup(user_id))
//!     })?
//!     .param("user_id", "int")
//!     .returns("User | None");
//! ```

use crate::error::{HandlerError, RegistryError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A remotely callable method.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Run the method with the caller's positional arguments.
    async fn call(&self, args: Vec<Value>) -> Result<Value, HandlerError>;
}

/// One positional parameter in a [`MethodDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Description of a registered method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MethodDescriptor {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            returns: None,
            description: None,
        }
    }
}

/// Fills in the descriptor of a freshly registered method.
pub struct MethodEntry<'a> {
    descriptor: &'a mut MethodDescriptor,
}

impl MethodEntry<'_> {
    /// Append a positional parameter.
    pub fn param(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.descriptor.params.push(ParamSpec {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn returns(self, type_name: impl Into<String>) -> Self {
        self.descriptor.returns = Some(type_name.into());
        self
    }

    pub fn describe(self, text: impl Into<String>) -> Self {
        self.descriptor.description = Some(text.into());
        self
    }
}

struct RegisteredMethod {
    handler: Arc<dyn RpcHandler>,
    descriptor: MethodDescriptor,
}

/// Registered methods by name.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, RegisteredMethod>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`.
    pub fn register<H>(&mut self, name: &str, handler: H) -> Result<MethodEntry<'_>, RegistryError>
    where
        H: RpcHandler + 'static,
    {
        self.insert(name, Arc::new(handler))
    }

    /// Register a closure over the raw argument array.
    pub fn register_fn<F, Fut>(&mut self, name: &str, f: F) -> Result<MethodEntry<'_>, RegistryError>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.insert(name, Arc::new(FnHandler(f)))
    }

    /// Register a typed closure.
    ///
    /// `A` is deserialized from the argument array, so it is normally a tuple:
    /// `(u64,)` for one argument, `(String, bool)` for two. Arguments that do
    /// not fit yield `"invalid arguments for '<name>': <reason>"`. Methods
    /// without arguments use [`register_fn`](Self::register_fn).
    pub fn register_typed<A, R, F, Fut>(
        &mut self,
        name: &str,
        f: F,
    ) -> Result<MethodEntry<'_>, RegistryError>
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let handler = TypedHandler {
            method: name.to_string(),
            f,
            _signature: PhantomData,
        };
        self.insert(name, Arc::new(handler))
    }

    fn insert(
        &mut self,
        name: &str,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<MethodEntry<'_>, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.methods.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let method = self
            .methods
            .entry(name.to_string())
            .or_insert(RegisteredMethod {
                handler,
                descriptor: MethodDescriptor::named(name),
            });
        Ok(MethodEntry {
            descriptor: &mut method.descriptor,
        })
    }

    /// Run `method` with `args`.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, HandlerError> {
        let handler = self
            .methods
            .get(method)
            .map(|m| m.handler.clone())
            .ok_or_else(|| HandlerError::not_found(method))?;
        handler.call(args).await
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Descriptors of every registered method, sorted by name.
    pub fn catalogue(&self) -> Vec<MethodDescriptor> {
        let mut catalogue: Vec<_> = self.methods.values().map(|m| m.descriptor.clone()).collect();
        catalogue.sort_by(|a, b| a.name.cmp(&b.name));
        catalogue
    }
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> RpcHandler for FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, HandlerError> {
        (self.0)(args).await
    }
}

struct TypedHandler<F, A, R> {
    method: String,
    f: F,
    _signature: PhantomData<fn(A) -> R>,
}

#[async_trait]
impl<F, Fut, A, R> RpcHandler for TypedHandler<F, A, R>
where
    A: DeserializeOwned + Send,
    R: Serialize + Send,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, HandlerError>> + Send,
{
    async fn call(&self, args: Vec<Value>) -> Result<Value, HandlerError> {
        let parsed: A = serde_json::from_value(Value::Array(args))
            .map_err(|e| HandlerError::invalid_arguments(&self.method, e))?;
        let output = (self.f)(parsed).await?;
        serde_json::to_value(output).map_err(|e| {
            HandlerError::new(format!("failed to encode result of '{}': {e}", self.method))
        })
    }
}
