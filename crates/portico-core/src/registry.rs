//! Operation registry and handler descriptors.
//!
//! A [`Registry`] is a fixed mapping from class identifier to
//! [`HandlerDescriptor`], built once at dispatcher construction and
//! immutable thereafter. Each descriptor carries a zero-argument factory
//! for the handler type and a statically-built operation table — one
//! [`Operation`] per exposed method, declaring access level, execution
//! mode, lock group, and parameter bindings up front instead of being
//! discovered per call.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::bind::Arg;
use crate::convert::ParamType;
use crate::session::{HandlerObject, HandlerTypeId};

/// Future returned by an operation invocation.
pub type OperationFuture = Pin<Box<dyn Future<Output = anyhow::Result<serde_json::Value>> + Send>>;

pub(crate) type InvokeFn =
    Arc<dyn Fn(Option<HandlerObject>, Vec<Arg>) -> OperationFuture + Send + Sync>;

type FactoryFn = Arc<dyn Fn() -> anyhow::Result<HandlerObject> + Send + Sync>;

/// Whether an operation runs inline or on a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Sync,
    Async,
}

/// A contextual parameter, satisfied from ambient objects rather than from
/// named request data. Resolved in this priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextParam {
    Response,
    Request,
    Session,
    Dispatcher,
    /// Another session-scoped handler instance, resolved without creating it.
    Handler(HandlerTypeId),
}

/// One declared parameter of an operation.
#[derive(Debug, Clone)]
pub enum ParamSpec {
    Context(ContextParam),
    Request {
        name: &'static str,
        ty: ParamType,
        optional: bool,
    },
}

impl ParamSpec {
    /// A required request-bound parameter.
    pub fn request(name: &'static str, ty: ParamType) -> Self {
        Self::Request {
            name,
            ty,
            optional: false,
        }
    }

    /// An optional request-bound parameter; binds to [`Arg::Absent`] when
    /// the value is not provided.
    pub fn optional(name: &'static str, ty: ParamType) -> Self {
        Self::Request {
            name,
            ty,
            optional: true,
        }
    }

    pub fn context(param: ContextParam) -> Self {
        Self::Context(param)
    }

    /// A contextual parameter bound to the session instance of another
    /// handler type, if one exists.
    pub fn handler<H: 'static>() -> Self {
        Self::Context(ContextParam::Handler(HandlerTypeId::of::<H>()))
    }
}

/// One exposed method of a handler class.
#[derive(Clone)]
pub struct Operation {
    pub(crate) name: &'static str,
    pub(crate) access_level: i64,
    pub(crate) mode: ExecMode,
    pub(crate) lock_group: &'static str,
    pub(crate) is_static: bool,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) invoke: InvokeFn,
}

impl Operation {
    /// An operation invoked on the per-session instance of `H`.
    pub fn instance<H, F, Fut>(name: &'static str, access_level: i64, f: F) -> Self
    where
        H: Send + Sync + 'static,
        F: Fn(Arc<H>, Vec<Arg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        let invoke: InvokeFn = Arc::new(move |object, args| -> OperationFuture {
            match object.and_then(|o| o.downcast::<H>().ok()) {
                Some(handler) => Box::pin(f(handler, args)),
                None => Box::pin(async move {
                    Err(anyhow::anyhow!("handler instance unavailable"))
                }),
            }
        });
        Self {
            name,
            access_level,
            mode: ExecMode::Sync,
            lock_group: "",
            is_static: false,
            params: Vec::new(),
            invoke,
        }
    }

    /// A static operation — invoked without a handler instance, and no
    /// instance is created for it.
    pub fn function<F, Fut>(name: &'static str, access_level: i64, f: F) -> Self
    where
        F: Fn(Vec<Arg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        let invoke: InvokeFn =
            Arc::new(move |_object, args| -> OperationFuture { Box::pin(f(args)) });
        Self {
            name,
            access_level,
            mode: ExecMode::Sync,
            lock_group: "",
            is_static: true,
            params: Vec::new(),
            invoke,
        }
    }

    /// Run the operation on a spawned task; dispatch returns immediately.
    pub fn asynchronous(mut self) -> Self {
        self.mode = ExecMode::Async;
        self
    }

    /// Admit at most one concurrent invocation per session in this group.
    pub fn lock_group(mut self, group: &'static str) -> Self {
        self.lock_group = group;
        self
    }

    /// Append a parameter specification. Declaration order is binding order.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A handler class: type identity, factory, and operation table.
pub struct HandlerDescriptor {
    type_id: HandlerTypeId,
    factory: FactoryFn,
    operations: Vec<Operation>,
}

impl HandlerDescriptor {
    /// Descriptor for a handler constructed via `Default`.
    pub fn new<H: Default + Send + Sync + 'static>() -> Self {
        Self::with_factory(|| Ok(H::default()))
    }

    /// Descriptor with an explicit fallible factory. A factory failure
    /// surfaces as an instantiation error at dispatch time.
    pub fn with_factory<H, F>(factory: F) -> Self
    where
        H: Send + Sync + 'static,
        F: Fn() -> anyhow::Result<H> + Send + Sync + 'static,
    {
        Self {
            type_id: HandlerTypeId::of::<H>(),
            factory: Arc::new(move || factory().map(|h| Arc::new(h) as HandlerObject)),
            operations: Vec::new(),
        }
    }

    pub fn operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    pub fn type_id(&self) -> HandlerTypeId {
        self.type_id
    }

    pub(crate) fn create(&self) -> anyhow::Result<HandlerObject> {
        (self.factory)()
    }

    /// First operation matching the method name, in declaration order.
    /// Overload ambiguity is not resolved — first name match wins.
    pub(crate) fn find(&self, method: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == method)
    }
}

/// Fixed class-identifier → handler-descriptor mapping. Read-only at
/// dispatch time, so lookups need no synchronization.
pub struct Registry {
    classes: HashMap<String, Arc<HandlerDescriptor>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            classes: HashMap::new(),
        }
    }

    pub fn resolve(&self, class_id: &str) -> Option<&Arc<HandlerDescriptor>> {
        self.classes.get(class_id)
    }
}

pub struct RegistryBuilder {
    classes: HashMap<String, Arc<HandlerDescriptor>>,
}

impl RegistryBuilder {
    /// Register a handler class under a class identifier. Identifiers are
    /// unique within one registry; a repeated identifier replaces the
    /// earlier descriptor.
    pub fn class(mut self, id: impl Into<String>, descriptor: HandlerDescriptor) -> Self {
        self.classes.insert(id.into(), Arc::new(descriptor));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            classes: self.classes,
        }
    }
}
