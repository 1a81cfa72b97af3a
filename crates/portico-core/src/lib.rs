//! Portico dispatch engine.
//!
//! Exposes plain handler types as remotely invocable operations. A request
//! addresses an operation by `(class id, method id)`; the engine resolves it
//! through an immutable [`Registry`], authorizes it against the session's
//! access level, binds request values and contextual objects to the
//! operation's declared parameters, obtains the per-session handler
//! instance, and runs the operation inline or on a spawned task with
//! try-lock admission control per named lock group.
//!
//! The transport layer is abstracted behind [`ApiRequest`] and
//! [`ApiResponse`]; [`Dispatcher::dispatch`] is the sole entry point and
//! never lets an error escape past its boundary.

pub mod bind;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod registry;
pub mod session;

pub use bind::Arg;
pub use convert::{ParamType, Value, convert};
pub use dispatch::Dispatcher;
pub use error::{BindError, ConvertError, DispatchError};
pub use host::{ApiRequest, ApiResponse};
pub use registry::{
    ContextParam, ExecMode, HandlerDescriptor, Operation, ParamSpec, Registry, RegistryBuilder,
};
pub use session::{DispatcherId, HandlerObject, HandlerTypeId, Session};
