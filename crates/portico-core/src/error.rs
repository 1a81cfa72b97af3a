//! Dispatch error taxonomy.
//!
//! Every failure on the way to (or inside) an operation invocation is one of
//! these kinds. The dispatcher funnels all of them into a single generic
//! error response — the kind distinctions exist for logging and for tests,
//! not for the wire.

use thiserror::Error;

use crate::convert::ParamType;

/// Top-level dispatch failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler class registered under the given class identifier.
    #[error("unknown api class {0:?}")]
    ClassNotFound(String),

    /// The handler class declares no operation with the given name.
    #[error("no operation named {0:?}")]
    MethodNotFound(String),

    /// The session's access level is below the operation's minimum.
    #[error("access denied: operation requires level {required}, session has {level}")]
    AccessDenied { required: i64, level: i64 },

    /// Parameter binding failed before the operation ran.
    #[error("parameter binding failed: {0}")]
    Binding(#[from] BindError),

    /// The handler's factory failed to construct an instance.
    #[error("handler construction failed: {0:#}")]
    Instantiation(anyhow::Error),

    /// An invocation in the same lock group is already running.
    #[error("operation already running in lock group {group:?}")]
    AsyncBusy { group: String },

    /// The operation itself raised; wraps whatever it raised.
    #[error("operation failed: {0:#}")]
    Invocation(anyhow::Error),
}

/// Failure while producing an operation's argument list.
#[derive(Debug, Error)]
pub enum BindError {
    /// A non-optional request-bound parameter had no value.
    #[error("missing required request value {0:?}")]
    Missing(&'static str),

    /// The request value could not be converted to the declared type.
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Failure converting a textual request value to a target type.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The text does not parse as the requested scalar type.
    #[error("cannot parse {text:?} as {target}")]
    Parse {
        text: String,
        target: ParamType,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The text is not a valid encoded array of strings.
    #[error("malformed array value {text:?}")]
    Array {
        text: String,
        source: serde_json::Error,
    },
}
