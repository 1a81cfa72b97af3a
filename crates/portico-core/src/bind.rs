//! Parameter binder — produces an operation's ordered argument list.

use std::sync::Arc;

use crate::convert::{Value, convert};
use crate::dispatch::Dispatcher;
use crate::error::BindError;
use crate::host::{ApiRequest, ApiResponse};
use crate::registry::{ContextParam, Operation, ParamSpec};
use crate::session::{HandlerObject, Session};

/// One bound argument.
#[derive(Clone)]
pub enum Arg {
    /// A converted request value.
    Value(Value),
    /// An optional request value that was not provided.
    Absent,
    Request(Arc<dyn ApiRequest>),
    Response(Arc<dyn ApiResponse>),
    Session(Arc<Session>),
    Dispatcher(Arc<Dispatcher>),
    /// Another handler's session instance, `None` if never created.
    Handler(Option<HandlerObject>),
}

impl Arg {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_int)
    }

    pub fn as_text(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_text)
    }

    pub fn as_request(&self) -> Option<&Arc<dyn ApiRequest>> {
        match self {
            Self::Request(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&Arc<dyn ApiResponse>> {
        match self {
            Self::Response(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_session(&self) -> Option<&Arc<Session>> {
        match self {
            Self::Session(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dispatcher(&self) -> Option<&Arc<Dispatcher>> {
        match self {
            Self::Dispatcher(d) => Some(d),
            _ => None,
        }
    }

    /// Downcast a contextual handler instance to its concrete type.
    pub fn as_handler<H: Send + Sync + 'static>(&self) -> Option<Arc<H>> {
        match self {
            Self::Handler(Some(object)) => object.clone().downcast::<H>().ok(),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Live objects the binder resolves contextual parameters against.
pub(crate) struct BindContext<'a> {
    pub dispatcher: &'a Arc<Dispatcher>,
    pub session: &'a Arc<Session>,
    pub request: &'a Arc<dyn ApiRequest>,
    pub response: &'a Arc<dyn ApiResponse>,
}

/// Bind every declared parameter, in declaration order.
///
/// The only side effect is possibly resolving another handler's existing
/// instance; binding never creates the instance of the operation being
/// dispatched.
pub(crate) fn bind(op: &Operation, cx: &BindContext<'_>) -> Result<Vec<Arg>, BindError> {
    op.params
        .iter()
        .map(|spec| match spec {
            ParamSpec::Context(param) => Ok(match param {
                ContextParam::Response => Arg::Response(cx.response.clone()),
                ContextParam::Request => Arg::Request(cx.request.clone()),
                ContextParam::Session => Arg::Session(cx.session.clone()),
                ContextParam::Dispatcher => Arg::Dispatcher(cx.dispatcher.clone()),
                ContextParam::Handler(ty) => {
                    Arg::Handler(cx.session.instance(cx.dispatcher.id(), *ty))
                }
            }),
            ParamSpec::Request { name, ty, optional } => match cx.request.value(name) {
                Some(text) => convert(&text, ty).map(Arg::Value).map_err(BindError::from),
                None if *optional => Ok(Arg::Absent),
                None => Err(BindError::Missing(name)),
            },
        })
        .collect()
}
