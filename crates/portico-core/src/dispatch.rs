//! The dispatcher — resolves, authorizes, binds, and executes operations.

use std::sync::{Arc, Weak};

use tracing::{debug, error, info, warn};

use crate::bind::{BindContext, bind};
use crate::error::DispatchError;
use crate::host::{ApiRequest, ApiResponse};
use crate::registry::{ExecMode, InvokeFn, Registry};
use crate::session::{DispatcherId, HandlerObject, Session};

/// Orchestrates one dispatch per request against an immutable [`Registry`].
///
/// Stateless apart from its identity; all per-session state lives in
/// [`Session`]. Safe to share across all sessions and concurrent requests.
pub struct Dispatcher {
    id: DispatcherId,
    registry: Registry,
    self_ref: Weak<Dispatcher>,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id: DispatcherId::next(),
            registry,
            self_ref: weak.clone(),
        })
    }

    pub fn id(&self) -> DispatcherId {
        self.id
    }

    /// Store `level` for this dispatcher on the session.
    pub fn set_access_level(&self, session: &Session, level: i64) {
        session.set_access_level(self.id, level);
    }

    /// The session's access level for this dispatcher, `-1` if unset.
    pub fn access_level(&self, session: &Session) -> i64 {
        session.access_level(self.id)
    }

    /// The sole entry point. Never propagates an error past its boundary:
    /// every failure becomes a single generic error response. For an
    /// asynchronous operation this returns before the operation's body has
    /// completed; the spawned unit of work writes to the response channel.
    pub async fn dispatch(
        &self,
        class_id: &str,
        method_id: &str,
        request: Arc<dyn ApiRequest>,
        response: Arc<dyn ApiResponse>,
    ) {
        info!(class = class_id, method = method_id, "dispatch");

        if let Err(err) = self
            .try_dispatch(class_id, method_id, request, response.clone())
            .await
        {
            fail(&response, &err);
        }
    }

    async fn try_dispatch(
        &self,
        class_id: &str,
        method_id: &str,
        request: Arc<dyn ApiRequest>,
        response: Arc<dyn ApiResponse>,
    ) -> Result<(), DispatchError> {
        let descriptor = self
            .registry
            .resolve(class_id)
            .ok_or_else(|| DispatchError::ClassNotFound(class_id.to_owned()))?
            .clone();

        let session = request.session();
        let level = session.access_level(self.id);
        debug!(level, "session access level");

        let op = descriptor
            .find(method_id)
            .ok_or_else(|| DispatchError::MethodNotFound(method_id.to_owned()))?;

        if op.access_level > level {
            return Err(DispatchError::AccessDenied {
                required: op.access_level,
                level,
            });
        }

        // The dispatcher is always constructed through `new`, so the weak
        // self-reference is upgradable while `&self` is alive.
        let this = self
            .self_ref
            .upgrade()
            .expect("dispatcher constructed outside Arc");
        let cx = BindContext {
            dispatcher: &this,
            session: &session,
            request: &request,
            response: &response,
        };
        let args = bind(op, &cx)?;

        let instance = if op.is_static {
            None
        } else {
            Some(session.instance_or_create(self.id, &descriptor)?)
        };

        let mode = op.mode;
        let lock_group = op.lock_group;
        let invoke = op.invoke.clone();
        let dispatcher_id = self.id;

        // Deferred unit of work: admission control, invocation, lock
        // release on every path, then result or error to the response.
        let work = async move {
            match run_operation(dispatcher_id, &session, lock_group, invoke, instance, args).await {
                Ok(value) => {
                    if let Err(write_err) = response.write_result(value) {
                        error!("failed to write result: {write_err:#}");
                    }
                }
                Err(err) => fail(&response, &err),
            }
        };

        match mode {
            ExecMode::Async => {
                tokio::spawn(work);
            }
            ExecMode::Sync => work.await,
        }

        Ok(())
    }
}

/// Acquire the lock group (non-blocking), invoke, release on drop.
async fn run_operation(
    dispatcher: DispatcherId,
    session: &Arc<Session>,
    lock_group: &str,
    invoke: InvokeFn,
    instance: Option<HandlerObject>,
    args: Vec<crate::bind::Arg>,
) -> Result<serde_json::Value, DispatchError> {
    let _guard = match session.lock_handle(dispatcher, lock_group) {
        Some(lock) => match lock.try_lock_owned() {
            Ok(guard) => Some(guard),
            // Admission control: reject, never queue.
            Err(_) => {
                return Err(DispatchError::AsyncBusy {
                    group: lock_group.to_owned(),
                });
            }
        },
        None => None,
    };

    invoke(instance, args)
        .await
        .map_err(DispatchError::Invocation)
}

/// Translate any failure into the single generic error response. A failure
/// to write even that is logged only.
fn fail(response: &Arc<dyn ApiResponse>, err: &DispatchError) {
    warn!("dispatch failed: {err}");
    if let Err(write_err) = response.send_error() {
        error!("failed to write error response: {write_err:#}");
    }
}
