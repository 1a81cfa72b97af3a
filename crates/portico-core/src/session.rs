//! Per-session state: access levels, handler instances, and lock handles.
//!
//! A [`Session`] is a typed record owned by the host environment and scoped
//! to one client session. Everything in it is created on first demand and
//! lives until the host drops the session. All keys are scoped by
//! [`DispatcherId`] so multiple dispatchers sharing one session do not
//! collide.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::DispatchError;
use crate::registry::HandlerDescriptor;

/// Identity of one dispatcher instance, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatcherId(u64);

impl DispatcherId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a concrete handler type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerTypeId(TypeId);

impl HandlerTypeId {
    pub fn of<H: 'static>() -> Self {
        Self(TypeId::of::<H>())
    }
}

/// A type-erased handler instance.
pub type HandlerObject = Arc<dyn Any + Send + Sync>;

/// Access level meaning "no access granted".
pub const NO_ACCESS: i64 = -1;

#[derive(Default)]
struct SessionState {
    access_levels: HashMap<DispatcherId, i64>,
    instances: HashMap<(DispatcherId, HandlerTypeId), HandlerObject>,
    locks: HashMap<(DispatcherId, String), Arc<tokio::sync::Mutex<()>>>,
}

/// State attached to one client session.
///
/// Safe to share across concurrent in-flight requests for the same session;
/// create-if-absent for instances and locks is atomic under the internal
/// mutex, so two concurrent first invocations construct exactly one
/// instance or lock.
#[derive(Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The access level stored for `dispatcher`, or [`NO_ACCESS`] if unset.
    pub fn access_level(&self, dispatcher: DispatcherId) -> i64 {
        self.state
            .lock()
            .access_levels
            .get(&dispatcher)
            .copied()
            .unwrap_or(NO_ACCESS)
    }

    pub fn set_access_level(&self, dispatcher: DispatcherId, level: i64) {
        self.state.lock().access_levels.insert(dispatcher, level);
    }

    /// The handler instance for `(dispatcher, ty)`, without creating one.
    pub fn instance(&self, dispatcher: DispatcherId, ty: HandlerTypeId) -> Option<HandlerObject> {
        self.state.lock().instances.get(&(dispatcher, ty)).cloned()
    }

    /// The handler instance for the descriptor's type, creating it through
    /// the descriptor's factory on first demand.
    ///
    /// The factory runs under the session mutex so concurrent first
    /// invocations construct exactly one instance.
    pub(crate) fn instance_or_create(
        &self,
        dispatcher: DispatcherId,
        descriptor: &HandlerDescriptor,
    ) -> Result<HandlerObject, DispatchError> {
        let key = (dispatcher, descriptor.type_id());
        let mut state = self.state.lock();
        if let Some(existing) = state.instances.get(&key) {
            return Ok(existing.clone());
        }
        let created = descriptor.create().map_err(DispatchError::Instantiation)?;
        state.instances.insert(key, created.clone());
        Ok(created)
    }

    /// The lock handle for `(dispatcher, group)`, created on first use.
    /// An empty group name means "no locking" and yields `None`. The lock
    /// stays cached for the session's lifetime.
    pub(crate) fn lock_handle(
        &self,
        dispatcher: DispatcherId,
        group: &str,
    ) -> Option<Arc<tokio::sync::Mutex<()>>> {
        if group.is_empty() {
            return None;
        }
        let mut state = self.state.lock();
        let lock = state
            .locks
            .entry((dispatcher, group.to_owned()))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())));
        Some(lock.clone())
    }
}
