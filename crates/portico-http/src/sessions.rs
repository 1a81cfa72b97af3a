//! Cookie-backed session store.

use std::sync::Arc;

use dashmap::DashMap;
use portico_core::Session;
use tracing::debug;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "portico-session";

type InitFn = Arc<dyn Fn(&Session) + Send + Sync>;

/// Owns the live sessions for this process, keyed by cookie value.
///
/// Sessions are created on first contact and live for the lifetime of the
/// process; the engine itself never persists anything beyond them.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    init: Option<InitFn>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that runs `init` on every newly created session — e.g. to
    /// grant a baseline access level before the first dispatch.
    pub fn with_initializer(init: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        Self {
            sessions: DashMap::new(),
            init: Some(Arc::new(init)),
        }
    }

    /// The session for the presented cookie value, creating a fresh one
    /// when the cookie is absent or unknown. Returns the session id, the
    /// session, and whether it was just created.
    pub fn get_or_create(&self, cookie: Option<&str>) -> (String, Arc<Session>, bool) {
        if let Some(id) = cookie {
            if let Some(existing) = self.sessions.get(id) {
                return (id.to_owned(), existing.clone(), false);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new());
        if let Some(init) = &self.init {
            init(&session);
        }
        self.sessions.insert(id.clone(), session.clone());
        debug!(session = %id, "session created");
        (id, session, true)
    }
}
