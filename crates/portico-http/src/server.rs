//! Axum routes adapting HTTP requests to the dispatch engine.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use parking_lot::Mutex;
use portico_core::{ApiRequest, ApiResponse, Dispatcher, Session};
use tokio::sync::oneshot;

use crate::sessions::{SESSION_COOKIE, SessionStore};

struct AppState {
    dispatcher: Arc<Dispatcher>,
    sessions: SessionStore,
}

/// Routes for `/{class}/{method}` against the dispatcher, with a fresh
/// session store.
pub fn api_routes(dispatcher: Arc<Dispatcher>) -> Router {
    api_routes_with(dispatcher, SessionStore::new())
}

/// Routes for `/{class}/{method}` against the dispatcher, using the given
/// session store.
pub fn api_routes_with(dispatcher: Arc<Dispatcher>, sessions: SessionStore) -> Router {
    let state = Arc::new(AppState {
        dispatcher,
        sessions,
    });
    Router::new()
        .route("/{class}/{method}", get(api_handler))
        .with_state(state)
}

/// Adapts query-string values and the stored session to [`ApiRequest`].
struct HttpRequest {
    values: HashMap<String, String>,
    session: Arc<Session>,
}

impl ApiRequest for HttpRequest {
    fn value(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn session(&self) -> Arc<Session> {
        self.session.clone()
    }
}

enum Outcome {
    Result(serde_json::Value),
    Error,
}

/// Oneshot-backed [`ApiResponse`]: the HTTP handler awaits the receiver,
/// keeping the exchange open until the (possibly spawned) unit of work
/// writes exactly one outcome.
struct HttpResponse {
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl HttpResponse {
    fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    fn send(&self, outcome: Outcome) -> anyhow::Result<()> {
        let tx = self
            .tx
            .lock()
            .take()
            .context("response already written")?;
        tx.send(outcome)
            .map_err(|_| anyhow::anyhow!("response channel closed"))
    }
}

impl ApiResponse for HttpResponse {
    fn write_result(&self, value: serde_json::Value) -> anyhow::Result<()> {
        self.send(Outcome::Result(value))
    }

    fn send_error(&self) -> anyhow::Result<()> {
        self.send(Outcome::Error)
    }
}

async fn api_handler(
    Path((class, method)): Path<(String, String)>,
    Query(values): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let cookie = session_cookie(&headers);
    let (session_id, session, created) = state.sessions.get_or_create(cookie.as_deref());

    let request: Arc<dyn ApiRequest> = Arc::new(HttpRequest { values, session });
    let (response, rx) = HttpResponse::channel();
    let response: Arc<dyn ApiResponse> = Arc::new(response);

    state
        .dispatcher
        .dispatch(&class, &method, request, response)
        .await;

    // No timeout: an offloaded operation writes whenever it finishes, and
    // the exchange stays open until then. A dropped sender (the work never
    // wrote anything) degrades to the generic error.
    let outcome = rx.await.unwrap_or(Outcome::Error);

    let mut res = match outcome {
        Outcome::Result(value) => Json(value).into_response(),
        Outcome::Error => StatusCode::CONFLICT.into_response(),
    };

    if created {
        let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            res.headers_mut().insert(header::SET_COOKIE, value);
        }
    }

    res
}

/// The session cookie value from the request headers, if any.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_owned())
    })
}
