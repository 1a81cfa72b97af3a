//! HTTP transport for the portico dispatch engine.
//!
//! Adapts axum to the engine's host interfaces: the request path supplies
//! `(class id, method id)`, query-string values are the named request
//! values, and a cookie-backed session store scopes per-session state. The
//! HTTP exchange stays open until the (possibly spawned) unit of work
//! writes its result, so asynchronous operations complete against a live
//! response channel.

pub mod redirect;
pub mod server;
pub mod sessions;

pub use redirect::redirect_route;
pub use server::{api_routes, api_routes_with};
pub use sessions::{SESSION_COOKIE, SessionStore};
