//! Unconditional redirect route.

use axum::response::Redirect;
use axum::routing::{MethodRouter, get};

/// A route that redirects every request to `to` (307).
pub fn redirect_route(to: &str) -> MethodRouter {
    let to = to.to_owned();
    get(move || {
        let to = to.clone();
        async move { Redirect::temporary(&to) }
    })
}
