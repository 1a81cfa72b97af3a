//! End-to-end HTTP tests: session cookies, dispatch through the axum
//! transport, error status mapping, and the redirect route.

use std::sync::Arc;

use parking_lot::Mutex;
use portico_core::{
    Arg, ContextParam, Dispatcher, HandlerDescriptor, Operation, ParamSpec, ParamType, Registry,
};
use portico_http::{SESSION_COOKIE, SessionStore, api_routes_with, redirect_route};
use serde_json::{Value, json};

#[derive(Default)]
struct Counter {
    total: Mutex<i64>,
}

#[derive(Default)]
struct Auth;

fn test_registry() -> Registry {
    let counter = HandlerDescriptor::new::<Counter>()
        .operation(
            Operation::instance("add", 0, |_c: Arc<Counter>, args: Vec<Arg>| async move {
                let a = args[0].as_int().unwrap();
                let b = args[1].as_int().unwrap();
                Ok(json!(a + b))
            })
            .param(ParamSpec::request("a", ParamType::Int))
            .param(ParamSpec::request("b", ParamType::Int)),
        )
        .operation(
            Operation::instance(
                "accumulate",
                0,
                |c: Arc<Counter>, args: Vec<Arg>| async move {
                    let amount = args[0].as_int().unwrap();
                    let mut total = c.total.lock();
                    *total += amount;
                    Ok(json!({ "total": *total }))
                },
            )
            .param(ParamSpec::request("amount", ParamType::Int)),
        )
        .operation(Operation::instance(
            "secret",
            1,
            |_c: Arc<Counter>, _args: Vec<Arg>| async move { Ok(json!("classified")) },
        ));

    let auth = HandlerDescriptor::new::<Auth>().operation(
        Operation::function("login", 0, |args: Vec<Arg>| async move {
            let dispatcher = args[0].as_dispatcher().unwrap();
            let session = args[1].as_session().unwrap();
            if args[2].as_text() != Some("sesame") {
                anyhow::bail!("wrong password");
            }
            dispatcher.set_access_level(session, 1);
            Ok(json!({ "level": 1 }))
        })
        .param(ParamSpec::context(ContextParam::Dispatcher))
        .param(ParamSpec::context(ContextParam::Session))
        .param(ParamSpec::request("password", ParamType::Text)),
    );

    Registry::builder()
        .class("counter", counter)
        .class("auth", auth)
        .build()
}

/// Serve the test app on an OS-assigned port, returning its base URL.
async fn start_test_server() -> String {
    let dispatcher = Dispatcher::new(test_registry());
    let guest = dispatcher.clone();
    let sessions =
        SessionStore::with_initializer(move |session| guest.set_access_level(session, 0));

    let app = api_routes_with(dispatcher, sessions)
        .route("/", redirect_route("/counter/add?a=2&b=3"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// The session cookie value from a response's Set-Cookie header, if any.
fn session_cookie(response: &reqwest::Response) -> Option<String> {
    let header = response.headers().get(reqwest::header::SET_COOKIE)?;
    let (name, rest) = header.to_str().ok()?.split_once('=')?;
    assert_eq!(name, SESSION_COOKIE);
    Some(rest.split(';').next().unwrap_or(rest).to_owned())
}

mod dispatching {
    use super::*;

    #[tokio::test]
    async fn add_returns_json_result() {
        let base = start_test_server().await;

        let response = reqwest::get(format!("{base}/counter/add?a=2&b=3"))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert!(session_cookie(&response).is_some());
        assert_eq!(response.json::<Value>().await.unwrap(), json!(5));
    }

    #[tokio::test]
    async fn unknown_class_maps_to_conflict() {
        let base = start_test_server().await;

        let response = reqwest::get(format!("{base}/nothing/here")).await.unwrap();
        assert_eq!(response.status(), 409);
    }

    #[tokio::test]
    async fn malformed_value_maps_to_conflict() {
        let base = start_test_server().await;

        let response = reqwest::get(format!("{base}/counter/add?a=two&b=3"))
            .await
            .unwrap();
        assert_eq!(response.status(), 409);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn cookie_carries_handler_state_across_requests() {
        let base = start_test_server().await;
        let client = reqwest::Client::new();

        let first = client
            .get(format!("{base}/counter/accumulate?amount=5"))
            .send()
            .await
            .unwrap();
        let cookie = session_cookie(&first).expect("new session sets a cookie");
        assert_eq!(
            first.json::<Value>().await.unwrap(),
            json!({ "total": 5 })
        );

        let second = client
            .get(format!("{base}/counter/accumulate?amount=3"))
            .header(
                reqwest::header::COOKIE,
                format!("{SESSION_COOKIE}={cookie}"),
            )
            .send()
            .await
            .unwrap();
        // Same session: the instance (and its total) is reused, and no new
        // cookie is issued.
        assert!(session_cookie(&second).is_none());
        assert_eq!(
            second.json::<Value>().await.unwrap(),
            json!({ "total": 8 })
        );
    }

    #[tokio::test]
    async fn requests_without_the_cookie_get_separate_sessions() {
        let base = start_test_server().await;

        let first = reqwest::get(format!("{base}/counter/accumulate?amount=5"))
            .await
            .unwrap();
        assert_eq!(
            first.json::<Value>().await.unwrap(),
            json!({ "total": 5 })
        );

        let second = reqwest::get(format!("{base}/counter/accumulate?amount=5"))
            .await
            .unwrap();
        assert_eq!(
            second.json::<Value>().await.unwrap(),
            json!({ "total": 5 })
        );
    }

    #[tokio::test]
    async fn login_raises_the_access_level_for_the_session() {
        let base = start_test_server().await;
        let client = reqwest::Client::new();

        let denied = client
            .get(format!("{base}/counter/secret"))
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 409);
        let cookie = session_cookie(&denied).expect("new session sets a cookie");

        let login = client
            .get(format!("{base}/auth/login?password=sesame"))
            .header(
                reqwest::header::COOKIE,
                format!("{SESSION_COOKIE}={cookie}"),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(login.status(), 200);

        let allowed = client
            .get(format!("{base}/counter/secret"))
            .header(
                reqwest::header::COOKIE,
                format!("{SESSION_COOKIE}={cookie}"),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), 200);
        assert_eq!(allowed.json::<Value>().await.unwrap(), json!("classified"));
    }

    #[tokio::test]
    async fn wrong_password_is_the_generic_error_and_grants_nothing() {
        let base = start_test_server().await;
        let client = reqwest::Client::new();

        let login = client
            .get(format!("{base}/auth/login?password=guess"))
            .send()
            .await
            .unwrap();
        assert_eq!(login.status(), 409);
        let cookie = session_cookie(&login).expect("new session sets a cookie");

        let still_denied = client
            .get(format!("{base}/counter/secret"))
            .header(
                reqwest::header::COOKIE,
                format!("{SESSION_COOKIE}={cookie}"),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(still_denied.status(), 409);
    }
}

mod redirects {
    use super::*;

    #[tokio::test]
    async fn root_redirects_unconditionally() {
        let base = start_test_server().await;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        let response = client.get(&base).send().await.unwrap();
        assert_eq!(response.status(), 307);
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/counter/add?a=2&b=3")
        );
    }
}
