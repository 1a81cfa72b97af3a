//! Portico demo server.
//!
//! Wires a sample operation registry to the HTTP transport:
//!   /calc/add?a=2&b=3          stateless arithmetic
//!   /calc/accumulate?amount=5  per-session handler state
//!   /calc/sum?values=[...]     array-typed request value
//!   /calc/work                 asynchronous, lock-group guarded (level 1)
//!   /auth/login?password=...   raises the session access level
//!
//! New sessions start at access level 0; `auth/login` grants level 1.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use portico_core::{
    Arg, ContextParam, Dispatcher, HandlerDescriptor, Operation, ParamSpec, ParamType, Registry,
};
use portico_http::{SessionStore, api_routes_with, redirect_route};
use serde_json::json;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portico", about = "Portico demo server — method dispatch over HTTP")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "7070")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// Arithmetic handler with per-session accumulated state.
#[derive(Default)]
struct Calc {
    total: Mutex<i64>,
}

/// Stateless login handler; its only operation is static.
#[derive(Default)]
struct Auth;

fn build_registry() -> Registry {
    let calc = HandlerDescriptor::new::<Calc>()
        .operation(
            Operation::instance("add", 0, |_calc: Arc<Calc>, args: Vec<Arg>| async move {
                let a = args[0].as_int().context("a must be an integer")?;
                let b = args[1].as_int().context("b must be an integer")?;
                Ok(json!(a + b))
            })
            .param(ParamSpec::request("a", ParamType::Int))
            .param(ParamSpec::request("b", ParamType::Int)),
        )
        .operation(
            Operation::instance(
                "accumulate",
                0,
                |calc: Arc<Calc>, args: Vec<Arg>| async move {
                    let amount = args[0].as_int().context("amount must be an integer")?;
                    let mut total = calc.total.lock();
                    *total += amount;
                    Ok(json!({ "total": *total }))
                },
            )
            .param(ParamSpec::request("amount", ParamType::Int)),
        )
        .operation(
            Operation::instance("sum", 0, |_calc: Arc<Calc>, args: Vec<Arg>| async move {
                let values = args[0]
                    .as_value()
                    .and_then(|v| v.as_array())
                    .context("values must be an integer array")?;
                let sum: i64 = values.iter().filter_map(|v| v.as_int()).sum();
                Ok(json!(sum))
            })
            .param(ParamSpec::request(
                "values",
                ParamType::array(ParamType::Int),
            )),
        )
        .operation(
            Operation::instance("work", 1, |calc: Arc<Calc>, _args: Vec<Arg>| async move {
                // Stands in for a long-running job; a second concurrent
                // call in the "calc" group is rejected, not queued.
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                Ok(json!({ "done": true, "total": *calc.total.lock() }))
            })
            .asynchronous()
            .lock_group("calc"),
        );

    let auth = HandlerDescriptor::new::<Auth>().operation(
        Operation::function("login", 0, |args: Vec<Arg>| async move {
            let dispatcher = args[0].as_dispatcher().context("dispatcher context")?;
            let session = args[1].as_session().context("session context")?;
            let password = args[2].as_text().context("password must be text")?;
            if password != "opensesame" {
                anyhow::bail!("invalid password");
            }
            dispatcher.set_access_level(session, 1);
            Ok(json!({ "level": 1 }))
        })
        .param(ParamSpec::context(ContextParam::Dispatcher))
        .param(ParamSpec::context(ContextParam::Session))
        .param(ParamSpec::request("password", ParamType::Text)),
    );

    Registry::builder()
        .class("calc", calc)
        .class("auth", auth)
        .build()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let dispatcher = Dispatcher::new(build_registry());

    // Fresh sessions get the guest tier so level-0 operations are callable.
    let guest = dispatcher.clone();
    let sessions = SessionStore::with_initializer(move |session| guest.set_access_level(session, 0));

    let app = api_routes_with(dispatcher, sessions)
        .route("/", redirect_route("/calc/add?a=2&b=3"));

    let addr = format!("{}:{}", cli.hostname, cli.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or(addr);
    println!("portico listening on http://{local}");
    println!("try: curl http://{local}/calc/add?a=2\\&b=3");

    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
