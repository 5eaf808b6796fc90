//! Server-side harness for Tetto agents.
//!
//! An agent is an HTTP endpoint the marketplace invokes after payment
//! settles. This crate turns a plain async handler function into that
//! endpoint: it parses the dispatch body, hands the handler its `input`
//! and the optional [`TettoContext`], and maps every outcome to the
//! response shape the platform expects. Handler failures become HTTP 500
//! bodies; they never take the process down.
//!
//! ```no_run
//! use actix_web::{web, App, HttpServer};
//! use serde_json::{json, Value};
//! use tetto::TettoContext;
//!
//! async fn summarize(input: Value, _ctx: Option<TettoContext>) -> Result<Value, String> {
//!     let text = input["text"].as_str().ok_or("missing text")?;
//!     Ok(json!({ "summary": text.chars().take(80).collect::<String>() }))
//! }
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| {
//!         App::new().route(
//!             "/",
//!             web::post().to(|body: web::Bytes| async move {
//!                 tetto_agent::handle_request(summarize, &body).await
//!             }),
//!         )
//!     })
//!     .bind(("0.0.0.0", 8080))?
//!     .run()
//!     .await
//! }
//! ```

use std::future::Future;

use actix_web::HttpResponse;
use serde_json::{json, Value};
use tetto::TettoContext;

/// Dispatch body the platform POSTs to an agent endpoint.
///
/// `tetto_context` is absent or `null` for callers predating identity
/// propagation; the handler sees `None` either way.
#[derive(Debug, serde::Deserialize)]
struct DispatchBody {
    input: Option<Value>,
    #[serde(default)]
    tetto_context: Option<TettoContext>,
}

/// Run `handler` against a raw dispatch body and produce the HTTP
/// response the platform expects.
///
/// Malformed JSON and a missing `input` field are the caller's fault
/// (400); anything the handler itself reports is a 500 with the
/// handler's message. Success returns the handler's output verbatim.
pub async fn handle_request<H, Fut>(handler: H, body: &[u8]) -> HttpResponse
where
    H: Fn(Value, Option<TettoContext>) -> Fut,
    Fut: Future<Output = Result<Value, String>>,
{
    let dispatch: DispatchBody = match serde_json::from_slice(body) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            tracing::warn!(error = %e, "rejected dispatch with invalid JSON");
            return HttpResponse::BadRequest()
                .json(json!({ "error": format!("invalid JSON in request body: {e}") }));
        }
    };

    let input = match dispatch.input {
        Some(input) => input,
        None => {
            tracing::warn!("rejected dispatch without input field");
            return HttpResponse::BadRequest()
                .json(json!({ "error": "missing input field in request body" }));
        }
    };

    if let Some(ctx) = &dispatch.tetto_context {
        tracing::debug!(
            caller_wallet = %ctx.caller_wallet,
            caller_agent_id = ctx.caller_agent_id.as_deref(),
            "dispatch carries caller context"
        );
    }

    match handler(input, dispatch.tetto_context).await {
        Ok(output) => HttpResponse::Ok().json(output),
        Err(message) => {
            tracing::error!(error = %message, "agent handler failed");
            HttpResponse::InternalServerError().json(json!({ "error": message }))
        }
    }
}

/// Adapt a context-unaware handler to [`handle_request`]'s signature.
///
/// Existing agents written before identity propagation take only the
/// input; wrap them with this instead of changing their signature.
pub fn without_context<H, Fut>(
    handler: H,
) -> impl Fn(Value, Option<TettoContext>) -> Fut
where
    H: Fn(Value) -> Fut,
    Fut: Future<Output = Result<Value, String>>,
{
    move |input, _ctx| handler(input)
}
