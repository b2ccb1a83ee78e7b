//! Axum HTTP handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Host, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::checkout::{self, CheckoutForm};
use crate::config::Config;
use crate::db;
use crate::ipn::{self, IpnError};
use crate::models::{Payment, Pledge};
use crate::urls::UrlReverser;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pledges/:id/payment", get(checkout_page))
        .route("/pledges/:id/payments", get(get_pledge_payments))
        .route("/postfinance/ipn", post(ipn_callback))
        .route("/postfinance/declined", get(payment_declined))
        .route("/postfinance/exception", get(payment_exception))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct PaymentsResponse {
    pub pledge_id: i64,
    pub count: usize,
    pub payments: Vec<Payment>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct CheckoutQuery {
    /// Locale for the hosted payment page, e.g. `de_CH`.
    pub lang: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /pledges/:id/payment`
///
/// Renders the auto-submitting checkout form for a pledge.  The form posts
/// the signed parameter set straight to the Postfinance hosted page.
pub async fn checkout_page(
    State(state): State<Arc<AppState>>,
    Path(pledge_id): Path<i64>,
    Host(host): Host,
    Query(query): Query<CheckoutQuery>,
) -> impl IntoResponse {
    let pledge = match db::get_pledge(&state.pool, pledge_id).await {
        Ok(Some(pledge)) => pledge,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, "Pledge not found").into_response();
        }
        Err(e) => {
            error!("Checkout: pledge lookup failed: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    let urls = UrlReverser::from_host(&host);
    let locale = query.lang.as_deref().unwrap_or("en_US");

    match checkout::build(&pledge, &state.config, &urls, locale) {
        Ok(form) => Html(render_checkout(&pledge, &form)).into_response(),
        Err(e) => {
            error!("Checkout: could not build payment request: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// `GET /pledges/:id/payments`
///
/// Returns all processor-reported payment records for a pledge.
pub async fn get_pledge_payments(
    State(state): State<Arc<AppState>>,
    Path(pledge_id): Path<i64>,
) -> impl IntoResponse {
    match db::get_payments_for_pledge(&state.pool, pledge_id).await {
        Ok(payments) => {
            let count = payments.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(PaymentsResponse {
                    pledge_id,
                    count,
                    payments,
                })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}

/// `POST /postfinance/ipn`
///
/// The processor's instant payment notification.  Answered with the exact
/// body `OK` on success, a 403 with a short reason on rejection, and a
/// plain 500 when storage fails (the processor retries on non-2xx).
pub async fn ipn_callback(
    State(state): State<Arc<AppState>>,
    Form(params): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    match ipn::process(&state.pool, &state.config, &params).await {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(IpnError::Rejected(rejection)) => (StatusCode::FORBIDDEN, rejection.reason()),
        Err(IpnError::Infrastructure(e)) => {
            error!("IPN: processing failure {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// `GET /postfinance/declined`
///
/// Redirect target the processor sends declined customers back to.  Renders
/// unconditionally, substituting empty strings for missing parameters, and
/// never touches the pledge.
pub async fn payment_declined(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    debug!("Declined redirect: {params:?}");
    let order_id = params.get("ORDERID").map(String::as_str).unwrap_or("");
    let status = params.get("STATUS").map(String::as_str).unwrap_or("");
    Html(render_notice("Payment declined", order_id, status))
}

/// `GET /postfinance/exception`
///
/// Redirect target for payments that ended in a processor-side exception.
pub async fn payment_exception(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    debug!("Exception redirect: {params:?}");
    let order_id = params.get("ORDERID").map(String::as_str).unwrap_or("");
    let status = params.get("STATUS").map(String::as_str).unwrap_or("");
    Html(render_notice("Payment error", order_id, status))
}

// ─────────────────────────────────────────────────────────
// Page rendering
// ─────────────────────────────────────────────────────────

/// Minimal HTML attribute/text escaping for the rendered pages.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The auto-submitting hosted-payment form.
fn render_checkout(pledge: &Pledge, form: &CheckoutForm) -> String {
    let mut inputs = String::new();
    for (name, value) in &form.params {
        inputs.push_str(&format!(
            "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
            escape(name),
            escape(value)
        ));
    }
    for (name, value) in [
        ("language", form.locale.as_str()),
        ("accepturl", form.accept_url.as_str()),
        ("declineurl", form.decline_url.as_str()),
        ("exceptionurl", form.exception_url.as_str()),
        ("cancelurl", form.cancel_url.as_str()),
    ] {
        inputs.push_str(&format!(
            "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
            escape(name),
            escape(value)
        ));
    }

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>Redirecting to payment</title></head>\n\
         <body onload=\"document.forms[0].submit()\">\n\
         <p>You are being redirected to the payment page for {slug}&hellip;</p>\n\
         <form method=\"post\" action=\"{action}\">\n\
         {inputs}\
         \x20   <noscript><button type=\"submit\">Continue to payment</button></noscript>\n\
         </form>\n\
         </body>\n\
         </html>\n",
        slug = escape(&pledge.project_slug),
        action = escape(form.action_url),
        inputs = inputs,
    )
}

/// The declined / exception notice pages.
fn render_notice(title: &str, order_id: &str, status: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <p>Your payment was not completed.</p>\n\
         <p>Order: {order_id} (status {status})</p>\n\
         </body>\n\
         </html>\n",
        title = escape(title),
        order_id = escape(order_id),
        status = escape(status),
    )
}
