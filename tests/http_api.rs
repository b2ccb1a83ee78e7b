//! HTTP surface tests: routing, status codes and response bodies.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::*;
use pledgepay::api::{router, AppState};

fn form_body(params: &HashMap<String, String>) -> String {
    serde_urlencoded::to_string(params).expect("encode form")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn test_app() -> (axum::Router, sqlx::SqlitePool) {
    let pool = test_pool().await;
    let state = Arc::new(AppState {
        pool: pool.clone(),
        config: test_config(),
    });
    (router(state), pool)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("\"status\":\"ok\""));
}

#[tokio::test]
async fn checkout_page_renders_signed_auto_submit_form() {
    let (app, pool) = test_app().await;
    insert_pledge(&pool, 7, "gardenproject", "35.00", "CHF", "unauthorized").await;

    let response = app
        .oneshot(
            Request::get("/pledges/7/payment?lang=de_CH")
                .header(header::HOST, "crowd.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("ncol/test/orderstandard.asp"));
    assert!(body.contains("name=\"orderID\" value=\"gardenproject-7\""));
    assert!(body.contains("name=\"amount\" value=\"3500\""));
    assert!(body.contains("name=\"currency\" value=\"CHF\""));
    assert!(body.contains("name=\"mode\" value=\"test\""));
    assert!(body.contains("name=\"SHASign\""));
    assert!(body.contains("name=\"language\" value=\"de_CH\""));
    assert!(body.contains("name=\"accepturl\" value=\"http://crowd.example.com/pledges/thankyou\""));
    assert!(body.contains("name=\"cancelurl\" value=\"http://crowd.example.com/pledges/cancel\""));
}

#[tokio::test]
async fn checkout_page_for_unknown_pledge_is_404() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(
            Request::get("/pledges/99/payment")
                .header(header::HOST, "crowd.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn valid_ipn_is_acknowledged_with_ok() {
    let (app, pool) = test_app().await;
    let config = test_config();
    insert_pledge(&pool, 7, "gardenproject", "35.00", "CHF", "unauthorized").await;

    let params = ipn_params(&config, "gardenproject-7", "3500", "CHF", "9", "300001");
    let response = app
        .oneshot(
            Request::post("/postfinance/ipn")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body(&params)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
    assert_eq!(pledge_status(&pool, 7).await, "paid");
}

#[tokio::test]
async fn tampered_ipn_is_forbidden_with_reason() {
    let (app, pool) = test_app().await;
    let config = test_config();
    insert_pledge(&pool, 7, "gardenproject", "35.00", "CHF", "unauthorized").await;

    let mut params = ipn_params(&config, "gardenproject-7", "3500", "CHF", "9", "300001");
    let bad = tamper(&params["SHASIGN"]);
    params.insert("SHASIGN".to_string(), bad);

    let response = app
        .oneshot(
            Request::post("/postfinance/ipn")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body(&params)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response).await, "Hash did not validate");
    assert_eq!(payment_count(&pool, "gardenproject-7").await, 0);
}

#[tokio::test]
async fn ipn_values_with_reserved_characters_survive_form_encoding() {
    let (app, pool) = test_app().await;
    let config = test_config();
    insert_pledge(&pool, 7, "gardenproject", "35.00", "CHF", "unauthorized").await;

    // A payment method with spaces and an ampersand must round-trip
    // through the form encoding and still verify.
    let pm = "Postfinance card & e-finance";
    let mut params = ipn_params(&config, "gardenproject-7", "3500", "CHF", "9", "300001");
    params.insert("PM".to_string(), pm.to_string());
    let shasign = pledgepay::signature::sign(
        &[
            "gardenproject-7",
            "CHF",
            "3500",
            pm,
            "test123",
            "9",
            "XXXXXXXXXXXX1111",
            "300001",
            "0",
            "VISA",
        ],
        &config.sha1_out,
    );
    params.insert("SHASIGN".to_string(), shasign);

    let response = app
        .oneshot(
            Request::post("/postfinance/ipn")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body(&params)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");

    let (stored_pm,): (String,) =
        sqlx::query_as("SELECT pm FROM payments WHERE order_id = 'gardenproject-7'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored_pm, pm);
}

#[tokio::test]
async fn ipn_with_missing_fields_is_forbidden() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(
            Request::post("/postfinance/ipn")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("orderID=gardenproject-7"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(response).await, "Missing data");
}

#[tokio::test]
async fn pledge_payments_endpoint_lists_stored_records() {
    let (app, pool) = test_app().await;
    let config = test_config();
    insert_pledge(&pool, 7, "gardenproject", "35.00", "CHF", "unauthorized").await;

    let params = ipn_params(&config, "gardenproject-7", "3500", "CHF", "5", "300001");
    pledgepay::ipn::process(&pool, &config, &params)
        .await
        .expect("accepted");

    let response = app
        .oneshot(
            Request::get("/pledges/7/payments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("\"count\":1"));
    assert!(body.contains("\"payid\":\"300001\""));
}

#[tokio::test]
async fn declined_page_renders_even_without_parameters() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(
            Request::get("/postfinance/declined")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Payment declined"));
}

#[tokio::test]
async fn exception_page_echoes_order_id_and_status() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(
            Request::get("/postfinance/exception?ORDERID=gardenproject-7&STATUS=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("gardenproject-7"));
    assert!(body.contains("status 2"));
}
