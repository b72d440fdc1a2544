//! Tests for the `http` crate adapters used by hosts built on `http` types

#![allow(clippy::unwrap_used, clippy::expect_used)]

use conneg::generator::from_sync_fn;
use conneg::ids::RequestId;
use conneg::message::{StatusText, OVERRIDE_STATUS_TEXT};
use conneg::{NegotiationRequest, NegotiationResponse, Negotiator};
use http::{HeaderValue, Method};
use serde_json::json;

#[test]
fn test_from_http_copies_method_uri_and_headers() {
    let id = RequestId::new();
    let mut req = http::Request::builder()
        .method(Method::POST)
        .uri("https://example.test/pets?limit=2")
        .header("Accept", "text/html")
        .header("x-request-id", id.to_string())
        .body(())
        .unwrap();
    req.headers_mut()
        .insert("x-binary", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

    let converted = NegotiationRequest::from_http(&req);
    assert_eq!(converted.method, Method::POST);
    assert_eq!(converted.url, "https://example.test/pets?limit=2");
    assert_eq!(converted.get_header("accept"), Some("text/html"));
    assert_eq!(converted.request_id, id);
    assert_eq!(converted.get_header("x-binary"), None);
    assert!(converted.body.is_none());
}

#[test]
fn test_into_http_writes_text_body_raw() {
    let res = NegotiationResponse::text(200, "text/html", "<h1>hi</h1>")
        .into_http()
        .unwrap();
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(res.body(), b"<h1>hi</h1>");
    assert!(res.extensions().get::<StatusText>().is_none());
}

#[test]
fn test_into_http_serializes_json_and_adds_content_type() {
    let res = NegotiationResponse::new(200, Default::default(), json!({ "data": null }))
        .into_http()
        .unwrap();
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body, json!({ "data": null }));
}

#[test]
fn test_error_response_renders_json_body() {
    let res = NegotiationResponse::error(503, "upstream unavailable")
        .into_http()
        .unwrap();
    assert_eq!(res.status(), http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body, json!({ "error": "upstream unavailable" }));
}

#[test]
fn test_into_http_rejects_impossible_status() {
    assert!(NegotiationResponse::json(42, json!(null)).into_http().is_err());
}

#[tokio::test]
async fn test_round_trip_through_negotiator_keeps_override_marker() {
    let mut negotiator = Negotiator::new();
    negotiator
        .register(
            "text/plain",
            from_sync_fn(|_req| Ok(Some(NegotiationResponse::text(503, "text/plain", "busy")))),
        )
        .unwrap();

    let inbound = http::Request::builder()
        .uri("/status")
        .header("accept", "text/plain")
        .body(())
        .unwrap();
    let res = negotiator
        .resolve(&NegotiationRequest::from_http(&inbound))
        .await
        .into_http()
        .unwrap();

    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(res.body(), b"busy");
    assert_eq!(
        res.extensions().get::<StatusText>(),
        Some(&StatusText(OVERRIDE_STATUS_TEXT.into()))
    );
}
