//! The generator form and its session cookie.

use crate::helpers::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_form_page_renders() {
    let server = TestServer::start().await;
    let response = server.get("/").await;

    assert_status(&response, StatusCode::OK);
    assert_header(&response, "content-type", "text/html; charset=utf-8");
    assert_header(&response, "cache-control", "no-store");

    let body = response.text().await.unwrap();
    assert!(body.contains(r#"action="/generate" method="POST""#));
    assert!(body.contains(r#"name="plugin_slug""#));
    assert!(body.contains(r#"name="requires_php""#));

    let token = extract_token(&body).expect("token input");
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_first_visit_sets_session_cookie() {
    let server = TestServer::start().await;
    let response = server.get("/").await;

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("forge_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    // The cookie store now carries the session; no new cookie is issued.
    let again = server.get("/").await;
    assert!(again.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_token_is_stable_until_used() {
    let server = TestServer::start().await;
    let first = server.fetch_token().await;
    let second = server.fetch_token().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_index_html_alias() {
    let server = TestServer::start().await;
    let response = server.get("/index.html").await;
    assert_status(&response, StatusCode::OK);
    assert_body_contains(response, "WordPress Plugin Generator").await;
}

#[tokio::test]
async fn test_head_has_no_body() {
    let server = TestServer::start().await;
    let response = server.client.head(server.url("/")).send().await.unwrap();

    assert_status(&response, StatusCode::OK);
    assert_header_starts_with(&response, "content-type", "text/html");
    assert!(response.bytes().await.unwrap().is_empty());
}
