//! Per-client generation limits.

use crate::helpers::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_limit_rejects_with_retry_after() {
    let server = TestServer::start_with_rate_limit(Some(2)).await;

    for _ in 0..2 {
        let token = server.fetch_token().await;
        let response = server.post_generate(&valid_form(&token)).await;
        assert_status(&response, StatusCode::OK);
    }

    let token = server.fetch_token().await;
    let response = server.post_generate(&valid_form(&token)).await;
    assert_status(&response, StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    assert_body_contains(response, "Too many requests").await;
}

#[tokio::test]
async fn test_rejected_csrf_does_not_spend_quota() {
    let server = TestServer::start_with_rate_limit(Some(1)).await;

    let response = server.post_generate(&valid_form("forged")).await;
    assert_status(&response, StatusCode::FORBIDDEN);

    let token = server.fetch_token().await;
    let response = server.post_generate(&valid_form(&token)).await;
    assert_status(&response, StatusCode::OK);
}

#[tokio::test]
async fn test_form_page_is_not_limited() {
    let server = TestServer::start_with_rate_limit(Some(1)).await;
    for _ in 0..5 {
        assert_status(&server.get("/").await, StatusCode::OK);
    }
}
