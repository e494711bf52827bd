//! Method and path handling outside the happy path.

use crate::helpers::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_get_generate_redirects_to_form() {
    let server = TestServer::start().await;
    let response = server.get("/generate").await;

    assert_status(&response, StatusCode::SEE_OTHER);
    assert_header(&response, "location", "/");
}

#[tokio::test]
async fn test_wrong_method_on_generate() {
    let server = TestServer::start().await;
    let response = server
        .client
        .put(server.url("/generate"))
        .send()
        .await
        .unwrap();

    assert_status(&response, StatusCode::METHOD_NOT_ALLOWED);
    assert_header(&response, "allow", "POST");
}

#[tokio::test]
async fn test_wrong_method_on_form() {
    let server = TestServer::start().await;
    let response = server.client.post(server.url("/")).send().await.unwrap();

    assert_status(&response, StatusCode::METHOD_NOT_ALLOWED);
    assert_header(&response, "allow", "GET, HEAD");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = TestServer::start().await;
    let response = server.get("/wp-admin/").await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_generated() {
    let server = TestServer::start().await;
    let response = server.get("/").await;

    assert_has_header(&response, "x-request-id");
    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36, "expected a UUID, got {}", id);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/"))
        .header("X-Request-ID", "trace-abc-123")
        .send()
        .await
        .unwrap();

    assert_header(&response, "x-request-id", "trace-abc-123");
}
