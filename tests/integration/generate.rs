//! End-to-end plugin generation.

use crate::helpers::*;
use reqwest::multipart;
use reqwest::StatusCode;

const PLACEHOLDERS: [&str; 3] = [
    "Pluginboilerplatevendor",
    "Pluginboilerplate__description",
    "pluginboilerplate",
];

#[tokio::test]
async fn test_generate_returns_zip() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;
    let response = server.post_generate(&valid_form(&token)).await;

    assert_status(&response, StatusCode::OK);
    assert_header(&response, "content-type", "application/zip");
    assert_header(
        &response,
        "content-disposition",
        "attachment; filename=\"demo-plugin.zip\"",
    );
    assert_header(&response, "cache-control", "no-cache, must-revalidate");

    let bytes = response.bytes().await.unwrap();
    let entries = unzip(&bytes);
    assert!(entries.iter().all(|(name, _)| name.starts_with("demo-plugin/")));

    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names[0], "demo-plugin/");
    assert!(names.contains(&"demo-plugin/demo-plugin.php"));
    assert!(names.contains(&"demo-plugin/src/Plugin.php"));
    assert!(!names.iter().any(|n| n.contains("pluginboilerplate")));
    assert!(!names.iter().any(|n| n.ends_with(".php-cs-fixer.dist.php")));
}

#[tokio::test]
async fn test_generated_sources_are_substituted() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;
    let bytes = server
        .post_generate(&valid_form(&token))
        .await
        .bytes()
        .await
        .unwrap();
    let entries = unzip(&bytes);

    let entry = entries
        .iter()
        .find(|(name, _)| name == "demo-plugin/demo-plugin.php")
        .map(|(_, content)| String::from_utf8(content.clone()).unwrap())
        .expect("entry file");
    assert!(entry.starts_with("<?php"));
    assert!(entry.contains(" * Plugin Name: Demo Plugin\n"));
    assert!(entry.contains(" * Plugin URI: https://example.com/demo\n"));
    assert!(entry.contains(" * Version: 1.2.3\n"));
    assert!(entry.contains(" * Requires PHP: 8.2\n"));
    assert!(entry.contains(" * Text Domain: demo-plugin\n"));
    assert!(entry.contains("Acme\\DemoPlugin\\Plugin"));

    for (name, content) in &entries {
        if let Ok(text) = std::str::from_utf8(content) {
            for placeholder in PLACEHOLDERS {
                assert!(
                    !text.contains(placeholder),
                    "{} still contains {}",
                    name,
                    placeholder
                );
            }
        }
    }
}

#[tokio::test]
async fn test_temp_archive_removed_after_download() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;
    let response = server.post_generate(&valid_form(&token)).await;
    assert_status(&response, StatusCode::OK);
    response.bytes().await.unwrap();

    let leftovers = std::fs::read_dir(&server.temp_dir).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_multipart_submission() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;

    let form = valid_form(&token)
        .into_iter()
        .fold(multipart::Form::new(), |form, (name, value)| {
            form.text(name, value)
        });
    let response = server
        .client
        .post(server.url("/generate"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);
    assert_header(&response, "content-type", "application/zip");
}

#[tokio::test]
async fn test_missing_token_forbidden() {
    let server = TestServer::start().await;
    server.get("/").await;

    let mut form = valid_form("");
    form.retain(|(name, _)| *name != "csrf_token");
    let response = server.post_generate(&form).await;

    assert_status(&response, StatusCode::FORBIDDEN);
    assert_body_contains(response, "Invalid security token").await;
}

#[tokio::test]
async fn test_token_without_session_forbidden() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;

    let stranger = reqwest::Client::new();
    let response = stranger
        .post(server.url("/generate"))
        .form(&valid_form(&token))
        .send()
        .await
        .unwrap();

    assert_status(&response, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_is_single_use() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;

    let first = server.post_generate(&valid_form(&token)).await;
    assert_status(&first, StatusCode::OK);

    let replay = server.post_generate(&valid_form(&token)).await;
    assert_status(&replay, StatusCode::FORBIDDEN);

    let fresh = server.fetch_token().await;
    assert_ne!(fresh, token);
    let retry = server.post_generate(&valid_form(&fresh)).await;
    assert_status(&retry, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_fields_list_every_error() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;

    let mut form = valid_form(&token);
    for (name, value) in form.iter_mut() {
        match *name {
            "plugin_slug" => *value = "Bad Slug".into(),
            "vendor_namespace" => *value = "1acme".into(),
            "version" => *value = "1.0".into(),
            "requires_php" => *value = "5.6".into(),
            _ => {}
        }
    }
    let response = server.post_generate(&form).await;

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Plugin slug"));
    assert!(body.contains("Vendor namespace"));
    assert!(body.contains("X.Y.Z"));
    assert!(body.contains("Unsupported PHP version."));
    assert!(body.contains(r#"href="/""#));
}

#[tokio::test]
async fn test_markup_stripped_from_fields() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;

    let mut form = valid_form(&token);
    form.retain(|(name, _)| *name != "plugin_name");
    form.push(("plugin_name", "<script>alert(1)</script>".into()));
    let response = server.post_generate(&form).await;

    // Tags are stripped; the remaining text still satisfies the required check.
    assert_status(&response, StatusCode::OK);
    let entries = unzip(&response.bytes().await.unwrap());
    let entry = entries
        .iter()
        .find(|(name, _)| name == "demo-plugin/demo-plugin.php")
        .map(|(_, content)| String::from_utf8_lossy(content).into_owned())
        .unwrap();
    assert!(!entry.contains("<script>"));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = TestServer::start().await;
    let token = server.fetch_token().await;

    let mut form = valid_form(&token);
    form.push(("padding", "x".repeat(80 * 1024)));
    let response = server.post_generate(&form).await;

    assert_status(&response, StatusCode::PAYLOAD_TOO_LARGE);
}
