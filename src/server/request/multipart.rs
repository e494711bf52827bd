//! Multipart form data parsing.

use bytes::Bytes;
use futures_util::stream;
use multer::Multipart;

/// Parse the text fields of a multipart body.
///
/// File parts are skipped; the generator form has no uploads.
pub async fn parse_multipart(
    content_type: &str,
    body: Bytes,
) -> Result<Vec<(String, String)>, String> {
    let boundary = multer::parse_boundary(content_type).map_err(|e| e.to_string())?;

    let mut multipart = Multipart::new(
        stream::once(async { Ok::<_, std::io::Error>(body) }),
        boundary,
    );

    let mut params = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or("").to_string();
        if field.file_name().is_some() {
            tracing::debug!(field_name = %name, "parse_multipart: skipping file part");
            continue;
        }
        if name.is_empty() {
            continue;
        }

        let value = field.text().await.map_err(|e| e.to_string())?;
        params.push((name, value));
    }

    tracing::debug!(params_count = params.len(), "parse_multipart: completed");
    Ok(params)
}
