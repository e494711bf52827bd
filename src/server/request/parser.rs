//! Request parsing utilities.

use std::borrow::Cow;

/// Decode one `application/x-www-form-urlencoded` component.
///
/// `+` means space; percent escapes are decoded lossily as UTF-8.
#[inline]
pub fn form_decode(s: &str) -> Cow<'_, str> {
    if !s.contains(['%', '+']) {
        return Cow::Borrowed(s);
    }

    let spaced = s.replace('+', " ");
    Cow::Owned(
        percent_encoding::percent_decode_str(&spaced)
            .decode_utf8_lossy()
            .into_owned(),
    )
}

/// Parse a urlencoded body or query string into key-value pairs.
///
/// Pairs keep their order; pairs with an empty key are dropped.
pub fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity((input.matches('&').count() + 1).min(16));

    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }

        params.push((form_decode(key).into_owned(), form_decode(value).into_owned()));
    }

    params
}
