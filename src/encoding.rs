//! Character encoding detection and transcoding.
//!
//! Fetched pages arrive as bytes plus whatever the server declared in its
//! `Content-Type` header. This module settles on one encoding and converts
//! the body to UTF-8.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::DecodeError;

// Module-level regex patterns for charset detection
// These are compiled once at first use and reused throughout the program lifetime

/// Match `<meta charset="...">` tag
#[allow(clippy::expect_used)]
static CHARSET_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>]+)"#).expect("valid regex")
});

/// Match `<meta http-equiv="Content-Type" content="...; charset=...">` tag
#[allow(clippy::expect_used)]
static CONTENT_TYPE_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?content-type["']?[^>]+content\s*=\s*["']?[^"'>]*;\s*charset\s*=\s*([^"'\s>]+)"#).expect("valid regex")
});

/// Match the `charset` parameter of a `Content-Type` header value
#[allow(clippy::expect_used)]
static HEADER_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([^"';\s]+)"#).expect("valid regex")
});

/// Detect character encoding from HTML bytes.
///
/// Looks for charset declarations in the following order:
/// 1. `<meta charset="...">`
/// 2. `<meta http-equiv="Content-Type" content="...; charset=...">`
/// 3. Defaults to UTF-8 if no declaration found
///
/// Only examines the first 1024 bytes for performance.
#[must_use]
pub fn detect_encoding(html: &[u8]) -> &'static Encoding {
    meta_encoding(html).unwrap_or(UTF_8)
}

/// Encoding named by a `<meta>` declaration in the first 1024 bytes.
fn meta_encoding(html: &[u8]) -> Option<&'static Encoding> {
    let head = &html[..html.len().min(1024)];
    let head_str = String::from_utf8_lossy(head);

    extract_charset(&head_str)
        .or_else(|| extract_content_type_charset(&head_str))
        .and_then(|charset| Encoding::for_label(charset.as_bytes()))
}

/// Extract the charset label of a `Content-Type` header value.
///
/// ```
/// use rs_fullfeed::encoding::charset_from_content_type;
///
/// assert_eq!(charset_from_content_type("text/html; charset=\"EUC-JP\""), Some("EUC-JP"));
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
#[must_use]
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    HEADER_CHARSET_RE
        .captures(content_type)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extract charset from `<meta charset="...">` tag.
fn extract_charset(html: &str) -> Option<String> {
    CHARSET_META_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract charset from `<meta http-equiv="Content-Type" content="...; charset=...">` tag.
fn extract_content_type_charset(html: &str) -> Option<String> {
    CONTENT_TYPE_CHARSET_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decide which encoding a response body is in.
///
/// A byte order mark wins, then the charset the server declared, then the
/// document's own `<meta>` declaration. Undeclared bodies are UTF-8 when
/// they are valid UTF-8 and windows-1252 otherwise. A declared charset that
/// `encoding_rs` does not know is an error rather than a guess.
pub fn resolve_encoding(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<&'static Encoding, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return Ok(encoding);
    }
    if let Some(label) = content_type.and_then(charset_from_content_type) {
        return Encoding::for_label(label.as_bytes())
            .ok_or_else(|| DecodeError::UnsupportedCharset(label.to_string()));
    }
    if let Some(encoding) = meta_encoding(body) {
        return Ok(encoding);
    }
    if std::str::from_utf8(body).is_ok() {
        Ok(UTF_8)
    } else {
        Ok(WINDOWS_1252)
    }
}

/// Transcode a response body to a UTF-8 string.
///
/// Invalid byte sequences become U+FFFD rather than errors.
///
/// # Examples
///
/// ```
/// use rs_fullfeed::encoding::decode;
///
/// let body = b"<html><body>Caf\xE9</body></html>";
/// let text = decode(body, Some("text/html; charset=ISO-8859-1"))?;
/// assert!(text.contains("Café"));
/// # Ok::<(), rs_fullfeed::DecodeError>(())
/// ```
pub fn decode(body: &[u8], content_type: Option<&str>) -> Result<String, DecodeError> {
    let encoding = resolve_encoding(body, content_type)?;
    let (decoded, used, had_errors) = encoding.decode(body);
    debug!(encoding = used.name(), had_errors, "decoded body");
    Ok(decoded.into_owned())
}
