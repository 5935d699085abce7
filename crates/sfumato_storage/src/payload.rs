//! Transport payload decoding and MIME helpers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sfumato_error::{StorageError, StorageErrorKind};

/// Upper bound on the decoded size of a base64 payload, computed without
/// decoding it.
///
/// # Examples
///
/// ```
/// use sfumato_storage::estimated_decoded_len;
///
/// assert_eq!(estimated_decoded_len("aGVsbG8="), 5);
/// assert_eq!(estimated_decoded_len("data:image/png;base64,aGVsbG8="), 5);
/// ```
pub fn estimated_decoded_len(data: &str) -> u64 {
    let body = strip_data_url(data).trim();
    let padding = body.bytes().rev().take_while(|b| *b == b'=').count() as u64;
    ((body.len() as u64) / 4 * 3 + (body.len() as u64 % 4) * 3 / 4).saturating_sub(padding)
}

/// Decode a base64 payload, optionally prefixed with a `data:` URL header.
///
/// Oversized input is rejected from its estimated size before decoding.
///
/// # Errors
///
/// - [`StorageErrorKind::InvalidPayload`] for empty or malformed input
/// - [`StorageErrorKind::PayloadTooLarge`] when the decoded size would exceed `limit`
pub fn decode_payload(data: &str, limit: u64) -> Result<Vec<u8>, StorageError> {
    let body = strip_data_url(data).trim();
    if body.is_empty() {
        return Err(StorageError::new(StorageErrorKind::InvalidPayload(
            "payload is empty".to_string(),
        )));
    }

    let size = estimated_decoded_len(body);
    if size > limit {
        return Err(StorageError::new(StorageErrorKind::PayloadTooLarge {
            size,
            limit,
        }));
    }

    let bytes = STANDARD
        .decode(body)
        .map_err(|e| StorageError::new(StorageErrorKind::InvalidPayload(e.to_string())))?;
    if bytes.is_empty() {
        return Err(StorageError::new(StorageErrorKind::InvalidPayload(
            "payload decoded to zero bytes".to_string(),
        )));
    }
    Ok(bytes)
}

fn strip_data_url(data: &str) -> &str {
    match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.trim_start().starts_with("data:") => rest,
        _ => data,
    }
}

/// File extension for an image MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "png",
    }
}

/// MIME type for a file extension, used for brand assets on disk.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
