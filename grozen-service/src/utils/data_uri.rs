//! Base64 `data:` URI helpers for selfies and generated images.

use crate::services::providers::MediaPart;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI must be base64 encoded")]
    NotBase64,
    #[error("data URI is missing a MIME type")]
    MissingMimeType,
    #[error("data URI payload is empty")]
    EmptyPayload,
    #[error("data URI payload is not valid base64")]
    InvalidPayload,
}

/// Split `data:<mime>;base64,<payload>` into a [`MediaPart`].
pub fn parse_data_uri(uri: &str) -> Result<MediaPart, DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(DataUriError::NotBase64)?;

    if mime_type.is_empty() {
        return Err(DataUriError::MissingMimeType);
    }
    if payload.is_empty() {
        return Err(DataUriError::EmptyPayload);
    }
    BASE64
        .decode(payload.as_bytes())
        .map_err(|_| DataUriError::InvalidPayload)?;

    Ok(MediaPart {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}

pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jpeg_uri() {
        let media = parse_data_uri("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.data, "/9j/4AAQ");
    }

    #[test]
    fn rejects_malformed_uris() {
        assert_eq!(
            parse_data_uri("image/jpeg;base64,abc="),
            Err(DataUriError::MissingScheme)
        );
        assert_eq!(
            parse_data_uri("data:image/png,rawbytes"),
            Err(DataUriError::NotBase64)
        );
        assert_eq!(
            parse_data_uri("data:;base64,aGk="),
            Err(DataUriError::MissingMimeType)
        );
        assert_eq!(
            parse_data_uri("data:image/png;base64,"),
            Err(DataUriError::EmptyPayload)
        );
        assert_eq!(
            parse_data_uri("data:image/png;base64,***"),
            Err(DataUriError::InvalidPayload)
        );
    }

    #[test]
    fn encodes_bytes() {
        assert_eq!(to_data_uri("text/plain", b"hi"), "data:text/plain;base64,aGk=");
    }
}
