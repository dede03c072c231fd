//! Classify HTTP status codes and transport failures into `DownloadErrorKind`.
//!
//! Downloader implementations surface a structured kind directly, but this
//! is shared with the Runner Protocol Client and any capability that talks
//! HTTP, so a non-2xx or transport failure can be mapped consistently.

use crate::error::DownloadErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> DownloadErrorKind {
    match code {
        429 | 500..=599 => DownloadErrorKind::Retryable,
        _ => DownloadErrorKind::Other,
    }
}

/// Classify a `reqwest::Error` (connect/timeout/decode) for retry decisions.
pub fn classify_reqwest_error(e: &reqwest::Error) -> DownloadErrorKind {
    if e.is_timeout() || e.is_connect() {
        return DownloadErrorKind::Retryable;
    }
    if let Some(status) = e.status() {
        return classify_http_status(status.as_u16());
    }
    DownloadErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_5xx_are_retryable() {
        assert_eq!(classify_http_status(429), DownloadErrorKind::Retryable);
        assert_eq!(classify_http_status(500), DownloadErrorKind::Retryable);
        assert_eq!(classify_http_status(503), DownloadErrorKind::Retryable);
    }

    #[test]
    fn http_4xx_other_than_429_is_other() {
        assert_eq!(classify_http_status(404), DownloadErrorKind::Other);
        assert_eq!(classify_http_status(403), DownloadErrorKind::Other);
    }
}
