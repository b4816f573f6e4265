use reqwest::StatusCode;

/// Why a candidate file was refused before any network traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("File is too large. Please upload a file under 20 MB.")]
    SizeExceeded,
    #[error("Please upload a valid audio file.")]
    ExtensionRejected,
}

/// Failure classes for a transcription attempt. The `Display` text is what
/// the user sees in place of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("File too large. Please upload a file under 20 MB and try again.")]
    PayloadTooLarge,
    #[error(
        "Unsupported file format. Accepted formats: mp3, wav, ogg, flac, m4a, aac, wma, webm, mp4, mov."
    )]
    UnsupportedMediaType,
    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,
    #[error("An error occurred during transcription. Please try again.")]
    ServerError,
    #[error(
        "Could not connect to the transcription server. Please check your connection and try again."
    )]
    ConnectionError,
}

const STATUS_TABLE: &[(StatusCode, ErrorKind)] = &[
    (StatusCode::PAYLOAD_TOO_LARGE, ErrorKind::PayloadTooLarge),
    (
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::UnsupportedMediaType,
    ),
    (StatusCode::TOO_MANY_REQUESTS, ErrorKind::RateLimited),
];

impl ErrorKind {
    /// Maps a non-success status to its failure class. Returns `None` for 2xx.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            return None;
        }

        let kind = STATUS_TABLE
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, kind)| *kind)
            .unwrap_or(ErrorKind::ServerError);
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_statuses_come_from_table() {
        assert_eq!(
            ErrorKind::from_status(StatusCode::PAYLOAD_TOO_LARGE),
            Some(ErrorKind::PayloadTooLarge)
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::UNSUPPORTED_MEDIA_TYPE),
            Some(ErrorKind::UnsupportedMediaType)
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::TOO_MANY_REQUESTS),
            Some(ErrorKind::RateLimited)
        );
    }

    #[test]
    fn unlisted_failures_are_server_errors() {
        for code in [400u16, 401, 404, 500, 502, 503, 302] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(
                ErrorKind::from_status(status),
                Some(ErrorKind::ServerError),
                "status {code}"
            );
        }
    }

    #[test]
    fn success_range_has_no_error() {
        for code in [200u16, 201, 204, 299] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ErrorKind::from_status(status), None);
        }
    }

    #[test]
    fn unsupported_format_message_lists_every_format() {
        let message = ErrorKind::UnsupportedMediaType.to_string();
        for ext in crate::validate::ALLOWED_EXTENSIONS {
            assert!(message.contains(ext), "missing {ext}");
        }
    }
}
