// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Error types shared across the codec, ingestion, dispatch and persistence layers.

use std::path::PathBuf;
use std::time::Duration;

/// Bulk input rejected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing keyword: enter a keyword (without braces)")]
    MissingKeyword,
    #[error("the template does not contain the placeholder '{placeholder}'")]
    MissingPlaceholder { placeholder: String },
    #[error("missing values: enter at least one value")]
    MissingValues,
}

/// Raw exchange text whose start line cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedExchange {
    #[error("empty exchange text")]
    Empty,
    #[error("malformed request line: '{0}'")]
    RequestLine(String),
    #[error("malformed status line: '{0}'")]
    StatusLine(String),
}

/// Failure while sending one request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("malformed URL: '{0}'")]
    MalformedUrl(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("{0}")]
    Network(String),
}

/// One undecodable segment in an ingestion payload.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("segment {segment}: {source}")]
    Json {
        segment: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Listener lifecycle failure.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to remove stale socket {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind socket {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Session import/export failure. Import leaves existing state untouched.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("invalid session document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("session file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_missing_piece() {
        assert!(ValidationError::MissingKeyword
            .to_string()
            .contains("keyword"));
        let e = ValidationError::MissingPlaceholder {
            placeholder: "{id}".into(),
        };
        assert!(e.to_string().contains("{id}"));
        assert!(ValidationError::MissingValues.to_string().contains("value"));
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let e = DispatchError::Timeout(Duration::from_secs(20));
        assert_eq!(e.to_string(), "request timed out after 20s");
    }
}
