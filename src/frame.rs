// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Ingestion frames emitted by the traffic-capturing process.
//!
//! Frames are newline-delimited JSON objects, either written to the local
//! ingestion socket or appended to a flows file.

use crate::error::IngestError;
use crate::exchange::{Exchange, Request, Response};
use crate::headers::Headers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One captured exchange as reported by the producer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowFrame {
    pub id: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Option<Headers>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::deserialize_status")]
    pub response_status: Option<u16>,
    #[serde(default)]
    pub response_headers: Option<Headers>,
    #[serde(default)]
    pub response_body: Option<String>,
}

impl FlowFrame {
    /// Convert into an exchange stamped with `timestamp`.
    ///
    /// A response is attached only when the producer reported a status.
    pub fn into_exchange(self, timestamp: DateTime<Utc>) -> Exchange {
        let request = Request {
            method: self.method,
            url: self.url,
            headers: self.headers.unwrap_or_default(),
            body: self.body.filter(|b| !b.is_empty()),
        };
        let response = self.response_status.map(|status| Response {
            status,
            reason: canonical_reason(status),
            headers: self.response_headers.unwrap_or_default(),
            body: self.response_body.filter(|b| !b.is_empty()),
        });
        Exchange {
            id: self.id,
            timestamp,
            request,
            response,
        }
    }
}

fn canonical_reason(status: u16) -> String {
    hyper::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

/// Decode a newline-delimited payload into one result per non-blank segment,
/// in segment order. A bad segment never prevents decoding of the ones after it.
pub fn decode_payload(payload: &str) -> Vec<Result<FlowFrame, IngestError>> {
    payload
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<FlowFrame>(line).map_err(|source| IngestError::Json {
                segment: i + 1,
                source,
            })
        })
        .collect()
}

/// Load exchanges from a JSONL flows file.
///
/// Malformed lines are skipped with a warning. A missing file yields no exchanges.
pub async fn load_flow_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<Exchange>> {
    let path_ref = path.as_ref();
    if !tokio::fs::try_exists(path_ref).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let content = tokio::fs::read_to_string(path_ref).await?;
    let now = Utc::now();
    let mut exchanges = Vec::new();
    for segment in decode_payload(&content) {
        match segment {
            Ok(frame) => exchanges.push(frame.into_exchange(now)),
            Err(e) => {
                tracing::warn!(path = %path_ref.display(), error = %e, "failed to parse flow record, skipping")
            }
        }
    }
    Ok(exchanges)
}
