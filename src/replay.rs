// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Single request replay. Always yields something to show: a response or an error text.

use crate::codec::{parse_request, serialize_response};
use crate::dispatch::{dispatch, HttpClient};
use crate::exchange::{Request, Response};
use std::time::Duration;

/// Display-ready result of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    Response { response: Response, text: String },
    Error(String),
}

impl ReplayOutcome {
    /// Text shown in place of the response.
    pub fn display_text(&self) -> &str {
        match self {
            ReplayOutcome::Response { text, .. } => text,
            ReplayOutcome::Error(msg) => msg,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            ReplayOutcome::Response { response, .. } => Some(response),
            ReplayOutcome::Error(_) => None,
        }
    }
}

/// Send one structured request.
pub async fn replay_request<C: HttpClient + ?Sized>(
    client: &C,
    request: &Request,
    timeout: Duration,
) -> ReplayOutcome {
    match dispatch(client, request, timeout).await {
        Ok(resp) => {
            let response = resp.to_response();
            let text = serialize_response(&response);
            ReplayOutcome::Response { response, text }
        }
        Err(e) => {
            tracing::debug!(error = %e, url = %request.url, "replay failed");
            ReplayOutcome::Error(format!("Error sending request:\n{}", e))
        }
    }
}

/// Parse raw request text and send it. Parse failures become error text too.
pub async fn replay_text<C: HttpClient + ?Sized>(
    client: &C,
    text: &str,
    timeout: Duration,
) -> ReplayOutcome {
    match parse_request(text) {
        Ok(request) => replay_request(client, &request, timeout).await,
        Err(e) => ReplayOutcome::Error(format!("Error parsing request:\n{}", e)),
    }
}
