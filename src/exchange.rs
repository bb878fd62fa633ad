// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Request, response and exchange records shared across the pipeline.

use crate::headers::Headers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SHORT_ID_LEN: usize = 8;

/// Request portion of an exchange. The url may be relative until it is dispatched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }
}

/// Response portion of an exchange.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Reason phrase, possibly empty when the producer only reports a code.
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Option<String>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: String::new(),
            headers: Headers::new(),
            body: None,
        }
    }
}

/// One captured or authored request with zero or one response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub request: Request,
    pub response: Option<Response>,
}

impl Exchange {
    /// Create an exchange with a producer-assigned identifier, timestamped now.
    pub fn new(id: impl Into<String>, request: Request) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            request,
            response: None,
        }
    }

    /// Create a manually authored exchange with a fresh identifier.
    pub fn authored(request: Request) -> Self {
        Self::new(Uuid::new_v4().to_string(), request)
    }

    /// Display-only identifier prefix. Lookups always use the full `id`.
    pub fn short_id(&self) -> String {
        self.id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(SHORT_ID_LEN)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_test_exchange;
    use rstest::rstest;

    #[rstest]
    #[case("3f2a9c1e-77aa-4b1c-9d2e-000000000000", "3f2a9c1e")]
    #[case("ab-cd", "abcd")]
    #[case("", "")]
    fn short_id_is_alphanumeric_prefix(#[case] id: &str, #[case] expected: &str) {
        let ex = Exchange::new(id, Request::new("GET", "/"));
        assert_eq!(ex.short_id(), expected);
    }

    #[test]
    fn authored_exchanges_get_distinct_ids() {
        let a = Exchange::authored(Request::new("GET", "/"));
        let b = Exchange::authored(Request::new("GET", "/"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serde_roundtrip_full_exchange() -> anyhow::Result<()> {
        let ex = make_test_exchange("flow-1", Some(200));
        let s = serde_json::to_string(&ex)?;
        let back: Exchange = serde_json::from_str(&s)?;
        assert_eq!(back, ex);
        Ok(())
    }
}
