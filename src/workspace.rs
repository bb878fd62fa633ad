// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Replay workspace: ordered request/response text pairs edited and resent by hand.

use crate::bulk::BulkDraft;
use crate::codec::serialize_request;
use crate::dispatch::HttpClient;
use crate::exchange::Exchange;
use crate::replay::{replay_text, ReplayOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One replay entry. The response holds whatever was last shown for it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayEntry {
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Default)]
pub struct ReplayWorkspace {
    entries: Vec<ReplayEntry>,
}

impl ReplayWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn add(&mut self, request: impl Into<String>, response: impl Into<String>) -> usize {
        self.entries.push(ReplayEntry {
            request: request.into(),
            response: response.into(),
        });
        self.entries.len() - 1
    }

    pub fn add_request(&mut self, request: impl Into<String>) -> usize {
        self.add(request, String::new())
    }

    /// Append one entry per request text, e.g. the generated texts of a bulk run.
    pub fn add_all<I, S>(&mut self, requests: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for r in requests {
            self.add_request(r);
        }
    }

    /// Copy a stored exchange's request text into a new entry.
    pub fn add_exchange(&mut self, exchange: &Exchange) -> usize {
        self.add_request(serialize_request(&exchange.request))
    }

    pub fn entries(&self) -> &[ReplayEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ReplayEntry> {
        self.entries.get(index)
    }

    /// Replace the request text of an entry. Returns false for an unknown index.
    pub fn set_request(&mut self, index: usize, request: impl Into<String>) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.request = request.into();
                true
            }
            None => false,
        }
    }

    /// Send an entry's request and store the shown text as its response.
    pub async fn send<C: HttpClient + ?Sized>(
        &mut self,
        index: usize,
        client: &C,
        timeout: Duration,
    ) -> Option<ReplayOutcome> {
        let request = self.entries.get(index)?.request.clone();
        let outcome = replay_text(client, &request, timeout).await;
        if let Some(entry) = self.entries.get_mut(index) {
            entry.response = outcome.display_text().to_string();
        }
        Some(outcome)
    }

    /// Seed a bulk draft from an entry's request. Empty requests yield nothing.
    pub fn to_bulk_draft(&self, index: usize) -> Option<BulkDraft> {
        let entry = self.entries.get(index)?;
        if entry.request.trim().is_empty() {
            return None;
        }
        Some(BulkDraft::from_request_text(entry.request.clone()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn replace_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = ReplayEntry>,
    {
        self.entries = entries.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::{run_bulk, BulkJob};
    use crate::dispatch::{DispatchSettings, DEFAULT_TIMEOUT};
    use crate::test_helpers::{make_test_exchange, StubClient};

    #[tokio::test]
    async fn send_stores_response_text() {
        let client = StubClient::ok(200, "hello");
        let mut ws = ReplayWorkspace::new();
        let i = ws.add_request("GET http://h/a");

        let outcome = ws.send(i, &client, DEFAULT_TIMEOUT).await;
        assert!(outcome.as_ref().and_then(|o| o.response()).is_some());
        let shown = ws.get(i).map(|e| e.response.clone()).unwrap_or_default();
        assert!(shown.starts_with("HTTP 200 OK"));
        assert!(shown.ends_with("hello"));
    }

    #[tokio::test]
    async fn send_failure_shows_error_text() {
        let client = StubClient::ok(200, "");
        let mut ws = ReplayWorkspace::new();
        let i = ws.add_request("GET relative/path");
        let outcome = ws.send(i, &client, DEFAULT_TIMEOUT).await;
        assert!(matches!(outcome, Some(ReplayOutcome::Error(_))));
        assert!(ws.entries()[i].response.starts_with("Error"));
        assert!(ws.send(99, &client, DEFAULT_TIMEOUT).await.is_none());
    }

    #[tokio::test]
    async fn bulk_generated_texts_become_entries() -> anyhow::Result<()> {
        let client = StubClient::ok(200, "");
        let job = BulkJob::new("GET http://h/{v}", "v", ["a", "b", "c"])?;
        let report = run_bulk(&client, &job, &DispatchSettings::default(), None).await;

        let mut ws = ReplayWorkspace::new();
        ws.add_all(report.generated_texts());
        let requests: Vec<_> = ws.entries().iter().map(|e| e.request.as_str()).collect();
        assert_eq!(requests, vec!["GET http://h/a", "GET http://h/b", "GET http://h/c"]);
        Ok(())
    }

    #[test]
    fn stored_exchange_becomes_entry() {
        let mut ws = ReplayWorkspace::new();
        let ex = make_test_exchange("x", Some(200));
        let i = ws.add_exchange(&ex);
        assert!(ws.entries()[i].request.starts_with("POST http://example.com/api?q=1\n"));
        assert!(ws.entries()[i].response.is_empty());
    }

    #[test]
    fn entry_seeds_bulk_draft() {
        let mut ws = ReplayWorkspace::new();
        let full = ws.add_request("GET http://h/?id=1");
        let empty = ws.add_request("   ");
        let draft = ws.to_bulk_draft(full);
        assert_eq!(
            draft.map(|d| (d.template, d.keyword, d.values_text)),
            Some(("GET http://h/?id=1".to_string(), String::new(), String::new()))
        );
        assert!(ws.to_bulk_draft(empty).is_none());
        assert!(ws.to_bulk_draft(7).is_none());
    }

    #[test]
    fn edit_and_clear() {
        let mut ws = ReplayWorkspace::new();
        let i = ws.add("GET http://h/", "old");
        assert!(ws.set_request(i, "POST http://h/"));
        assert!(!ws.set_request(5, "x"));
        assert_eq!(ws.entries()[0].request, "POST http://h/");
        ws.clear();
        assert!(ws.is_empty());
    }
}
