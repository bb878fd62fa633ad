// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Ordered in-memory collection of exchanges.

use crate::codec::serialize_exchange;
use crate::exchange::{Exchange, Response};
use std::collections::HashMap;

/// Ordered store of captured and authored exchanges.
///
/// Owned by a single context; ingestion workers hand over complete
/// exchanges through a channel instead of writing here directly.
/// Identifiers are expected to be unique but this is not enforced: a repeated
/// identifier is appended as its own entry and lookups resolve to the
/// earliest one.
#[derive(Debug, Default)]
pub struct ExchangeStore {
    entries: Vec<Exchange>,
    index: HashMap<String, usize>,
}

impl ExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, exchange: Exchange) {
        let pos = self.entries.len();
        if self.index.contains_key(&exchange.id) {
            tracing::debug!(id = %exchange.id, "duplicate exchange id appended");
        } else {
            self.index.insert(exchange.id.clone(), pos);
        }
        self.entries.push(exchange);
    }

    /// Find an exchange by its full identifier. Absence is a normal outcome.
    pub fn lookup(&self, id: &str) -> Option<&Exchange> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Attach a response to an exchange that has none yet.
    ///
    /// Returns false when the id is unknown or a response is already attached.
    pub fn attach_response(&mut self, id: &str, response: Response) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let entry = &mut self.entries[i];
        if entry.response.is_some() {
            return false;
        }
        entry.response = Some(response);
        true
    }

    /// All exchanges in insertion order.
    pub fn list(&self) -> &[Exchange] {
        &self.entries
    }

    /// Exchanges whose request+response text contains `needle`, ignoring case.
    ///
    /// Each call builds a fresh lazy iterator; nothing is cached between calls.
    pub fn filter<'a>(&'a self, needle: &str) -> impl Iterator<Item = &'a Exchange> + 'a {
        let needle = needle.to_lowercase();
        self.entries
            .iter()
            .filter(move |ex| serialize_exchange(ex).to_lowercase().contains(&needle))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn replace_all<I>(&mut self, exchanges: I)
    where
        I: IntoIterator<Item = Exchange>,
    {
        self.clear();
        for ex in exchanges {
            self.append(ex);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
