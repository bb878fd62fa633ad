// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Session snapshot export/import (JSON).
//!
//! Document shape:
//!
//! ```json
//! {"logger_requests": [{"id": "...", "timestamp": "...", "request": {...}, "response": {...}}],
//!  "replay_requests": [{"request": "<text>", "response": "<text>"}]}
//! ```
//!
//! `id` and `timestamp` are optional on import and generated when absent.

use crate::error::PersistenceError;
use crate::exchange::{Exchange, Request, Response};
use crate::store::ExchangeStore;
use crate::workspace::{ReplayEntry, ReplayWorkspace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_SESSION_PATH: &str = "anvesha_session.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggedExchange {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub request: Request,
    #[serde(default)]
    pub response: Option<Response>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl From<&Exchange> for LoggedExchange {
    fn from(ex: &Exchange) -> Self {
        Self {
            id: ex.id.clone(),
            timestamp: ex.timestamp,
            request: ex.request.clone(),
            response: ex.response.clone(),
        }
    }
}

impl From<LoggedExchange> for Exchange {
    fn from(l: LoggedExchange) -> Self {
        Exchange {
            id: l.id,
            timestamp: l.timestamp,
            request: l.request,
            response: l.response,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDocument {
    #[serde(default)]
    pub logger_requests: Vec<LoggedExchange>,
    #[serde(default)]
    pub replay_requests: Vec<ReplayEntry>,
}

/// Snapshot the store and the replay workspace.
pub fn export(store: &ExchangeStore, workspace: &ReplayWorkspace) -> SessionDocument {
    SessionDocument {
        logger_requests: store.list().iter().map(LoggedExchange::from).collect(),
        replay_requests: workspace.entries().to_vec(),
    }
}

pub fn export_json(
    store: &ExchangeStore,
    workspace: &ReplayWorkspace,
) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(&export(store, workspace))?)
}

/// Replace both destinations with the document's contents, in document order.
pub fn import(document: SessionDocument, store: &mut ExchangeStore, workspace: &mut ReplayWorkspace) {
    store.replace_all(document.logger_requests.into_iter().map(Exchange::from));
    workspace.replace_all(document.replay_requests);
}

/// Parse then import. An invalid document changes nothing.
pub fn import_json(
    json: &str,
    store: &mut ExchangeStore,
    workspace: &mut ReplayWorkspace,
) -> Result<(), PersistenceError> {
    let document: SessionDocument = serde_json::from_str(json)?;
    import(document, store, workspace);
    Ok(())
}

pub async fn save_to_path<P: AsRef<Path>>(
    path: P,
    store: &ExchangeStore,
    workspace: &ReplayWorkspace,
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let json = export_json(store, workspace)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), exchanges = store.len(), replays = workspace.len(), "session saved");
    Ok(())
}

pub async fn load_from_path<P: AsRef<Path>>(
    path: P,
    store: &mut ExchangeStore,
    workspace: &mut ReplayWorkspace,
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    import_json(&json, store, workspace)?;
    tracing::info!(path = %path.display(), exchanges = store.len(), replays = workspace.len(), "session loaded");
    Ok(())
}
