// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Templated bulk sending.
//!
//! A template is raw request text containing `{keyword}`. Each value produces
//! one concrete request by plain substring replacement. Input is validated
//! up front; after that every item is attempted and gets its own outcome, so
//! one bad value never stops the rest.

use crate::codec::parse_request;
use crate::dispatch::{dispatch, DispatchSettings, HttpClient};
use crate::error::ValidationError;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Validated bulk input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkJob {
    template: String,
    keyword: String,
    values: Vec<String>,
}

impl BulkJob {
    /// Validate the input. Values are trimmed and blank ones discarded.
    pub fn new<I, S>(template: &str, keyword: &str, values: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ValidationError::MissingKeyword);
        }
        let placeholder = placeholder(keyword);
        if !template.contains(&placeholder) {
            return Err(ValidationError::MissingPlaceholder { placeholder });
        }
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(ValidationError::MissingValues);
        }
        Ok(Self {
            template: template.to_string(),
            keyword: keyword.to_string(),
            values,
        })
    }

    /// Same as [`BulkJob::new`] with one value per line of `values_text`.
    pub fn from_values_text(
        template: &str,
        keyword: &str,
        values_text: &str,
    ) -> Result<Self, ValidationError> {
        Self::new(template, keyword, values_text.lines())
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The placeholder token, `{keyword}`.
    pub fn placeholder(&self) -> String {
        placeholder(&self.keyword)
    }

    /// Concrete request texts, one per value, in value order.
    pub fn generate(&self) -> Vec<String> {
        let token = self.placeholder();
        self.values
            .iter()
            .map(|v| self.template.replace(&token, v))
            .collect()
    }
}

/// Unvalidated bulk form contents, as edited before sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDraft {
    pub template: String,
    pub keyword: String,
    pub values_text: String,
}

impl BulkDraft {
    /// Start a draft from a request text, with keyword and values cleared.
    pub fn from_request_text(text: impl Into<String>) -> Self {
        Self {
            template: text.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<BulkJob, ValidationError> {
        BulkJob::from_values_text(&self.template, &self.keyword, &self.values_text)
    }
}

fn placeholder(keyword: &str) -> String {
    format!("{{{}}}", keyword)
}

/// Result of one bulk item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Sent { status: u16, length: usize },
    Failed { message: String },
}

impl ItemOutcome {
    /// Status code, or `ERR` for a failed item.
    pub fn status_label(&self) -> String {
        match self {
            ItemOutcome::Sent { status, .. } => status.to_string(),
            ItemOutcome::Failed { .. } => "ERR".to_string(),
        }
    }

    /// Response length in bytes, or the failure message.
    pub fn detail(&self) -> String {
        match self {
            ItemOutcome::Sent { length, .. } => length.to_string(),
            ItemOutcome::Failed { message } => message.clone(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

/// One row of a bulk run, aligned with its input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    pub value: String,
    pub request_text: String,
    pub outcome: ItemOutcome,
}

/// Progress notification sent as each item completes, in value order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkProgress {
    pub index: usize,
    pub total: usize,
    pub outcome: ItemOutcome,
}

/// Finished bulk run. Holds exactly one item per job value, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    items: Vec<BulkItem>,
}

impl BulkReport {
    pub fn items(&self) -> &[BulkItem] {
        &self.items
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().map(|i| &i.outcome)
    }

    pub fn generated_texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.request_text.as_str())
    }

    /// Generated request text of a single item.
    pub fn generated_text(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(|i| i.request_text.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Send every generated request and collect one outcome per value.
///
/// With `bulk_concurrency` of 1 items are sent strictly in order; larger
/// values keep that many in flight while still reporting in value order.
pub async fn run_bulk<C: HttpClient + ?Sized>(
    client: &C,
    job: &BulkJob,
    settings: &DispatchSettings,
    progress: Option<&UnboundedSender<BulkProgress>>,
) -> BulkReport {
    let texts = job.generate();
    let total = texts.len();
    let timeout = settings.timeout;

    let mut outcomes = stream::iter(texts.iter())
        .map(|text| send_item(client, text, timeout))
        .buffered(settings.bulk_concurrency.max(1));

    let mut items = Vec::with_capacity(total);
    let mut index = 0;
    while let Some(outcome) = outcomes.next().await {
        if let ItemOutcome::Failed { message } = &outcome {
            debug!(index, value = %job.values[index], error = %message, "bulk item failed");
        }
        if let Some(tx) = progress {
            let _ = tx.send(BulkProgress {
                index,
                total,
                outcome: outcome.clone(),
            });
        }
        items.push(BulkItem {
            value: job.values[index].clone(),
            request_text: texts[index].clone(),
            outcome,
        });
        index += 1;
    }
    BulkReport { items }
}

async fn send_item<C: HttpClient + ?Sized>(
    client: &C,
    text: &str,
    timeout: std::time::Duration,
) -> ItemOutcome {
    let request = match parse_request(text) {
        Ok(r) => r,
        Err(e) => {
            return ItemOutcome::Failed {
                message: e.to_string(),
            }
        }
    };
    match dispatch(client, &request, timeout).await {
        Ok(resp) => ItemOutcome::Sent {
            status: resp.status,
            length: resp.body.len(),
        },
        Err(e) => ItemOutcome::Failed {
            message: e.to_string(),
        },
    }
}
