// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Capture, replay and bulk-resend of HTTP exchanges for manual security testing.
//!
//! An external interception proxy writes JSON flow frames to a Unix socket;
//! the listener decodes them into the exchange store. Exchanges move between
//! the store, the replay workspace and bulk runs as plain request text, and
//! the whole session can be exported to and imported from a JSON document.

pub mod bulk;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exchange;
pub mod frame;
pub mod headers;
pub mod listener;
pub mod persistence;
pub mod replay;
pub mod serde_helpers;
pub mod store;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_helpers;
