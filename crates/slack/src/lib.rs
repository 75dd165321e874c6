//! Slack surface of Jargon Jar.
//!
//! - **Signatures** (`signature`): request authentication for every webhook
//! - **Slash command** (`commands`): `/jargon`, `/jargon new`, `/jargon help`
//! - **Interactions** (`interactions`): modal submissions, select changes, typeahead
//! - **Charges** (`recorder`) and **terms** (`terms`): what a submitted modal writes
//! - **Block Kit** (`blocks`, `modals`): message and view builders
//! - **Web API** (`api`): outbound calls, one client per workspace bot token
//!
//! # Flow
//!
//! ```text
//! /jargon ─► CommandRouter ─► views.open(charge modal)
//!                                   │
//! submit ─► InteractionDispatcher ─► ChargeRecorder ─► charges + chat.postMessage
//! ```

pub mod api;
pub mod blocks;
pub mod commands;
pub mod directory;
pub mod interactions;
pub mod modals;
pub mod recorder;
pub mod signature;
pub mod terms;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

/// How a failed webhook should be answered over HTTP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    BadRequest,
    Internal,
}
