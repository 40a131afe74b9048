use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::{Profile, User};

/// Everything the CLI persists between runs (state.toml).
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct State {
    #[serde(default)]
    pub counter: Counter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionRecord>,
    /// Download counters and premium flags, keyed by user id (`guest` for
    /// signed-out use).
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Counter {
    pub last_number: u32,
    pub last_year: i32,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            last_number: 0,
            last_year: Utc::now().year(),
        }
    }
}

/// Signed-in session returned by the identity provider.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: User,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActivityEntry {
    pub user_id: String,
    pub kind: String,
    pub at: DateTime<Utc>,
    /// JSON-encoded details (invoice number, total, ...)
    #[serde(default)]
    pub payload: String,
}
