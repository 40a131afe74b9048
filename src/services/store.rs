use chrono::Utc;
use std::path::PathBuf;

use super::{ActivityKind, Profile, ProfileStore};
use crate::config::{load_state, save_state, ActivityEntry};
use crate::error::Result;

/// Profile store backed by state.toml in the config directory.
pub struct FileProfileStore {
    config_dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

impl ProfileStore for FileProfileStore {
    fn get_profile(&self, user_id: &str) -> Result<Profile> {
        let state = load_state(&self.config_dir)?;
        Ok(state.profiles.get(user_id).cloned().unwrap_or_default())
    }

    fn record_activity(
        &self,
        user_id: &str,
        kind: ActivityKind,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let mut state = load_state(&self.config_dir)?;
        state.activity.push(ActivityEntry {
            user_id: user_id.to_string(),
            kind: kind.as_str().to_string(),
            at: Utc::now(),
            payload: payload.to_string(),
        });
        save_state(&self.config_dir, &state)?;
        tracing::debug!(user_id, kind = kind.as_str(), "activity recorded");
        Ok(())
    }

    fn record_download(&self, user_id: &str) -> Result<u32> {
        let mut state = load_state(&self.config_dir)?;
        let profile = state.profiles.entry(user_id.to_string()).or_default();
        profile.downloads_used = profile.downloads_used.saturating_add(1);
        let used = profile.downloads_used;
        save_state(&self.config_dir, &state)?;
        Ok(used)
    }
}
