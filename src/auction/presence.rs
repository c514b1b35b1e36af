use std::collections::HashSet;

use super::wire;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    Offline,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntry {
    #[serde(deserialize_with = "wire::id")]
    pub user_id: String,
    #[serde(default = "default_status")]
    pub status: PresenceStatus,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_status() -> PresenceStatus {
    PresenceStatus::Online
}

/// Users that came online or went away in a single presence update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceChanges {
    pub joins: Vec<String>,
    pub leaves: Vec<String>,
}

impl PresenceChanges {
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty() && self.leaves.is_empty()
    }
}

/// Who is in the auction room right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Presence {
    entries: Vec<PresenceEntry>,
}

impl Presence {
    pub fn list(&self) -> &[PresenceEntry] {
        &self.entries
    }

    pub fn online_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == PresenceStatus::Online)
            .count()
    }

    /// Replaces the roster with a full list from the server
    pub fn sync_list(&mut self, new_entries: Vec<PresenceEntry>) -> PresenceChanges {
        let online_before = self.online_ids();
        self.entries = new_entries;
        let online_after = self.online_ids();

        let mut joins: Vec<String> = online_after
            .difference(&online_before)
            .map(|id| id.to_string())
            .collect();
        let mut leaves: Vec<String> = online_before
            .difference(&online_after)
            .map(|id| id.to_string())
            .collect();
        joins.sort();
        leaves.sort();

        PresenceChanges { joins, leaves }
    }

    /// Applies a single user's status change
    pub fn apply_user(&mut self, entry: PresenceEntry) -> PresenceChanges {
        let was_online = self
            .entries
            .iter()
            .any(|e| e.user_id == entry.user_id && e.status == PresenceStatus::Online);
        let is_online = entry.status == PresenceStatus::Online;
        let user_id = entry.user_id.clone();

        match self.entries.iter_mut().find(|e| e.user_id == entry.user_id) {
            Some(existing) => {
                if entry.display_name.is_none() {
                    existing.status = entry.status;
                } else {
                    *existing = entry;
                }
            }
            None => self.entries.push(entry),
        }

        let mut changes = PresenceChanges::default();
        match (was_online, is_online) {
            (false, true) => changes.joins.push(user_id),
            (true, false) => changes.leaves.push(user_id),
            _ => {}
        }
        changes
    }

    fn online_ids(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter(|e| e.status == PresenceStatus::Online)
            .map(|e| e.user_id.clone())
            .collect()
    }
}
