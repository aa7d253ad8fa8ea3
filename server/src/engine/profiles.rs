use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Theme names clients may select.
pub const THEMES: &[&str] = &[
    "dark",
    "matrix",
    "cyberpunk",
    "ocean",
    "sunset",
    "forest",
    "midnight",
    "synthwave",
];

/// Chat layout names clients may select.
pub const LAYOUTS: &[&str] = &["compact", "modern", "bubbles", "minimal"];

pub const DEFAULT_THEME: &str = "dark";
pub const DEFAULT_LAYOUT: &str = "modern";

/// Per-username display preferences.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub theme: String,
    pub layout: String,
    pub joined: DateTime<Utc>,
}

pub struct ProfileStore {
    profiles: DashMap<String, UserProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }

    /// Create a profile on first sight of a username. Re-login keeps the
    /// existing preferences.
    pub fn ensure(&self, username: &str, avatar: Option<String>, now: DateTime<Utc>) {
        self.profiles
            .entry(username.to_string())
            .or_insert_with(|| UserProfile {
                avatar,
                theme: DEFAULT_THEME.to_string(),
                layout: DEFAULT_LAYOUT.to_string(),
                joined: now,
            });
    }

    /// Select a theme. Unknown names fall back to the default rather than
    /// erroring.
    pub fn set_theme(&self, username: &str, theme: &str) {
        let theme = if THEMES.contains(&theme) {
            theme
        } else {
            DEFAULT_THEME
        };
        if let Some(mut profile) = self.profiles.get_mut(username) {
            profile.theme = theme.to_string();
        }
    }

    /// Select a layout, with the same fall-back behavior as themes.
    pub fn set_layout(&self, username: &str, layout: &str) {
        let layout = if LAYOUTS.contains(&layout) {
            layout
        } else {
            DEFAULT_LAYOUT
        };
        if let Some(mut profile) = self.profiles.get_mut(username) {
            profile.layout = layout.to_string();
        }
    }

    pub fn get(&self, username: &str) -> Option<UserProfile> {
        self.profiles.get(username).map(|p| p.clone())
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let store = ProfileStore::new();
        let now = Utc::now();
        store.ensure("alice", Some("http://a/avatar.png".into()), now);
        store.set_theme("alice", "matrix");
        store.ensure("alice", None, now);

        let profile = store.get("alice").unwrap();
        assert_eq!(profile.theme, "matrix");
        assert_eq!(profile.avatar.as_deref(), Some("http://a/avatar.png"));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let store = ProfileStore::new();
        store.ensure("alice", None, Utc::now());
        store.set_theme("alice", "neon-zebra");
        assert_eq!(store.get("alice").unwrap().theme, DEFAULT_THEME);

        store.set_theme("alice", "ocean");
        assert_eq!(store.get("alice").unwrap().theme, "ocean");
    }

    #[test]
    fn test_unknown_layout_falls_back() {
        let store = ProfileStore::new();
        store.ensure("alice", None, Utc::now());
        store.set_layout("alice", "sideways");
        assert_eq!(store.get("alice").unwrap().layout, DEFAULT_LAYOUT);

        store.set_layout("alice", "bubbles");
        assert_eq!(store.get("alice").unwrap().layout, "bubbles");
    }
}
