use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which map an effect or ban targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Ip,
    User,
}

/// Visual disruption applied to a client's screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectAction {
    Black,
    Color,
    Blink,
    Invert,
}

/// A moderator-applied effect, keyed by IP or username in separate maps.
#[derive(Debug, Clone, Serialize)]
pub struct EffectEntry {
    pub action: EffectAction,
    /// CSS color the effect renders with.
    pub value: String,
    pub applied_by: String,
    pub applied_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl EffectEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// Whole seconds until expiry, rounded up; 0 for non-expiring effects.
    fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        match self.expires_at {
            Some(at) => {
                let ms = (at - now).num_milliseconds();
                if ms <= 0 { 0 } else { (ms as u64).div_ceil(1000) }
            }
            None => 0,
        }
    }
}

/// What a poll-time moderation check found. Every client poll cycle
/// evaluates this exact three-way result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationStatus {
    /// Hard ban: the caller must treat the session as terminated.
    Banned,
    /// An active effect to report.
    Effect {
        action: EffectAction,
        color: String,
        remaining_seconds: u64,
    },
    /// No moderation state applies.
    Clear,
}

/// Ban sets and timed effect maps, with the precedence logic used by the
/// poll-time check. Bans and effects are disjoint per key: banning clears
/// the same-key effect.
pub struct ModerationOverlay {
    banned_ips: DashSet<String>,
    banned_users: DashSet<String>,
    ip_effects: DashMap<String, EffectEntry>,
    user_effects: DashMap<String, EffectEntry>,
}

impl ModerationOverlay {
    pub fn new() -> Self {
        Self {
            banned_ips: DashSet::new(),
            banned_users: DashSet::new(),
            ip_effects: DashMap::new(),
            user_effects: DashMap::new(),
        }
    }

    /// True if either key is in either ban set. IP and username are
    /// checked symmetrically here, unlike `current_effect`.
    pub fn is_banned(&self, ip: &str, username: &str) -> bool {
        self.is_ip_banned(ip) || self.is_user_banned(username)
    }

    pub fn is_ip_banned(&self, ip: &str) -> bool {
        self.banned_ips.contains(ip)
    }

    pub fn is_user_banned(&self, username: &str) -> bool {
        !username.is_empty() && self.banned_users.contains(username)
    }

    /// Ban an identifier. Ban supersedes effect: any pending effect for the
    /// same key is cleared so the two never coexist.
    pub fn ban(&self, kind: TargetKind, identifier: &str, reason: &str, banned_by: &str) {
        match kind {
            TargetKind::Ip => {
                self.banned_ips.insert(identifier.to_string());
                self.ip_effects.remove(identifier);
            }
            TargetKind::User => {
                self.banned_users.insert(identifier.to_string());
                self.user_effects.remove(identifier);
            }
        }
        info!(?kind, %identifier, %reason, %banned_by, "ban applied");
    }

    /// Lift a ban, also dropping any leftover effect for the key.
    pub fn unban(&self, kind: TargetKind, identifier: &str, unbanned_by: &str) {
        match kind {
            TargetKind::Ip => {
                self.banned_ips.remove(identifier);
                self.ip_effects.remove(identifier);
            }
            TargetKind::User => {
                self.banned_users.remove(identifier);
                self.user_effects.remove(identifier);
            }
        }
        info!(?kind, %identifier, %unbanned_by, "ban lifted");
    }

    /// Clear all four maps.
    pub fn mass_unban(&self, cleared_by: &str) {
        self.banned_ips.clear();
        self.banned_users.clear();
        self.ip_effects.clear();
        self.user_effects.clear();
        info!(%cleared_by, "mass unban");
    }

    /// Apply an effect. `duration_seconds` of 0 means no expiry.
    pub fn set_effect(
        &self,
        kind: TargetKind,
        identifier: &str,
        action: EffectAction,
        color: &str,
        duration_seconds: u64,
        applied_by: &str,
        now: DateTime<Utc>,
    ) {
        let entry = EffectEntry {
            action,
            value: color.to_string(),
            applied_by: applied_by.to_string(),
            applied_at: now,
            expires_at: (duration_seconds > 0)
                .then(|| now + Duration::seconds(duration_seconds as i64)),
        };
        match kind {
            TargetKind::Ip => {
                self.ip_effects.insert(identifier.to_string(), entry);
            }
            TargetKind::User => {
                self.user_effects.insert(identifier.to_string(), entry);
            }
        }
        info!(?kind, %identifier, ?action, duration_seconds, %applied_by, "effect applied");
    }

    pub fn clear_effect(&self, kind: TargetKind, identifier: &str) {
        match kind {
            TargetKind::Ip => self.ip_effects.remove(identifier),
            TargetKind::User => self.user_effects.remove(identifier),
        };
    }

    /// The active effect for this caller, if any. Lazily removes expired
    /// entries. The IP-keyed map is consulted before the username-keyed map
    /// and wins if both hold an entry. This asymmetry matches the poll
    /// contract and must not be reordered.
    pub fn current_effect(
        &self,
        ip: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Option<ModerationStatus> {
        if let Some(status) = self.effect_from(&self.ip_effects, ip, now) {
            return Some(status);
        }
        if username.is_empty() {
            return None;
        }
        self.effect_from(&self.user_effects, username, now)
    }

    fn effect_from(
        &self,
        map: &DashMap<String, EffectEntry>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<ModerationStatus> {
        let expired = {
            let entry = map.get(key)?;
            if entry.is_expired(now) {
                true
            } else {
                return Some(ModerationStatus::Effect {
                    action: entry.action,
                    color: entry.value.clone(),
                    remaining_seconds: entry.remaining_seconds(now),
                });
            }
        };
        // Guard dropped above; safe to take the shard's write lock.
        if expired {
            map.remove(key);
        }
        None
    }

    /// The poll-time moderation check, in precedence order: ban first
    /// (either key), then effect, else clear.
    pub fn check(&self, ip: &str, username: &str, now: DateTime<Utc>) -> ModerationStatus {
        if self.is_banned(ip, username) {
            return ModerationStatus::Banned;
        }
        self.current_effect(ip, username, now)
            .unwrap_or(ModerationStatus::Clear)
    }

    /// Drop every expired effect. Idempotent with the lazy check in
    /// `current_effect`; the scheduler runs this as a backstop GC.
    pub fn expire_effects(&self, now: DateTime<Utc>) -> usize {
        let before = self.ip_effects.len() + self.user_effects.len();
        self.ip_effects.retain(|_, e| !e.is_expired(now));
        self.user_effects.retain(|_, e| !e.is_expired(now));
        before - (self.ip_effects.len() + self.user_effects.len())
    }

    pub fn banned_ips(&self) -> Vec<String> {
        self.banned_ips.iter().map(|e| e.key().clone()).collect()
    }

    pub fn banned_users(&self) -> Vec<String> {
        self.banned_users.iter().map(|e| e.key().clone()).collect()
    }

    /// "key: action" summaries of every live effect, for the debug view.
    pub fn effect_summaries(&self) -> Vec<String> {
        self.ip_effects
            .iter()
            .map(|e| format!("{}: {:?}", e.key(), e.action))
            .chain(
                self.user_effects
                    .iter()
                    .map(|e| format!("{}: {:?}", e.key(), e.action)),
            )
            .collect()
    }
}

impl Default for ModerationOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ban_either_key() {
        let overlay = ModerationOverlay::new();
        overlay.ban(TargetKind::Ip, "1.2.3.4", "spam", "admin");
        assert!(overlay.is_banned("1.2.3.4", "alice"));
        assert!(!overlay.is_banned("5.6.7.8", "alice"));

        overlay.ban(TargetKind::User, "alice", "spam", "admin");
        assert!(overlay.is_banned("5.6.7.8", "alice"));
    }

    #[test]
    fn test_ban_supersedes_effect() {
        let overlay = ModerationOverlay::new();
        let now = Utc::now();
        overlay.set_effect(
            TargetKind::User,
            "alice",
            EffectAction::Invert,
            "#000000",
            0,
            "admin",
            now,
        );
        assert!(overlay.current_effect("9.9.9.9", "alice", now).is_some());

        overlay.ban(TargetKind::User, "alice", "enough", "admin");
        assert!(overlay.is_banned("9.9.9.9", "alice"));
        assert!(overlay.current_effect("9.9.9.9", "alice", now).is_none());
        assert_eq!(overlay.check("9.9.9.9", "alice", now), ModerationStatus::Banned);
    }

    #[test]
    fn test_unban_clears_effect_too() {
        let overlay = ModerationOverlay::new();
        let now = Utc::now();
        overlay.set_effect(
            TargetKind::Ip,
            "1.2.3.4",
            EffectAction::Black,
            "#000000",
            0,
            "admin",
            now,
        );
        overlay.unban(TargetKind::Ip, "1.2.3.4", "admin");
        assert!(!overlay.is_banned("1.2.3.4", ""));
        assert!(overlay.current_effect("1.2.3.4", "", now).is_none());
    }

    #[test]
    fn test_mass_unban() {
        let overlay = ModerationOverlay::new();
        let now = Utc::now();
        overlay.ban(TargetKind::Ip, "1.2.3.4", "x", "admin");
        overlay.ban(TargetKind::User, "alice", "x", "admin");
        overlay.set_effect(
            TargetKind::User,
            "bob",
            EffectAction::Blink,
            "#ff0000",
            0,
            "admin",
            now,
        );

        overlay.mass_unban("admin");
        assert!(!overlay.is_banned("1.2.3.4", "alice"));
        assert_eq!(overlay.check("1.2.3.4", "bob", now), ModerationStatus::Clear);
        assert!(overlay.banned_ips().is_empty());
        assert!(overlay.banned_users().is_empty());
        assert!(overlay.effect_summaries().is_empty());
    }

    #[test]
    fn test_effect_expiry_is_lazy() {
        let overlay = ModerationOverlay::new();
        let t0 = Utc::now();
        overlay.set_effect(
            TargetKind::User,
            "bob",
            EffectAction::Invert,
            "#00ff00",
            5,
            "admin",
            t0,
        );

        match overlay.check("9.9.9.9", "bob", t0) {
            ModerationStatus::Effect {
                action,
                remaining_seconds,
                ..
            } => {
                assert_eq!(action, EffectAction::Invert);
                assert_eq!(remaining_seconds, 5);
            }
            other => panic!("expected effect, got {other:?}"),
        }

        // Still visible just before expiry.
        assert!(matches!(
            overlay.check("9.9.9.9", "bob", t0 + Duration::seconds(4)),
            ModerationStatus::Effect { .. }
        ));

        // Gone after expiry, and the entry is physically removed.
        assert_eq!(
            overlay.check("9.9.9.9", "bob", t0 + Duration::seconds(6)),
            ModerationStatus::Clear
        );
        assert!(overlay.effect_summaries().is_empty());
    }

    #[test]
    fn test_zero_duration_never_expires() {
        let overlay = ModerationOverlay::new();
        let t0 = Utc::now();
        overlay.set_effect(
            TargetKind::Ip,
            "1.2.3.4",
            EffectAction::Color,
            "#123456",
            0,
            "admin",
            t0,
        );

        match overlay.check("1.2.3.4", "", t0 + Duration::days(30)) {
            ModerationStatus::Effect {
                color,
                remaining_seconds,
                ..
            } => {
                assert_eq!(color, "#123456");
                assert_eq!(remaining_seconds, 0);
            }
            other => panic!("expected effect, got {other:?}"),
        }
    }

    #[test]
    fn test_ip_effect_wins_over_user_effect() {
        let overlay = ModerationOverlay::new();
        let now = Utc::now();
        overlay.set_effect(
            TargetKind::Ip,
            "1.2.3.4",
            EffectAction::Black,
            "#000000",
            0,
            "admin",
            now,
        );
        overlay.set_effect(
            TargetKind::User,
            "alice",
            EffectAction::Blink,
            "#ff0000",
            0,
            "admin",
            now,
        );

        // Both keys hold an entry; the IP-keyed one is reported.
        match overlay.current_effect("1.2.3.4", "alice", now) {
            Some(ModerationStatus::Effect { action, .. }) => {
                assert_eq!(action, EffectAction::Black);
            }
            other => panic!("expected ip effect, got {other:?}"),
        }

        // From a different IP the username-keyed entry applies.
        match overlay.current_effect("5.6.7.8", "alice", now) {
            Some(ModerationStatus::Effect { action, .. }) => {
                assert_eq!(action, EffectAction::Blink);
            }
            other => panic!("expected user effect, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_ip_effect_falls_through_to_user() {
        let overlay = ModerationOverlay::new();
        let t0 = Utc::now();
        overlay.set_effect(
            TargetKind::Ip,
            "1.2.3.4",
            EffectAction::Black,
            "#000000",
            2,
            "admin",
            t0,
        );
        overlay.set_effect(
            TargetKind::User,
            "alice",
            EffectAction::Invert,
            "#ffffff",
            0,
            "admin",
            t0,
        );

        match overlay.current_effect("1.2.3.4", "alice", t0 + Duration::seconds(3)) {
            Some(ModerationStatus::Effect { action, .. }) => {
                assert_eq!(action, EffectAction::Invert);
            }
            other => panic!("expected user effect, got {other:?}"),
        }
    }

    #[test]
    fn test_expire_effects_sweep() {
        let overlay = ModerationOverlay::new();
        let t0 = Utc::now();
        overlay.set_effect(
            TargetKind::Ip,
            "1.2.3.4",
            EffectAction::Black,
            "#000000",
            5,
            "admin",
            t0,
        );
        overlay.set_effect(
            TargetKind::User,
            "alice",
            EffectAction::Blink,
            "#ff0000",
            10,
            "admin",
            t0,
        );
        overlay.set_effect(
            TargetKind::User,
            "bob",
            EffectAction::Color,
            "#00ff00",
            0,
            "admin",
            t0,
        );

        assert_eq!(overlay.expire_effects(t0 + Duration::seconds(7)), 1);
        assert_eq!(overlay.expire_effects(t0 + Duration::seconds(11)), 1);
        // Non-expiring effect survives; sweep is idempotent.
        assert_eq!(overlay.expire_effects(t0 + Duration::seconds(11)), 0);
        assert_eq!(overlay.effect_summaries().len(), 1);
    }

    #[test]
    fn test_remaining_seconds_rounds_up() {
        let entry = EffectEntry {
            action: EffectAction::Blink,
            value: "#ff0000".into(),
            applied_by: "admin".into(),
            applied_at: Utc::now(),
            expires_at: Some(Utc::now() + Duration::milliseconds(9_500)),
        };
        assert_eq!(entry.remaining_seconds(Utc::now()), 10);
    }
}
