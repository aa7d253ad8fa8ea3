use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Top-level server configuration, loaded from palaver.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub admin: AdminSection,
    pub sweep: SweepSection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub web_address: String,
    /// Public origin allowed by CORS. Localhost values allow any origin.
    pub public_url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            web_address: "0.0.0.0:8080".into(),
            public_url: "http://localhost:8080".into(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct AdminSection {
    /// Usernames granted the moderator role at session creation.
    pub admin_users: Vec<String>,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct SweepSection {
    /// Seconds between background sweeps.
    pub interval_secs: u64,
    /// Absolute presence-inactivity threshold for the background sweep.
    pub presence_idle_minutes: i64,
    /// Inactivity threshold for the opportunistic sweep on heartbeats.
    pub heartbeat_idle_minutes: i64,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            presence_idle_minutes: 15,
            heartbeat_idle_minutes: 5,
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file
    /// doesn't exist. Environment variables override TOML values.
    pub fn load(path: &str) -> Self {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("failed to read config file {}: {}", path, e));
            toml::from_str(&contents)
                .unwrap_or_else(|e| panic!("failed to parse config file {}: {}", path, e))
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WEB_ADDRESS") {
            self.server.web_address = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_URL") {
            self.server.public_url = v;
        }
        if let Ok(v) = std::env::var("ADMIN_USERS") {
            self.admin.admin_users = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("SWEEP_INTERVAL_SECS")
            && let Ok(secs) = v.parse()
        {
            self.sweep.interval_secs = secs;
        }
    }

    /// True if the username should hold the moderator role.
    pub fn is_admin_user(&self, username: &str) -> bool {
        self.admin.admin_users.iter().any(|u| u == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.web_address, "0.0.0.0:8080");
        assert_eq!(config.sweep.interval_secs, 300);
        assert_eq!(config.sweep.presence_idle_minutes, 15);
        assert_eq!(config.sweep.heartbeat_idle_minutes, 5);
        assert!(config.admin.admin_users.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            web_address = "127.0.0.1:9000"

            [admin]
            admin_users = ["root", "moderator"]

            [sweep]
            interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.server.web_address, "127.0.0.1:9000");
        assert!(config.is_admin_user("root"));
        assert!(!config.is_admin_user("alice"));
        assert_eq!(config.sweep.interval_secs, 60);
        // Unspecified section keys keep their defaults.
        assert_eq!(config.sweep.presence_idle_minutes, 15);
    }
}
