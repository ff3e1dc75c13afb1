use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_5000")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub session: SessionCookieConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".into(),
            session: SessionCookieConfig::default(),
        }
    }
}

/// The encrypted cookie that carries both identities between the OAuth
/// callbacks and `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookieConfig {
    #[serde(default = "d_cookie_name")]
    pub cookie_name: String,
    /// Set the `Secure` attribute. Disable only for plain-http local runs.
    #[serde(default = "d_true")]
    pub secure: bool,
    /// Cookie lifetime; an unfinished link attempt expires after this.
    #[serde(default = "d_max_age")]
    pub max_age_secs: i64,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            cookie_name: d_cookie_name(),
            secure: true,
            max_age_secs: d_max_age(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_5000() -> u16 {
    5000
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cookie_name() -> String {
    "lb_session".into()
}
fn d_true() -> bool {
    true
}
fn d_max_age() -> i64 {
    3600
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_empty_toml_uses_all_defaults() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.session.cookie_name, "lb_session");
        assert!(cfg.session.secure);
        assert_eq!(cfg.session.max_age_secs, 3600);
    }

    #[test]
    fn session_cookie_can_be_relaxed_for_local_runs() {
        let toml_str = r#"
            port = 8080
            host = "0.0.0.0"

            [session]
            secure = false
        "#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert!(!cfg.session.secure);
        assert_eq!(cfg.session.cookie_name, "lb_session");
    }
}
