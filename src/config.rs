// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading.

use crate::dispatch::DispatchSettings;
use crate::listener::DEFAULT_SOCKET_PATH;
use crate::persistence::DEFAULT_SESSION_PATH;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// Unix socket the capture add-on writes frames to
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Per-request timeout in seconds (default: 20)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Verify server certificates
    #[serde(default)]
    pub verify_tls: bool,

    /// Bulk items in flight at once (default: 1, sequential)
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,
}

fn default_timeout_seconds() -> u64 {
    20
}

fn default_bulk_concurrency() -> usize {
    1
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            verify_tls: false,
            bulk_concurrency: default_bulk_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session snapshot JSON path
    #[serde(default = "default_session_path")]
    pub path: String,
}

fn default_session_path() -> String {
    DEFAULT_SESSION_PATH.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file. Every section is optional:
    ///
    /// [listener]
    /// socket_path = "/tmp/anvesha_proxy.sock"
    ///
    /// [dispatch]
    /// timeout_seconds = 20
    /// verify_tls = false
    /// bulk_concurrency = 1
    ///
    /// [session]
    /// path = "anvesha_session.json"
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let s = tokio::fs::read_to_string(path.as_ref()).await?;
        let cfg: Self = toml::from_str(&s)?;
        if cfg.dispatch.timeout_seconds == 0 {
            anyhow::bail!("dispatch.timeout_seconds must be greater than zero");
        }
        Ok(cfg)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            timeout: Duration::from_secs(self.dispatch.timeout_seconds),
            verify_tls: self.dispatch.verify_tls,
            bulk_concurrency: self.dispatch.bulk_concurrency.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::fs;
    use uuid::Uuid;

    #[test]
    fn defaults_match_builtin_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.listener.socket_path, "/tmp/anvesha_proxy.sock");
        assert_eq!(cfg.session.path, "anvesha_session.json");
        assert_eq!(cfg.dispatch_settings(), DispatchSettings::default());
    }

    #[tokio::test]
    async fn load_toml_file() -> anyhow::Result<()> {
        let tmp_toml =
            std::env::temp_dir().join(format!("anvesha_cfg_test_{}.toml", Uuid::new_v4()));
        let toml = r#"[listener]
socket_path = "/tmp/other.sock"

[dispatch]
timeout_seconds = 5
verify_tls = true
bulk_concurrency = 4
"#;
        fs::write(&tmp_toml, toml).await?;
        let cfg = Config::load_from_path(&tmp_toml).await?;
        assert_eq!(cfg.listener.socket_path, "/tmp/other.sock");
        assert_eq!(cfg.session.path, "anvesha_session.json");

        let settings = cfg.dispatch_settings();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.verify_tls);
        assert_eq!(settings.bulk_concurrency, 4);
        fs::remove_file(&tmp_toml).await?;
        Ok(())
    }

    #[tokio::test]
    async fn partial_section_keeps_other_defaults() -> anyhow::Result<()> {
        let tmp_toml =
            std::env::temp_dir().join(format!("anvesha_cfg_test_{}.toml", Uuid::new_v4()));
        fs::write(&tmp_toml, "[dispatch]\nbulk_concurrency = 0\n").await?;
        let cfg = Config::load_from_path(&tmp_toml).await?;
        assert_eq!(cfg.dispatch.timeout_seconds, 20);
        assert!(!cfg.dispatch.verify_tls);
        assert_eq!(cfg.dispatch_settings().bulk_concurrency, 1);
        fs::remove_file(&tmp_toml).await?;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_files_are_errors() -> anyhow::Result<()> {
        let tmp_toml =
            std::env::temp_dir().join(format!("anvesha_cfg_test_{}.toml", Uuid::new_v4()));
        fs::write(&tmp_toml, "[dispatch]\ntimeout_seconds = \"soon\"\n").await?;
        assert!(Config::load_from_path(&tmp_toml).await.is_err());

        fs::write(&tmp_toml, "[dispatch]\ntimeout_seconds = 0\n").await?;
        assert!(Config::load_from_path(&tmp_toml).await.is_err());

        fs::remove_file(&tmp_toml).await?;
        assert!(Config::load_from_path(&tmp_toml).await.is_err());
        Ok(())
    }
}
