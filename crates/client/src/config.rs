//! Client configuration.
//!
//! Read from `wizard.toml`, searched in `./` then the user config directory
//! (`~/.config/wizard/` on Linux). `${ENV_VAR}` placeholders in the file are
//! substituted, and `WIZARD_GATEWAY_URL` overrides the gateway URL.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::error::{Context, Result};

pub const CONFIG_FILENAME: &str = "wizard.toml";
pub const GATEWAY_URL_ENV: &str = "WIZARD_GATEWAY_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:9433/ws/chat`.
    pub url: String,
    pub rpc_timeout_secs: u64,
    /// Sent as `client.id` in the connect handshake.
    pub client_id: String,
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9433/ws/chat".into(),
            rpc_timeout_secs: 10,
            client_id: "wizard-cli".into(),
            api_key: None,
        }
    }
}

impl GatewayConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs.max(1))
    }
}

/// Load config from `path`, substituting `${ENV_VAR}` placeholders.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw, |name| std::env::var(name).ok());
    toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Find and load the config file, falling back to defaults, then apply
/// environment overrides.
pub fn discover_and_load() -> ClientConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ClientConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            ClientConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

pub fn apply_env_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(GATEWAY_URL_ENV).filter(|u| !u.trim().is_empty()) {
        config.gateway.url = url;
    }
}

/// Returns the user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "wizard").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .filter(|p| p.exists())
}

/// Replace `${NAME}` with `lookup(NAME)`. Unknown or malformed placeholders
/// are left as written.
fn substitute_env(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            },
            _ => {
                out.push_str("${");
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::io::Write};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "GATEWAY_HOST" => Some("gw.internal".into()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_and_keeps_unknown() {
        assert_eq!(
            substitute_env("ws://${GATEWAY_HOST}/${MISSING}", lookup),
            "ws://gw.internal/${MISSING}"
        );
        assert_eq!(substitute_env("${} and ${open", lookup), "${} and ${open");
    }

    #[test]
    fn loads_partial_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[gateway]\nurl = \"wss://example.com/ws/chat\"").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.gateway.url, "wss://example.com/ws/chat");
        assert_eq!(config.gateway.rpc_timeout_secs, 10);
        assert_eq!(config.gateway.client_id, "wizard-cli");
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[gateway\nurl = 3").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_override_replaces_url() {
        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, |name| {
            (name == GATEWAY_URL_ENV).then(|| "ws://10.0.0.2:9433/ws/chat".to_string())
        });
        assert_eq!(config.gateway.url, "ws://10.0.0.2:9433/ws/chat");

        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config.gateway.url, "ws://10.0.0.2:9433/ws/chat");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let gateway = GatewayConfig {
            rpc_timeout_secs: 0,
            ..GatewayConfig::default()
        };
        assert_eq!(gateway.rpc_timeout(), Duration::from_secs(1));
    }
}
