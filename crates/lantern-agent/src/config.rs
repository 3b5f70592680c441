//! Binary configuration assembled with figment.
//!
//! Precedence, lowest to highest: built-in defaults, the JSON config file,
//! `LANTERN_`-prefixed environment variables (`__` separates nesting, e.g.
//! `LANTERN_SERVER__PORT=4000`).

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use lantern_runtime::RuntimeConfig;
use lantern_server::ServerConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the lantern-agent binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Transport surface settings.
    pub server: ServerConfig,
    /// Turn orchestration timeouts.
    pub runtime: RuntimeConfig,
    /// Path to a JSON file of source records to serve as the corpus.
    pub corpus_path: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl AgentConfig {
    /// Load configuration, layering `config_file` (when given) and the
    /// environment over the defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::defaults()));
        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }
        figment.merge(Env::prefixed("LANTERN_").split("__")).extract()
    }

    fn defaults() -> Self {
        Self {
            log_filter: "info".into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file_or_env() {
        figment::Jail::expect_with(|_jail| {
            let cfg = AgentConfig::load(None).unwrap();
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.runtime.planner_timeout_ms, 15_000);
            assert_eq!(cfg.log_filter, "info");
            assert!(cfg.corpus_path.is_none());
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "lantern.json",
                r#"{ "server": { "port": 4000 }, "logFilter": "debug" }"#,
            )?;
            let cfg = AgentConfig::load(Some(Path::new("lantern.json"))).unwrap();
            assert_eq!(cfg.server.port, 4000);
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.log_filter, "debug");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("lantern.json", r#"{ "server": { "port": 4000 } }"#)?;
            jail.set_env("LANTERN_SERVER__PORT", "9000");
            let cfg = AgentConfig::load(Some(Path::new("lantern.json"))).unwrap();
            assert_eq!(cfg.server.port, 9000);
            Ok(())
        });
    }
}
