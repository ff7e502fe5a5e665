use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub global: GlobalConfig,
    pub chains: HashMap<String, ChainConfig>,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level for the observer
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier
    pub chain_id: String,
    /// Tendermint RPC endpoint (full URL)
    pub rpc_endpoint: String,
    /// REST (LCD) endpoint, used for rollapp state queries on a hub
    pub rest_endpoint: String,
    /// Chain CLI binary used to submit transactions
    pub binary: String,
    /// Native denom
    pub denom: String,
    /// Gas price and denom
    pub gas_prices: String,
    /// Keyring backend holding the signing keys
    #[serde(default = "default_keyring_backend")]
    pub keyring_backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Idle time between height polls in milliseconds
    pub height_poll_interval_ms: u64,
    /// Idle time between rollapp state polls in milliseconds
    pub finalization_poll_interval_ms: u64,
    /// Default budget for finalization waits in seconds
    pub finalization_timeout_secs: u64,
}

fn default_keyring_backend() -> String {
    "test".to_string()
}

impl WatchConfig {
    pub fn height_poll_interval(&self) -> Duration {
        Duration::from_millis(self.height_poll_interval_ms)
    }

    pub fn finalization_poll_interval(&self) -> Duration {
        Duration::from_millis(self.finalization_poll_interval_ms)
    }

    pub fn finalization_timeout(&self) -> Duration {
        Duration::from_secs(self.finalization_timeout_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            height_poll_interval_ms: 1000,
            finalization_poll_interval_ms: 10_000,
            finalization_timeout_secs: 600,
        }
    }
}

impl ObserverConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ObserverConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get chain configuration by name
    pub fn get_chain(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.get(name)
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        let mut chains = HashMap::new();

        // Dymension hub testnet
        chains.insert("hub".to_string(), ChainConfig {
            chain_id: "blumbus_111-1".to_string(),
            rpc_endpoint: "https://rpc-blumbus.mzonder.com:443".to_string(),
            rest_endpoint: "https://api-blumbus.mzonder.com".to_string(),
            binary: "dymd".to_string(),
            denom: "adym".to_string(),
            gas_prices: "1000adym".to_string(),
            keyring_backend: default_keyring_backend(),
        });

        // EVM rollapp settled on the hub
        chains.insert("rollapp-evm".to_string(), ChainConfig {
            chain_id: "rolx_100004-1".to_string(),
            rpc_endpoint: "https://rpc.rolxtwo.evm.ra.blumbus.noisnemyd.xyz:443".to_string(),
            rest_endpoint: "https://api.rolxtwo.evm.ra.blumbus.noisnemyd.xyz".to_string(),
            binary: "rollapp-evm".to_string(),
            denom: "arolx".to_string(),
            gas_prices: "0.0arolx".to_string(),
            keyring_backend: default_keyring_backend(),
        });

        Self {
            global: GlobalConfig {
                log_level: "info".to_string(),
            },
            chains,
            watch: WatchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observer.toml");

        let config = ObserverConfig::default();
        config.save(&path).unwrap();
        let loaded = ObserverConfig::load(&path).unwrap();

        let hub = loaded.get_chain("hub").unwrap();
        assert_eq!(hub.chain_id, "blumbus_111-1");
        assert_eq!(hub.binary, "dymd");
        assert_eq!(loaded.watch.finalization_poll_interval(), Duration::from_secs(10));
        assert!(loaded.get_chain("missing").is_none());
    }

    #[test]
    fn test_watch_section_and_keyring_are_optional() {
        let config: ObserverConfig = toml::from_str(
            r#"
            [global]
            log_level = "debug"

            [chains.hub]
            chain_id = "dymension_1100-1"
            rpc_endpoint = "http://localhost:26657"
            rest_endpoint = "http://localhost:1317"
            binary = "dymd"
            denom = "adym"
            gas_prices = "20000000000adym"
            "#,
        )
        .unwrap();

        assert_eq!(config.watch.height_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.watch.finalization_timeout(), Duration::from_secs(600));
        assert_eq!(config.chains["hub"].keyring_backend, "test");
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conifg").join("observer.toml");

        let err = ObserverConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
        assert!(err.to_string().contains("observer.toml"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observer.toml");
        std::fs::write(&path, "[global]\nlog_level = 3\n").unwrap();

        let err = ObserverConfig::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config file"));
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/observer.toml");
        let config = ObserverConfig::load(path).unwrap();
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains["rollapp-evm"].denom, "arolx");
    }
}
