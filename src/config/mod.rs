pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

pub use types::Config;

/// 解析配置文本：先尝试 JSON，再尝试 YAML
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = match serde_json::from_str(content) {
        Ok(c) => c,
        Err(_) => serde_yml::from_str(content).context("invalid bridge config")?,
    };
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read config '{}'", path))?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::BridgeErrorKind;
    use crate::common::BridgeError;
    use types::PortAllocation;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.log.level, "info");
        assert!(!config.bridge.forward_data_connection_close);
        assert_eq!(config.bridge.data_connection.port, 51111);
        assert_eq!(
            config.bridge.data_connection.port_allocation,
            PortAllocation::Fixed
        );
        assert_eq!(
            config.bridge.data_connection.bind_address.to_string(),
            "0.0.0.0"
        );
        assert_eq!(config.router.event_buffer, 64);
    }

    #[test]
    fn parses_yaml() {
        let config = parse_config(
            "log:\n  level: debug\nbridge:\n  forward_data_connection_close: true\n  data_connection:\n    port_allocation: ephemeral\n    bind_address: 127.0.0.1\nrouter:\n  event_buffer: 8\n",
        )
        .unwrap();
        assert_eq!(config.log.level, "debug");
        assert!(config.bridge.forward_data_connection_close);
        assert_eq!(
            config.bridge.data_connection.port_allocation,
            PortAllocation::Ephemeral
        );
        assert_eq!(
            config.bridge.data_connection.bind_address.to_string(),
            "127.0.0.1"
        );
        assert_eq!(config.router.event_buffer, 8);
    }

    #[test]
    fn parses_json() {
        let config = parse_config(
            r#"{"bridge": {"data_connection": {"port": 40000}}, "router": {"event_buffer": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.bridge.data_connection.port, 40000);
        assert_eq!(config.router.event_buffer, 2);
    }

    #[test]
    fn rejects_zero_fixed_port() {
        let err = parse_config("bridge:\n  data_connection:\n    port: 0\n").unwrap_err();
        assert_eq!(BridgeError::classify(&err), BridgeErrorKind::Config);
    }

    #[test]
    fn zero_port_allowed_for_ephemeral() {
        let config = parse_config(
            "bridge:\n  data_connection:\n    port_allocation: ephemeral\n    port: 0\n",
        )
        .unwrap();
        assert_eq!(config.bridge.data_connection.port, 0);
    }

    #[test]
    fn rejects_zero_event_buffer() {
        let err = parse_config("router:\n  event_buffer: 0\n").unwrap_err();
        assert!(err.to_string().contains("event_buffer"));
    }

    #[test]
    fn rejects_bad_bind_address() {
        assert!(parse_config("bridge:\n  data_connection:\n    bind_address: nowhere\n").is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peerbridge.yaml");
        std::fs::write(&path, "log:\n  level: warn\n").unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
