use std::net::{IpAddr, Ipv4Addr};

use anyhow::Result;
use serde::Deserialize;

use crate::common::BridgeError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let dc = &self.bridge.data_connection;
        if dc.port_allocation == PortAllocation::Fixed && dc.port == 0 {
            return Err(BridgeError::Config(
                "bridge.data_connection.port must be non-zero for fixed allocation".into(),
            )
            .into());
        }
        if self.router.event_buffer == 0 {
            return Err(BridgeError::Config("router.event_buffer must be positive".into()).into());
        }
        if self.log.level.trim().is_empty() {
            return Err(BridgeError::Config("log.level must not be empty".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    /// 是否把插件的数据连接关闭事件转发给关闭处理器；关闭时只归还缓冲区
    #[serde(default)]
    pub forward_data_connection_close: bool,
    #[serde(default)]
    pub data_connection: DataConnectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConnectionConfig {
    #[serde(default)]
    pub port_allocation: PortAllocation,
    #[serde(default = "default_data_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
}

impl Default for DataConnectionConfig {
    fn default() -> Self {
        Self {
            port_allocation: PortAllocation::default(),
            port: default_data_port(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_data_port() -> u16 {
    51111
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// 数据连接端口的分配方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortAllocation {
    /// 始终返回配置的端口
    #[default]
    Fixed,
    /// 向系统申请一个空闲端口
    Ephemeral,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_event_buffer() -> usize {
    64
}
