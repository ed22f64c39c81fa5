//! 回调桥接：把插件事件转换为 Router 调用。
//!
//! 构造即绑定：生成三个捕获自身的处理器闭包，写入注册表，安装关闭
//! 信号，再把四个 C 入口一次性注册给插件。整个进程同一时刻只允许一个
//! 桥接实例绑定。

use std::net::{IpAddr, TcpListener};
use std::num::NonZeroU16;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::ffi::{CallbackFunctions, LoadResult};
use super::plugin::PluginRuntime;
use super::registry::{self, BoundHandlers, DataClosedHandler, HandlerRegistry};
use super::shutdown::{self, ShutdownSignal, ShutdownSlot};
use crate::common::{BridgeError, PluginString};
use crate::config::types::{BridgeConfig, DataConnectionConfig, PortAllocation};
use crate::router::Router;

pub struct FfiBridge {
    router: Arc<dyn Router>,
    config: BridgeConfig,
}

impl FfiBridge {
    /// 绑定到进程级注册表与关闭槽位，并向插件注册回调
    pub fn bind(
        router: Arc<dyn Router>,
        plugin: Arc<dyn PluginRuntime>,
        shutdown: ShutdownSignal,
        config: BridgeConfig,
    ) -> Result<Arc<Self>, BridgeError> {
        Self::bind_to(
            registry::global(),
            shutdown::process(),
            router,
            plugin,
            shutdown,
            config,
        )
    }

    /// 写入指定的注册表与槽位；已有绑定时两者都保持不变，也不会调用插件
    /// 的注册接口
    ///
    /// 注册给插件的 C 入口固定分发到进程级注册表，因此只有传入
    /// `registry::global()` 与 `shutdown::process()` 时插件回调才会到达这里
    /// 绑定的处理器。
    pub(crate) fn bind_to(
        registry: &HandlerRegistry,
        slot: &ShutdownSlot,
        router: Arc<dyn Router>,
        plugin: Arc<dyn PluginRuntime>,
        shutdown: ShutdownSignal,
        config: BridgeConfig,
    ) -> Result<Arc<Self>, BridgeError> {
        let bridge = Arc::new(Self { router, config });
        registry.bind(bridge.handlers(plugin.clone()))?;
        slot.install(shutdown);
        plugin.register_callbacks(CallbackFunctions::boundary());
        info!(
            forward_close = bridge.config.forward_data_connection_close,
            port_allocation = ?bridge.config.data_connection.port_allocation,
            "ffi bridge bound"
        );
        Ok(bridge)
    }

    fn handlers(self: &Arc<Self>, plugin: Arc<dyn PluginRuntime>) -> BoundHandlers {
        let this = Arc::clone(self);
        let peer_created = Arc::new(move |peer_id: PluginString, token: PluginString| {
            this.create_peer_callback(peer_id, token)
        });

        let this = Arc::clone(self);
        let data_requested =
            Arc::new(move |message: PluginString| this.create_data_connection_callback(message));

        let data_closed = if self.config.forward_data_connection_close {
            let this = Arc::clone(self);
            let handler: DataClosedHandler =
                Arc::new(move |id: PluginString| this.delete_data_connection_callback(id));
            Some(handler)
        } else {
            None
        };

        BoundHandlers {
            plugin,
            peer_created,
            data_requested,
            data_closed,
        }
    }

    // 缓冲区在函数返回时归还，晚于 Router 调用
    fn create_peer_callback(&self, peer_id: PluginString, token: PluginString) {
        let peer = peer_id.to_string_lossy();
        info!(peer_id = %peer, "peer created");
        if let Err(e) = self.router.on_create_peer(&peer, &token.to_string_lossy()) {
            warn!(peer_id = %peer, error = %e, "router failed to handle created peer");
        }
    }

    fn create_data_connection_callback(&self, message: PluginString) -> LoadResult {
        debug!(bytes = message.len(), "data connection requested");
        drop(message);
        // TODO: decode source/destination topics once the data connection model is defined
        allocate_port(&self.config.data_connection)
    }

    fn delete_data_connection_callback(&self, data_connection_id: PluginString) {
        info!(
            data_connection_id = %data_connection_id.to_string_lossy(),
            "data connection closed"
        );
    }
}

fn allocate_port(config: &DataConnectionConfig) -> LoadResult {
    match config.port_allocation {
        PortAllocation::Fixed => match NonZeroU16::new(config.port) {
            Some(port) => LoadResult::loaded(port),
            None => LoadResult::failed("fixed data connection port is 0"),
        },
        PortAllocation::Ephemeral => match available_port(config.bind_address) {
            Ok(port) => LoadResult::loaded(port),
            Err(e) => {
                warn!(error = %e, addr = %config.bind_address, "no free data connection port");
                LoadResult::failed(format!("no free port on {}: {}", config.bind_address, e))
            }
        },
    }
}

/// 向系统申请一个当前空闲的 TCP 端口
fn available_port(addr: IpAddr) -> std::io::Result<NonZeroU16> {
    let listener = TcpListener::bind((addr, 0))?;
    let port = listener.local_addr()?.port();
    NonZeroU16::new(port).ok_or_else(|| std::io::Error::other("system assigned port 0"))
}
