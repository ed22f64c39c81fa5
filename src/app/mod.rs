pub mod bridge;
pub mod ffi;
pub mod plugin;
pub mod registry;
pub mod shutdown;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::common::BridgeError;
use crate::config::Config;
use crate::router::{EventRouter, RouterEvent};

use bridge::FfiBridge;
use plugin::PluginRuntime;
use shutdown::ShutdownSignal;

/// 宿主：持有绑定好的桥接实例，消费 Router 事件直到收到关闭信号
pub struct App {
    events: mpsc::Receiver<RouterEvent>,
    shutdown: ShutdownSignal,
    _bridge: Arc<FfiBridge>,
}

impl App {
    pub fn new(config: Config, plugin: Arc<dyn PluginRuntime>) -> Result<Self> {
        let (router, events) = EventRouter::new(&config.router);
        let shutdown = ShutdownSignal::new();
        let bridge = FfiBridge::bind(
            Arc::new(router),
            plugin,
            shutdown.clone(),
            config.bridge.clone(),
        )
        .inspect_err(|e| error!(kind = e.kind().as_str(), error = %e, "failed to bind ffi bridge"))?;

        Ok(Self {
            events,
            shutdown,
            _bridge: bridge,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// 逐个处理事件；关闭信号到达后处理完已排队的事件再返回
    pub async fn run(mut self, mut on_event: impl FnMut(RouterEvent)) -> Result<()> {
        info!("peerbridge started");
        let cancel = self.shutdown.token();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => on_event(event),
                    None => {
                        return Err(BridgeError::Router("router event queue closed".into()).into());
                    }
                },
            }
        }

        while let Ok(event) = self.events.try_recv() {
            on_event(event);
        }
        info!("peerbridge stopped");
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        registry::global().unbind();
    }
}
