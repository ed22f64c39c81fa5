use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::common::BridgeError;
use crate::config::types::RouterConfig;

/// 接收桥接层转换后的高层事件，决定应用行为
///
/// 调用发生在插件线程上，实现不得阻塞。
pub trait Router: Send + Sync {
    fn on_create_peer(&self, peer_id: &str, token: &str) -> anyhow::Result<()>;
}

#[derive(Clone, PartialEq, Eq)]
pub enum RouterEvent {
    PeerCreated { peer_id: String, token: String },
}

// token 是会话凭据，不进日志
impl fmt::Debug for RouterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterEvent::PeerCreated { peer_id, .. } => f
                .debug_struct("PeerCreated")
                .field("peer_id", peer_id)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// 把事件投递到有界通道，交给异步宿主处理
pub struct EventRouter {
    tx: mpsc::Sender<RouterEvent>,
}

impl EventRouter {
    pub fn new(config: &RouterConfig) -> (Self, mpsc::Receiver<RouterEvent>) {
        let (tx, rx) = mpsc::channel(config.event_buffer.max(1));
        (Self { tx }, rx)
    }
}

impl Router for EventRouter {
    fn on_create_peer(&self, peer_id: &str, token: &str) -> anyhow::Result<()> {
        let event = RouterEvent::PeerCreated {
            peer_id: peer_id.to_string(),
            token: token.to_string(),
        };
        match self.tx.try_send(event) {
            Ok(()) => {
                debug!(peer_id, "peer created event queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                Err(BridgeError::Router("router event queue is full".into()).into())
            }
            Err(TrySendError::Closed(_)) => {
                Err(BridgeError::Router("router event queue is closed".into()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::BridgeErrorKind;

    fn config(event_buffer: usize) -> RouterConfig {
        RouterConfig { event_buffer }
    }

    #[tokio::test]
    async fn queues_peer_created() {
        let (router, mut rx) = EventRouter::new(&config(4));
        router.on_create_peer("peer-1", "tok-A").unwrap();

        assert_eq!(
            rx.recv().await,
            Some(RouterEvent::PeerCreated {
                peer_id: "peer-1".into(),
                token: "tok-A".into(),
            })
        );
    }

    #[test]
    fn full_queue_is_router_error() {
        let (router, _rx) = EventRouter::new(&config(1));
        router.on_create_peer("peer-1", "tok-A").unwrap();
        let err = router.on_create_peer("peer-2", "tok-B").unwrap_err();
        assert_eq!(BridgeError::classify(&err), BridgeErrorKind::Router);
    }

    #[test]
    fn closed_queue_is_router_error() {
        let (router, rx) = EventRouter::new(&config(4));
        drop(rx);
        let err = router.on_create_peer("peer-1", "tok-A").unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn zero_buffer_is_clamped() {
        let (router, _rx) = EventRouter::new(&config(0));
        router.on_create_peer("peer-1", "tok-A").unwrap();
    }

    #[test]
    fn debug_redacts_token() {
        let event = RouterEvent::PeerCreated {
            peer_id: "peer-1".into(),
            token: "tok-A".into(),
        };
        let out = format!("{:?}", event);
        assert!(out.contains("peer-1"));
        assert!(!out.contains("tok-A"));
    }
}
