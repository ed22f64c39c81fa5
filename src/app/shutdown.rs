//! 进程级关闭信号。
//!
//! Peer 被删除是整个应用的终止条件。桥接层不直接结束进程，而是触发
//! 构造时传入的信号，由宿主等待该信号后有序退出。
//!
//! 信号保存在独立于处理器注册表的槽位中：注册表解绑、绑定失败或尚未
//! 绑定时，Peer Deleted 依然能触发关闭。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发关闭；只有第一次调用真正发起关闭流程并返回 true
    pub fn trigger(&self, reason: &str) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            debug!(reason, "shutdown already requested");
            return false;
        }
        info!(reason, "shutdown requested");
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// 等待关闭信号
    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    /// 供其他任务 select 的取消令牌
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// 关闭信号槽位
///
/// 桥接绑定成功时安装宿主的信号，之后只会被下一次成功绑定替换。
/// 从未安装时触发会落到槽位自建的默认信号上。
pub struct ShutdownSlot {
    current: RwLock<Option<ShutdownSignal>>,
}

static PROCESS: ShutdownSlot = ShutdownSlot::new();

/// Peer Deleted 入口使用的进程级槽位
pub fn process() -> &'static ShutdownSlot {
    &PROCESS
}

impl ShutdownSlot {
    pub const fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// 安装信号，返回被替换的旧信号
    pub fn install(&self, signal: ShutdownSignal) -> Option<ShutdownSignal> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(signal)
    }

    /// 当前信号；尚未安装时创建并保存一个默认信号
    pub fn signal(&self) -> ShutdownSignal {
        if let Some(signal) = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return signal.clone();
        }
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(ShutdownSignal::new)
            .clone()
    }

    pub fn trigger(&self, reason: &str) -> bool {
        self.signal().trigger(reason)
    }
}

impl Default for ShutdownSlot {
    fn default() -> Self {
        Self::new()
    }
}
