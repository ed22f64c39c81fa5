//! 全局处理器注册表
//!
//! 插件回调没有 user-data 参数，C 入口只能通过进程级状态找到当前绑定
//! 的桥接实例。每种回调一个槽位，槽位整体绑定、整体解绑；已绑定时
//! 再次绑定会直接报错，而不是静默覆盖。Peer Deleted 不经过这里，
//! 见 `shutdown::process`。
//!
//! 分发时先在锁内克隆出处理器，释放锁之后再调用，处理器可以安全地
//! 重入注册表。

use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error};

use super::ffi::{LoadResult, PluginLoadResult};
use super::plugin::PluginRuntime;
use crate::common::{BridgeError, PluginString};

pub type PeerCreatedHandler = Arc<dyn Fn(PluginString, PluginString) + Send + Sync>;
pub type DataRequestedHandler = Arc<dyn Fn(PluginString) -> LoadResult + Send + Sync>;
pub type DataClosedHandler = Arc<dyn Fn(PluginString) + Send + Sync>;

/// 一次绑定写入的全部槽位
#[derive(Clone)]
pub struct BoundHandlers {
    /// 用于归还插件移交的字符串
    pub plugin: Arc<dyn PluginRuntime>,
    pub peer_created: PeerCreatedHandler,
    pub data_requested: DataRequestedHandler,
    /// 为 None 时关闭事件只归还缓冲区，不转发
    pub data_closed: Option<DataClosedHandler>,
}

pub struct HandlerRegistry {
    slots: RwLock<Option<BoundHandlers>>,
}

static GLOBAL: HandlerRegistry = HandlerRegistry::new();

/// C 入口使用的进程级注册表
pub fn global() -> &'static HandlerRegistry {
    &GLOBAL
}

impl HandlerRegistry {
    pub const fn new() -> Self {
        Self {
            slots: RwLock::new(None),
        }
    }

    /// 写入全部槽位；已有绑定时返回 `AlreadyBound` 且保留原绑定
    pub fn bind(&self, handlers: BoundHandlers) -> Result<(), BridgeError> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if slots.is_some() {
            return Err(BridgeError::AlreadyBound);
        }
        *slots = Some(handlers);
        debug!("handler registry bound");
        Ok(())
    }

    /// 清空全部槽位，返回之前是否有绑定
    pub fn unbind(&self) -> bool {
        let previous = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("handler registry unbound");
        }
        previous.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn snapshot(&self) -> Option<BoundHandlers> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// # Safety
    /// 同 `PluginString::from_raw`，两个指针的所有权移交给注册表
    pub unsafe fn dispatch_peer_created(&self, peer_id: *mut c_char, token: *mut c_char) {
        let Some(handlers) = self.snapshot() else {
            // 没有绑定就不知道插件的释放函数，只能放弃这两个缓冲区
            error!(error = %BridgeError::NotBound, "peer created callback fired before bridge was bound");
            return;
        };
        let peer_id = PluginString::from_raw(peer_id, handlers.plugin.clone());
        let token = PluginString::from_raw(token, handlers.plugin.clone());
        let handler = handlers.peer_created;

        if catch_unwind(AssertUnwindSafe(move || handler(peer_id, token))).is_err() {
            error!("peer created handler panicked");
        }
    }

    /// # Safety
    /// 同 `PluginString::from_raw`，`message` 的所有权移交给注册表
    pub unsafe fn dispatch_data_requested(&self, message: *mut c_char) -> PluginLoadResult {
        let Some(handlers) = self.snapshot() else {
            error!(error = %BridgeError::NotBound, "data connection requested before bridge was bound");
            return LoadResult::failed(BridgeError::NotBound.to_string()).into_ffi();
        };
        let message = PluginString::from_raw(message, handlers.plugin.clone());
        let handler = handlers.data_requested;

        catch_unwind(AssertUnwindSafe(move || handler(message)))
            .unwrap_or_else(|_| {
                error!("data connection handler panicked");
                LoadResult::failed("data connection handler panicked")
            })
            .into_ffi()
    }

    /// # Safety
    /// 同 `PluginString::from_raw`，`data_connection_id` 的所有权移交给注册表
    pub unsafe fn dispatch_data_closed(&self, data_connection_id: *mut c_char) {
        let Some(handlers) = self.snapshot() else {
            error!(error = %BridgeError::NotBound, "data connection closed before bridge was bound");
            return;
        };
        let id = PluginString::from_raw(data_connection_id, handlers.plugin.clone());

        match handlers.data_closed {
            Some(handler) => {
                if catch_unwind(AssertUnwindSafe(move || handler(id))).is_err() {
                    error!("data connection close handler panicked");
                }
            }
            None => {
                debug!(
                    data_connection_id = %id.to_string_lossy(),
                    "data connection close forwarding disabled, releasing id"
                );
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
