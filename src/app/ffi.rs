//! FFI 层：注册给原生插件的 C ABI 回调入口。
//!
//! 插件的回调签名不携带任何上下文指针，因此这里的入口函数都是无状态的
//! 转发壳：从全局处理器注册表取出当前绑定的处理器并同步调用。
//!
//! 约定：
//! - 传入的 `*mut c_char` 均由插件分配，所有权在调用时移交给宿主，
//!   宿主通过插件的 `release_string` 归还，且只归还一次
//! - `PluginLoadResult::error_message` 只有在 `is_success == false` 时由
//!   Rust 分配，插件需通过 `peerbridge_free_string` 释放；成功时指向
//!   静态空串 `EMPTY_MESSAGE`，插件不得释放
//! - Peer Deleted 不经过处理器注册表，直接触发进程级关闭槽位
//! - 任何 Rust panic 都不会展开到 C 侧

use std::ffi::{CStr, CString};
use std::num::NonZeroU16;
use std::os::raw::c_char;

use super::{registry, shutdown};

/// 成功结果的 `error_message`，静态分配
pub const EMPTY_MESSAGE: &CStr = c"";

// ─── Helpers ────────────────────────────────────────────────────────────────

/// 将 Rust String 转为堆分配的 C 字符串指针
fn to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 回调类型
// ═══════════════════════════════════════════════════════════════════════════

pub type CreatePeerCallback = unsafe extern "C" fn(peer_id: *mut c_char, token: *mut c_char);
pub type PeerDeletedCallback = unsafe extern "C" fn();
pub type CreateDataCallback = unsafe extern "C" fn(message: *mut c_char) -> PluginLoadResult;
pub type DataConnectionCloseCallback = unsafe extern "C" fn(data_connection_id: *mut c_char);

/// 一次性交给插件的回调表
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CallbackFunctions {
    pub create_peer_callback: CreatePeerCallback,
    pub peer_deleted_callback: PeerDeletedCallback,
    pub create_data_callback: CreateDataCallback,
    pub data_connection_close_event_callback: DataConnectionCloseCallback,
}

impl CallbackFunctions {
    /// 本模块的四个边界入口
    pub fn boundary() -> Self {
        Self {
            create_peer_callback: create_peer_callback_ffi,
            peer_deleted_callback: peer_deleted_callback_ffi,
            create_data_callback: create_data_callback_ffi,
            data_connection_close_event_callback: data_connection_close_event_callback_ffi,
        }
    }
}

impl std::fmt::Debug for CallbackFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackFunctions")
            .field("create_peer_callback", &(self.create_peer_callback as usize))
            .field("peer_deleted_callback", &(self.peer_deleted_callback as usize))
            .field("create_data_callback", &(self.create_data_callback as usize))
            .field(
                "data_connection_close_event_callback",
                &(self.data_connection_close_event_callback as usize),
            )
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 数据连接加载结果
// ═══════════════════════════════════════════════════════════════════════════

/// 返回给插件的加载结果（C 布局）
#[repr(C)]
#[derive(Debug)]
pub struct PluginLoadResult {
    pub is_success: bool,
    pub port: u16,
    pub error_message: *mut c_char,
}

impl PluginLoadResult {
    /// 取回 Rust 侧表示；失败结果的 `error_message` 在这里释放
    ///
    /// # Safety
    /// 失败结果的 `error_message` 必须为空或由本库分配且尚未释放
    pub unsafe fn into_load_result(self) -> LoadResult {
        if self.is_success {
            return match NonZeroU16::new(self.port) {
                Some(port) => LoadResult::Loaded { port },
                None => LoadResult::failed("plugin load result carried port 0"),
            };
        }
        let message = if self.error_message.is_null() {
            String::new()
        } else {
            CString::from_raw(self.error_message)
                .to_string_lossy()
                .into_owned()
        };
        LoadResult::failed(message)
    }
}

/// 数据连接创建请求的同步结果
///
/// 成功时端口必须非零；失败时错误信息必须非空。两条约束都由构造保证。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    Loaded { port: NonZeroU16 },
    Failed { error_message: String },
}

impl LoadResult {
    pub const DEFAULT_ERROR: &'static str = "data connection could not be created";

    pub fn loaded(port: NonZeroU16) -> Self {
        Self::Loaded { port }
    }

    /// 失败结果；空信息会被替换为默认信息
    pub fn failed(error_message: impl Into<String>) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = Self::DEFAULT_ERROR.to_string();
        }
        Self::Failed { error_message }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Loaded { port } => Some(port.get()),
            Self::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> &str {
        match self {
            Self::Loaded { .. } => "",
            Self::Failed { error_message } => error_message,
        }
    }

    /// 转为 C 布局；失败时端口填 0，只有失败时分配 `error_message`
    pub fn into_ffi(self) -> PluginLoadResult {
        match self {
            Self::Loaded { port } => PluginLoadResult {
                is_success: true,
                port: port.get(),
                // 插件只读不写
                error_message: EMPTY_MESSAGE.as_ptr().cast_mut(),
            },
            Self::Failed { error_message } => {
                let mut ptr = to_c_string(&error_message);
                if ptr.is_null() {
                    // 信息中含 NUL
                    ptr = to_c_string(Self::DEFAULT_ERROR);
                }
                PluginLoadResult {
                    is_success: false,
                    port: 0,
                    error_message: ptr,
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 边界入口
// ═══════════════════════════════════════════════════════════════════════════

/// Peer 创建完成
///
/// # Safety
/// 两个指针须为插件分配且以 NUL 结尾的字符串，所有权移交给宿主
pub unsafe extern "C" fn create_peer_callback_ffi(peer_id: *mut c_char, token: *mut c_char) {
    registry::global().dispatch_peer_created(peer_id, token)
}

/// Peer 被删除：整个应用的终止条件，直接触发关闭，不经过 Router
/// 与处理器注册表，无论桥接是否绑定
///
/// # Safety
/// 无指针参数；仅因函数指针类型统一声明为 unsafe
pub unsafe extern "C" fn peer_deleted_callback_ffi() {
    shutdown::process().trigger("peer deleted");
}

/// 数据连接创建请求，同步返回加载结果
///
/// # Safety
/// `message` 须为插件分配且以 NUL 结尾的字符串，所有权移交给宿主
pub unsafe extern "C" fn create_data_callback_ffi(message: *mut c_char) -> PluginLoadResult {
    registry::global().dispatch_data_requested(message)
}

/// 数据连接关闭事件
///
/// # Safety
/// `data_connection_id` 须为插件分配且以 NUL 结尾的字符串，所有权移交给宿主
pub unsafe extern "C" fn data_connection_close_event_callback_ffi(data_connection_id: *mut c_char) {
    registry::global().dispatch_data_closed(data_connection_id)
}

// ═══════════════════════════════════════════════════════════════════════════
// 内存管理
// ═══════════════════════════════════════════════════════════════════════════

/// 释放由 Rust 分配的 C 字符串（失败结果的 `PluginLoadResult::error_message`）
///
/// # Safety
/// `ptr` 必须是此库分配的字符串指针，且只能释放一次；不能是 `EMPTY_MESSAGE`
#[no_mangle]
pub unsafe extern "C" fn peerbridge_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
