//! 跨边界字符串：插件分配、所有权随回调移交给桥接层的 C 字符串。
//!
//! 插件在触发回调时把 `*mut c_char` 的所有权交给宿主，宿主必须且只能
//! 通过插件自己的释放函数归还一次。`PluginString` 把这个义务绑定到
//! `Drop` 上：无论处理函数正常返回、提前返回还是 panic 展开，缓冲区都会
//! 被归还，且归还之后不可能再被读取。

use std::borrow::Cow;
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::sync::Arc;

use crate::app::plugin::PluginRuntime;

/// 插件分配的 C 字符串的所有权包装
pub struct PluginString {
    ptr: *mut c_char,
    runtime: Arc<dyn PluginRuntime>,
}

// 缓冲区是普通堆内存，归还时只需调用插件的释放函数，可在线程间移动
unsafe impl Send for PluginString {}

impl PluginString {
    /// 接管插件移交过来的字符串
    ///
    /// # Safety
    /// `ptr` 必须为空，或是由 `runtime` 分配、以 NUL 结尾且尚未释放的字符串；
    /// 调用之后调用方不得再访问或释放该指针。
    pub unsafe fn from_raw(ptr: *mut c_char, runtime: Arc<dyn PluginRuntime>) -> Self {
        Self { ptr, runtime }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.ptr.is_null() {
            return None;
        }
        // SAFETY: from_raw 的约定保证非空指针在 self 存活期间有效
        Some(unsafe { CStr::from_ptr(self.ptr) })
    }

    /// 以 UTF-8 读取内容，非法字节替换为 U+FFFD；空指针读作空串
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self.as_c_str() {
            Some(s) => s.to_string_lossy(),
            None => Cow::Borrowed(""),
        }
    }

    /// 字节长度（不含结尾 NUL）
    pub fn len(&self) -> usize {
        self.as_c_str().map(|s| s.to_bytes().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PluginString {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: 指针来自 runtime，且所有权只在这里归还一次
            unsafe { self.runtime.release_string(self.ptr) };
        }
    }
}

// 缓冲区可能是会话 token，只输出长度
impl fmt::Debug for PluginString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginString")
            .field("len", &self.len())
            .field("value", &"<redacted>")
            .finish()
    }
}
