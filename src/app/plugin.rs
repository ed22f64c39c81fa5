//! 插件运行时：桥接层对原生插件库的全部依赖。
//!
//! 插件只暴露两件事给宿主：一次性注册四个回调入口，以及归还它分配的
//! 字符串。其余状态（peer、连接、线程）都由插件自己持有。

use std::os::raw::c_char;

use super::ffi::CallbackFunctions;

/// 原生插件运行时
pub trait PluginRuntime: Send + Sync {
    /// 一次性注册全部边界回调，不支持增量注册
    fn register_callbacks(&self, functions: CallbackFunctions);

    /// 归还插件分配的字符串
    ///
    /// # Safety
    /// `ptr` 必须是该插件分配、尚未归还的非空字符串指针
    unsafe fn release_string(&self, ptr: *mut c_char);
}

#[cfg(feature = "native-plugin")]
pub use native::NativePlugin;

#[cfg(feature = "native-plugin")]
mod native {
    use std::os::raw::c_char;

    use tracing::debug;

    use super::PluginRuntime;
    use crate::app::ffi::CallbackFunctions;

    // 由插件库导出，链接参数由宿主构建脚本提供（如 RUSTFLAGS="-l<plugin>"）
    extern "C" {
        fn register_callbacks(functions: CallbackFunctions);
        fn release_string(ptr: *mut c_char);
    }

    /// 链接到真实插件库的运行时
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativePlugin;

    impl PluginRuntime for NativePlugin {
        fn register_callbacks(&self, functions: CallbackFunctions) {
            debug!("registering boundary callbacks with native plugin");
            unsafe { register_callbacks(functions) }
        }

        unsafe fn release_string(&self, ptr: *mut c_char) {
            release_string(ptr)
        }
    }
}
