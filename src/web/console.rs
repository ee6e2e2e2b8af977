//! 控制台与对话框封装模块
//!
//! 浏览器环境下走 `web_sys::console` / `window.alert`；
//! 非 wasm 目标（本地单元测试）退化到标准错误输出，
//! 避免触发 wasm-bindgen 的外部函数。

/// 普通日志
pub fn log(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(msg));

    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{msg}");
}

/// 警告日志（静默降级的失败都从这里出去）
pub fn warn(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(msg));

    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("warning: {msg}");
}

/// 阻塞式用户可见提示
///
/// 仅用于写操作失败（添加 / 删除 / 分析），读刷新失败不打扰用户。
pub fn alert(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(msg);
    }

    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("alert: {msg}");
}
