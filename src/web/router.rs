//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API，实现高内聚：
//! 所有对 window.history 的操作都集中在此模块。
//! 守卫决策本身是纯函数（见 `route::AppRoute::guard`），
//! 这里负责把决策落到 History 与信号上。

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use super::console;
use super::route::{AppRoute, GuardOutcome};

/// 获取当前浏览器路径
fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

/// 推送 History 状态（内部工具函数）
fn push_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 替换 History 状态（内部工具函数，用于重定向）
fn replace_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 路由器服务
///
/// 封装所有路由操作，通过 Signal 驱动界面更新。
/// 通过注入认证 / 就绪信号实现与认证系统的解耦。
#[derive(Clone, Copy)]
pub struct RouterService {
    /// 当前路由（只读信号）
    current_route: ReadSignal<AppRoute>,
    /// 设置当前路由（写入信号）
    set_route: WriteSignal<AppRoute>,
    /// 认证状态检查（注入的信号，实现解耦）
    is_authenticated: Signal<bool>,
    /// 会话上下文是否完成初始化
    is_ready: Signal<bool>,
}

impl RouterService {
    /// 创建新的路由服务
    ///
    /// # Arguments
    /// * `is_authenticated` - 认证状态信号，由外部注入实现解耦
    /// * `is_ready` - 会话就绪信号；未就绪前出口不渲染任何内容
    fn new(is_authenticated: Signal<bool>, is_ready: Signal<bool>) -> Self {
        // 初始化当前路由（从 URL 解析）
        let path = current_path();
        let initial_route = AppRoute::from_path(&path);
        let (current_route, set_route) = signal(initial_route);

        Self {
            current_route,
            set_route,
            is_authenticated,
            is_ready,
        }
    }

    /// 获取当前路由信号
    pub fn current_route(&self) -> ReadSignal<AppRoute> {
        self.current_route
    }

    /// 获取就绪信号（供出口组件判断是否渲染）
    pub fn is_ready(&self) -> Signal<bool> {
        self.is_ready
    }

    /// **核心方法：导航与守卫**
    ///
    /// 流程：请求 -> 验证(Guard) -> 处理 -> 加载
    pub fn navigate(&self, path: &str) {
        let target_route = AppRoute::from_path(path);
        self.navigate_to_route(target_route, true);
    }

    /// 导航到指定路由
    ///
    /// # Arguments
    /// * `target_route` - 目标路由
    /// * `use_push` - true 使用 pushState, false 使用 replaceState
    fn navigate_to_route(&self, target_route: AppRoute, use_push: bool) {
        let outcome = target_route.guard(
            self.is_ready.get_untracked(),
            self.is_authenticated.get_untracked(),
        );

        let resolved = match outcome {
            // 未就绪：先记录目标，待就绪后由守卫 Effect 修正
            GuardOutcome::Pending | GuardOutcome::Allow => target_route,
            GuardOutcome::RedirectTo(redirect) => {
                console::log("[Router] Access decision: redirecting.");
                redirect
            }
        };

        if use_push {
            push_history_state(resolved.to_path());
        } else {
            replace_history_state(resolved.to_path());
        }
        self.set_route.set(resolved);
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let set_route = self.set_route;
        let is_authenticated = self.is_authenticated;
        let is_ready = self.is_ready;

        let closure = Closure::<dyn Fn()>::new(move || {
            let target_route = AppRoute::from_path(&current_path());

            // popstate 时也执行守卫逻辑
            match target_route.guard(is_ready.get_untracked(), is_authenticated.get_untracked()) {
                GuardOutcome::RedirectTo(redirect) => {
                    replace_history_state(redirect.to_path());
                    set_route.set(redirect);
                }
                _ => set_route.set(target_route),
            }
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 设置认证 / 就绪状态变化时的自动重定向
    ///
    /// 登录成功后自动进入仪表盘，登出后自动回到登录页；
    /// 页面组件无需手动导航。
    fn setup_auth_redirect(&self) {
        let current_route = self.current_route;
        let set_route = self.set_route;
        let is_authenticated = self.is_authenticated;
        let is_ready = self.is_ready;

        Effect::new(move |_| {
            let ready = is_ready.get();
            let is_auth = is_authenticated.get();
            let route = current_route.get_untracked();

            if let GuardOutcome::RedirectTo(redirect) = route.guard(ready, is_auth) {
                console::log(&format!(
                    "[Router] Auth state changed, redirecting to {}.",
                    redirect
                ));
                push_history_state(redirect.to_path());
                set_route.set(redirect);
            }
        });
    }
}

/// 提供路由服务到 Context 并初始化
fn provide_router(is_authenticated: Signal<bool>, is_ready: Signal<bool>) -> RouterService {
    let router = RouterService::new(is_authenticated, is_ready);

    // 初始化监听器
    router.init_popstate_listener();
    router.setup_auth_redirect();

    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(
    /// 认证状态信号
    is_authenticated: Signal<bool>,
    /// 会话就绪信号
    is_ready: Signal<bool>,
    /// 子组件
    children: Children,
) -> impl IntoView {
    // 提供路由服务到 Context
    provide_router(is_authenticated, is_ready);

    children()
}

/// 路由出口组件
///
/// 根据当前路由状态渲染对应的组件。
/// 会话未就绪时渲染空内容，防止闪现登录页。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let router = use_router();

    move || {
        if !router.is_ready().get() {
            return ().into_any();
        }
        matcher(router.current_route().get())
    }
}
