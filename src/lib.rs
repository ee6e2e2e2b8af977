//! Market Pulse 前端应用
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `web::route`: 路由定义（领域模型，含守卫决策）
//! - `web::router`: 路由服务（核心引擎）
//! - `token`: 凭证存储（持久 / 会话两级）
//! - `auth`: 认证状态管理
//! - `api`: 后端 REST 客户端
//! - `components`: UI 组件层

mod api;
mod auth;
mod components {
    pub mod dashboard;
    mod icons;
    pub mod login;
    pub mod register;
}
mod feed;
mod models;
mod token;

use crate::auth::{AuthContext, init_auth};
use crate::components::dashboard::DashboardPage;
use crate::components::login::LoginPage;
use crate::components::register::RegisterPage;

use leptos::prelude::*;

// 原生 Web API 封装模块
// 此模块提供对浏览器原生 API 的轻量级封装，替代 gloo-* 系列 crate，
// 以减小 WASM 二进制体积。
pub(crate) mod web {
    pub mod console;
    pub mod route;
    pub mod router;
    mod storage;

    pub use storage::{LocalStorage, SessionStorage};
}

use web::route::AppRoute;
use web::router::{Router, RouterOutlet};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件。
fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::Register => view! { <RegisterPage /> }.into_any(),
        AppRoute::Dashboard => view! { <DashboardPage /> }.into_any(),
        AppRoute::NotFound => view! {
            <div class="flex items-center justify-center min-h-screen bg-slate-900">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-red-400">"404"</h1>
                    <p class="text-xl mt-4 text-slate-400">"Page not found"</p>
                </div>
            </div>
        }
        .into_any(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 创建认证上下文
    let auth_ctx = AuthContext::new();
    provide_context(auth_ctx);

    // 2. 初始化认证状态（从凭证存储恢复会话）
    init_auth(&auth_ctx);

    // 3. 获取认证信号，用于注入路由服务（解耦！）
    let is_authenticated = auth_ctx.is_authenticated_signal();
    let is_ready = auth_ctx.is_ready_signal();

    view! {
        // 4. 路由器组件：注入认证信号实现守卫
        <Router is_authenticated=is_authenticated is_ready=is_ready>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
