//! 路由定义模块 - 领域模型
//!
//! 这是纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。
//! 定义了应用的所有路由及其守卫决策。

use std::fmt::Display;

/// 应用路由枚举
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 登录页面 (默认路由)
    #[default]
    Login,
    /// 注册页面
    Register,
    /// 仪表盘 (需要认证)
    Dashboard,
    /// 页面未找到
    NotFound,
}

/// 守卫决策结果
///
/// 路由守卫是一个三态机：会话未就绪时挂起（不渲染任何内容，
/// 避免有效会话恢复前闪现登录页），就绪后要么放行要么重定向。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// 会话尚未解析完成，什么都不渲染
    Pending,
    /// 放行目标路由
    Allow,
    /// 重定向到指定路由（原始目标被丢弃，不保留 return-to-url）
    RedirectTo(AppRoute),
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举
    pub fn from_path(path: &str) -> Self {
        match path {
            "/" | "/dashboard" => Self::Dashboard,
            "/login" => Self::Login,
            "/register" => Self::Register,
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/",
            Self::NotFound => "/404",
        }
    }

    /// **核心守卫逻辑：定义该路由是否需要认证**
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Dashboard)
    }

    /// 定义已认证用户是否应该离开此路由（如登录 / 注册页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// 获取认证失败时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }

    /// 获取认证成功时的重定向目标（从登录 / 注册页）
    pub fn auth_success_redirect() -> Self {
        Self::Dashboard
    }

    /// 对目标路由做一次完整的守卫决策
    pub fn guard(&self, is_ready: bool, is_authenticated: bool) -> GuardOutcome {
        if !is_ready {
            return GuardOutcome::Pending;
        }
        if self.requires_auth() && !is_authenticated {
            return GuardOutcome::RedirectTo(Self::auth_failure_redirect());
        }
        if self.should_redirect_when_authenticated() && is_authenticated {
            return GuardOutcome::RedirectTo(Self::auth_success_redirect());
        }
        GuardOutcome::Allow
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        assert_eq!(AppRoute::from_path("/"), AppRoute::Dashboard);
        assert_eq!(AppRoute::from_path("/dashboard"), AppRoute::Dashboard);
        assert_eq!(AppRoute::from_path("/login"), AppRoute::Login);
        assert_eq!(AppRoute::from_path("/register"), AppRoute::Register);
        assert_eq!(AppRoute::from_path("/nope"), AppRoute::NotFound);
        assert_eq!(AppRoute::Dashboard.to_path(), "/");
    }

    #[test]
    fn guard_is_pending_until_session_resolves() {
        // 未就绪时不做任何决策，无论认证与否
        assert_eq!(
            AppRoute::Dashboard.guard(false, false),
            GuardOutcome::Pending
        );
        assert_eq!(AppRoute::Login.guard(false, true), GuardOutcome::Pending);
    }

    #[test]
    fn guard_redirects_unauthenticated_to_login() {
        assert_eq!(
            AppRoute::Dashboard.guard(true, false),
            GuardOutcome::RedirectTo(AppRoute::Login)
        );
        // 登出后重新初始化会话的效果：同一条决策路径
        assert_eq!(AppRoute::Login.guard(true, false), GuardOutcome::Allow);
        assert_eq!(AppRoute::Register.guard(true, false), GuardOutcome::Allow);
    }

    #[test]
    fn guard_sends_authenticated_users_to_dashboard() {
        assert_eq!(AppRoute::Dashboard.guard(true, true), GuardOutcome::Allow);
        assert_eq!(
            AppRoute::Login.guard(true, true),
            GuardOutcome::RedirectTo(AppRoute::Dashboard)
        );
        assert_eq!(
            AppRoute::Register.guard(true, true),
            GuardOutcome::RedirectTo(AppRoute::Dashboard)
        );
    }
}
