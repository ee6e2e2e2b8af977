//! 认证模块
//!
//! 管理用户认证状态，与路由系统解耦。
//! 路由服务通过注入的认证 / 就绪信号来检查认证状态。
//!
//! 身份（Identity）始终从凭证包的 access token 重新解码得出，
//! 从不单独持久化；解码失败静默降级为 "无身份"。

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use leptos::prelude::*;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, DEFAULT_API_URL, MarketApi};
use crate::token::TokenStore;
use crate::web::LocalStorage;

/// 后端 URL 覆盖值的持久化键（方便下次自动填充）
pub(crate) const STORAGE_URL_KEY: &str = "market_pulse_api_url";

/// 从 access token 载荷解码出的用户声明
///
/// 字段全部可选：后端的 JWT 载荷不保证带用户名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserClaims {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl UserClaims {
    /// 展示用名称，按可用性降级
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.username {
            return name.clone();
        }
        match self.user_id {
            Some(id) => format!("user #{id}"),
            None => "trader".to_string(),
        }
    }
}

/// 解码 JWT 载荷段（不校验签名）
///
/// 客户端只取展示用声明，有效性由后端在每次请求时裁决；
/// 任何解码失败都返回 `None`，绝不让应用崩溃。
pub fn decode_claims(access: &str) -> Option<UserClaims> {
    let payload = access.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    /// 当前身份（仅在凭证可解码时存在）
    pub user: Option<UserClaims>,
    /// 是否已认证
    pub is_authenticated: bool,
    /// 是否仍在解析存储中的会话
    pub is_loading: bool,
    /// 后端 URL（默认值可被用户覆盖）
    pub api_url: String,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            // 初始化完成前依赖方（路由守卫）不得渲染
            is_loading: true,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// 认证上下文
///
/// 包含读写信号，通过 Context 在组件间共享。
/// 在 App 根部显式构造一次，而不是模块级单例。
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// 认证状态（只读）
    pub state: ReadSignal<AuthState>,
    /// 设置认证状态（写入）
    pub set_state: WriteSignal<AuthState>,
}

impl AuthContext {
    /// 创建新的认证上下文
    pub fn new() -> Self {
        let (state, set_state) = signal(AuthState::default());
        Self { state, set_state }
    }

    /// 获取认证状态信号（用于路由服务注入）
    pub fn is_authenticated_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_authenticated)
    }

    /// 获取就绪信号（初始化完成后为 true）
    pub fn is_ready_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || !state.get().is_loading)
    }

    /// 构造指向当前后端的 API 客户端
    pub fn api(&self) -> MarketApi {
        MarketApi::new(self.state.get_untracked().api_url)
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 初始化认证状态
///
/// 从凭证存储恢复会话：凭证存在且可解码则直接进入已认证态。
/// 解码失败等同于未登录。只有这一步完成后才置就绪标志。
pub fn init_auth(ctx: &AuthContext) {
    let user = TokenStore::browser()
        .get()
        .and_then(|tokens| decode_claims(&tokens.access));

    ctx.set_state.update(|state| {
        state.is_authenticated = user.is_some();
        state.user = user;
        // 加载上次使用的后端 URL 方便输入
        if let Some(url) = LocalStorage::get(STORAGE_URL_KEY) {
            state.api_url = url;
        }
        state.is_loading = false;
    });
}

/// 登录并保存凭证
///
/// # Arguments
/// * `ctx` - 认证上下文
/// * `username` / `password` - 登录表单字段
/// * `remember` - true 写入持久存储，false 只保留到会话结束
///
/// 失败时不改动任何已存储状态，错误原样交给调用方展示。
pub async fn login(
    ctx: &AuthContext,
    username: &str,
    password: &str,
    remember: bool,
) -> Result<(), ApiError> {
    let api = ctx.api();
    let tokens = api.obtain_token(username, password).await?;

    // 无法建立身份的凭证不落盘
    let Some(user) = decode_claims(&tokens.access) else {
        return Err(ApiError::Malformed(
            "access credential is not decodable".to_string(),
        ));
    };

    TokenStore::browser().set(&tokens, remember);

    ctx.set_state.update(|state| {
        state.user = Some(user);
        state.is_authenticated = true;
    });
    Ok(())
}

/// 注销并清除状态
///
/// 幂等：重复调用是无操作。
/// 导航由路由服务的认证状态监听自动处理。
pub fn logout(ctx: &AuthContext) {
    TokenStore::browser().clear();
    ctx.set_state.update(|state| {
        state.user = None;
        state.is_authenticated = false;
        // 保留 api_url 方便下次登录
    });
}

/// 注册新账号
///
/// 成功也不建立会话，调用方自行导航到登录页；
/// 后端的字段校验错误原样向上传递。
pub async fn register(
    ctx: &AuthContext,
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ApiError> {
    ctx.api()
        .register(username, email, password, confirm_password)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge_token(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{header}.{body}.forged-signature")
    }

    #[test]
    fn claims_decode_from_a_jwt_payload() {
        let token = forge_token(&serde_json::json!({
            "token_type": "access",
            "user_id": 7,
            "username": "asha",
            "exp": 1_900_000_000u32,
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.user_id, Some(7));
        assert_eq!(claims.username.as_deref(), Some("asha"));
        assert_eq!(claims.display_name(), "asha");
    }

    #[test]
    fn display_name_degrades_gracefully() {
        let claims = decode_claims(&forge_token(&serde_json::json!({"user_id": 3}))).unwrap();
        assert_eq!(claims.display_name(), "user #3");

        let claims = decode_claims(&forge_token(&serde_json::json!({}))).unwrap();
        assert_eq!(claims.display_name(), "trader");
    }

    #[test]
    fn undecodable_tokens_yield_no_identity() {
        assert!(decode_claims("not-a-jwt").is_none());
        assert!(decode_claims("a.$$$.c").is_none());
        // 载荷不是 JSON
        let bogus = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert!(decode_claims(&bogus).is_none());
    }
}
