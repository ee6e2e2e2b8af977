//! 凭证存储模块
//!
//! 管理后端签发的凭证包（access/refresh token），在两级浏览器存储
//! 之间实施统一策略：
//! - "记住我" 登录写入持久存储（浏览器重启后仍在）
//! - 普通登录写入会话存储（会话结束即消失）
//!
//! 两个存储区被当作一个逻辑资源成对读写：写入持久区必须同时清掉
//! 会话区的旧副本，否则 `get()` 的优先级规则会读到脏数据。

use serde::{Deserialize, Serialize};

use crate::web::console;
use crate::web::{LocalStorage, SessionStorage};

/// 凭证包在两级存储中共用的逻辑键
pub const TOKEN_STORAGE_KEY: &str = "market_pulse_tokens";

/// 后端登录成功返回的凭证包
///
/// `access` 之外的字段（refresh token 等）原样保留、原样序列化，
/// 客户端从不修改其内容，只整体替换或删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 单个存储区的最小接口
///
/// 浏览器下由 `LocalStorage` / `SessionStorage` 实现；
/// 测试中用内存实现替换（参见 `tests.rs`）。
pub trait StorageArea {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> bool;
    fn remove(&self, key: &str) -> bool;
}

impl StorageArea for LocalStorage {
    fn read(&self, key: &str) -> Option<String> {
        LocalStorage::get(key)
    }

    fn write(&self, key: &str, value: &str) -> bool {
        LocalStorage::set(key, value)
    }

    fn remove(&self, key: &str) -> bool {
        LocalStorage::delete(key)
    }
}

impl StorageArea for SessionStorage {
    fn read(&self, key: &str) -> Option<String> {
        SessionStorage::get(key)
    }

    fn write(&self, key: &str, value: &str) -> bool {
        SessionStorage::set(key, value)
    }

    fn remove(&self, key: &str) -> bool {
        SessionStorage::delete(key)
    }
}

/// 凭证存储
///
/// 对持久 / 会话两个存储区泛型，策略集中在这里：
/// 凭证包存在于恰好一个存储区，是 "会话是否有效" 的唯一依据。
pub struct TokenStore<D: StorageArea, E: StorageArea> {
    durable: D,
    ephemeral: E,
}

impl TokenStore<LocalStorage, SessionStorage> {
    /// 绑定浏览器的两级存储
    pub fn browser() -> Self {
        Self::new(LocalStorage, SessionStorage)
    }
}

impl<D: StorageArea, E: StorageArea> TokenStore<D, E> {
    pub fn new(durable: D, ephemeral: E) -> Self {
        Self { durable, ephemeral }
    }

    /// 读取当前凭证包
    ///
    /// 持久区优先（"记住我" 的会话在两区同时存在时胜出），
    /// 读不到或解析失败再回退到会话区。解析失败只记警告，
    /// 等同于无凭证。
    pub fn get(&self) -> Option<AuthTokens> {
        if let Some(raw) = self.durable.read(TOKEN_STORAGE_KEY) {
            match serde_json::from_str(&raw) {
                Ok(tokens) => return Some(tokens),
                Err(e) => console::warn(&format!("stored credentials unreadable: {e}")),
            }
        }

        let raw = self.ephemeral.read(TOKEN_STORAGE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                console::warn(&format!("session credentials unreadable: {e}"));
                None
            }
        }
    }

    /// 存入新的凭证包
    ///
    /// `durable = true` 写持久区并清掉会话区的旧副本；
    /// `durable = false` 只写会话区。
    pub fn set(&self, tokens: &AuthTokens, durable: bool) -> bool {
        let raw = match serde_json::to_string(tokens) {
            Ok(raw) => raw,
            Err(e) => {
                console::warn(&format!("credentials not serializable: {e}"));
                return false;
            }
        };

        if durable {
            self.ephemeral.remove(TOKEN_STORAGE_KEY);
            self.durable.write(TOKEN_STORAGE_KEY, &raw)
        } else {
            self.ephemeral.write(TOKEN_STORAGE_KEY, &raw)
        }
    }

    /// 无条件从两个存储区删除凭证包
    ///
    /// 登出必须保证两区都不残留凭证。
    pub fn clear(&self) {
        self.durable.remove(TOKEN_STORAGE_KEY);
        self.ephemeral.remove(TOKEN_STORAGE_KEY);
    }
}

#[cfg(test)]
mod tests;
