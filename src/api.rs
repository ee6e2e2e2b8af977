//! 后端 REST 客户端
//!
//! 无状态工厂：每次调用现场重读凭证存储并构造 Bearer 头。
//! 凭证缺失时头仍然带上（空 token），由服务端以 401 拒绝，
//! 客户端不预判过期。

use gloo_net::http::Request;
use std::collections::HashMap;
use std::fmt;

use crate::models::{
    AddStockRequest, AddStockResponse, LoginRequest, NewsItem, NewsResponse, Prediction, Price,
    PricesResponse, RegisterRequest, Stock, StocksResponse,
};
use crate::token::{AuthTokens, TokenStore};

/// 默认后端地址，可在运行时覆盖
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

// =========================================================
// 错误分类
// =========================================================

/// API 调用错误
///
/// 三类错误走不同的展示策略：
/// 读操作三类都静默降级，写操作向用户弹出提示。
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 传输层失败（连不上、跨域被拦等）
    Network(String),
    /// 后端返回非 2xx（携带提取出的用户可读信息）
    Status(u16, String),
    /// 响应形状不符（例如隧道代理的 HTML 插页）
    Malformed(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Status(code, msg) => write!(f, "HTTP {code}: {msg}"),
            ApiError::Malformed(msg) => write!(f, "unusable response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

fn network(e: gloo_net::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

fn malformed(e: gloo_net::Error) -> ApiError {
    ApiError::Malformed(e.to_string())
}

/// 从后端校验错误体中提取第一条用户可读信息
///
/// 注册接口对字段错误返回 `{"username": ["taken"], ...}` 形状；
/// 其它接口用 `{"detail": "..."}` 或 `{"error": "..."}`。
pub(crate) fn validation_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let obj = value.as_object()?;

    for key in [
        "username",
        "email",
        "password",
        "confirm_password",
        "detail",
        "error",
    ] {
        match obj.get(key) {
            Some(serde_json::Value::String(msg)) => return Some(msg.clone()),
            Some(serde_json::Value::Array(list)) => {
                if let Some(msg) = list.iter().find_map(|v| v.as_str()) {
                    return Some(msg.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// 把自选股列表拼成 `stocks=` 查询参数值
pub fn join_tickers(stocks: &[Stock]) -> String {
    stocks
        .iter()
        .map(|s| s.ticker.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

// =========================================================
// 客户端
// =========================================================

#[derive(Clone, Debug, PartialEq)]
pub struct MarketApi {
    pub base_url: String,
}

impl MarketApi {
    pub fn new(base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { base_url }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    // 认证头：每次调用重读凭证存储
    fn bearer() -> String {
        let access = TokenStore::browser()
            .get()
            .map(|t| t.access)
            .unwrap_or_default();
        format!("Bearer {access}")
    }

    /// 换取凭证包（唯一不带认证头的调用之一）
    pub async fn obtain_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthTokens, ApiError> {
        let res = Request::post(&self.url("/api/token/"))
            .header("Content-Type", "application/json")
            .json(&LoginRequest { username, password })
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                "credentials were rejected".to_string(),
            ));
        }

        res.json::<AuthTokens>().await.map_err(malformed)
    }

    /// 注册账号；不建立会话
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), ApiError> {
        let res = Request::post(&self.url("/api/register/"))
            .header("Content-Type", "application/json")
            .json(&RegisterRequest {
                username,
                email,
                password,
                confirm_password,
            })
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            let status = res.status();
            // 尽量把后端的字段校验错误原样带给用户
            let body = res.text().await.unwrap_or_default();
            let message = validation_message(&body)
                .unwrap_or_else(|| "Registration failed".to_string());
            return Err(ApiError::Status(status, message));
        }

        Ok(())
    }

    /// 获取自选股列表
    pub async fn stocks(&self) -> Result<Vec<Stock>, ApiError> {
        let res = Request::get(&self.url("/api/stocks/"))
            .header("Authorization", &Self::bearer())
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                "watchlist fetch failed".to_string(),
            ));
        }

        let body: StocksResponse = res.json().await.map_err(malformed)?;
        Ok(body.stocks)
    }

    /// 添加自选股
    pub async fn add_stock(&self, ticker: &str) -> Result<Stock, ApiError> {
        let res = Request::post(&self.url("/api/stocks/"))
            .header("Authorization", &Self::bearer())
            .header("Content-Type", "application/json")
            .json(&AddStockRequest { ticker })
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                format!("could not add {ticker}"),
            ));
        }

        let body: AddStockResponse = res.json().await.map_err(malformed)?;
        Ok(body.stock)
    }

    /// 按条目 id 删除自选股
    pub async fn remove_stock(&self, id: i64) -> Result<(), ApiError> {
        let res = Request::delete(&self.url(&format!("/api/stocks/{id}/")))
            .header("Authorization", &Self::bearer())
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                format!("could not remove entry {id}"),
            ));
        }

        Ok(())
    }

    /// 获取一组股票的聚合新闻
    pub async fn news(&self, tickers: &str) -> Result<Vec<NewsItem>, ApiError> {
        let res = Request::get(&self.url(&format!("/api/news/?stocks={tickers}")))
            .header("Authorization", &Self::bearer())
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                "news fetch failed".to_string(),
            ));
        }

        let body: NewsResponse = res.json().await.map_err(malformed)?;
        Ok(body.news)
    }

    /// 获取一组股票的实时价格
    pub async fn prices(&self, tickers: &str) -> Result<HashMap<String, Price>, ApiError> {
        let res = Request::get(&self.url(&format!("/api/prices/?stocks={tickers}")))
            .header("Authorization", &Self::bearer())
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                "price fetch failed".to_string(),
            ));
        }

        let body: PricesResponse = res.json().await.map_err(malformed)?;
        Ok(body.prices)
    }

    /// 请求单只股票的 AI 预测
    pub async fn predict(&self, ticker: &str) -> Result<Prediction, ApiError> {
        let res = Request::get(&self.url(&format!("/api/predict/?stock={ticker}")))
            .header("Authorization", &Self::bearer())
            .send()
            .await
            .map_err(network)?;

        if !res.ok() {
            return Err(ApiError::Status(
                res.status(),
                format!("prediction for {ticker} failed"),
            ));
        }

        res.json::<Prediction>().await.map_err(malformed)
    }
}

impl Default for MarketApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(id: i64, ticker: &str) -> Stock {
        Stock {
            id,
            ticker: ticker.to_string(),
        }
    }

    #[test]
    fn tickers_join_into_a_query_value() {
        assert_eq!(join_tickers(&[stock(1, "TCS")]), "TCS");
        assert_eq!(
            join_tickers(&[stock(1, "TCS"), stock(2, "INFY")]),
            "TCS,INFY"
        );
        assert_eq!(join_tickers(&[]), "");
    }

    #[test]
    fn base_url_is_normalized() {
        let api = MarketApi::new("http://localhost:8000/".to_string());
        assert_eq!(api.url("/api/stocks/"), "http://localhost:8000/api/stocks/");
        assert_eq!(api.url("api/stocks/"), "http://localhost:8000/api/stocks/");
    }

    #[test]
    fn validation_messages_surface_field_errors_verbatim() {
        assert_eq!(
            validation_message(r#"{"username":["A user with that username already exists."]}"#),
            Some("A user with that username already exists.".to_string())
        );
        assert_eq!(
            validation_message(r#"{"password":["too short","too common"]}"#),
            Some("too short".to_string())
        );
        assert_eq!(
            validation_message(r#"{"detail":"No active account found"}"#),
            Some("No active account found".to_string())
        );
    }

    #[test]
    fn validation_messages_tolerate_non_json_bodies() {
        assert_eq!(validation_message("<html>bad gateway</html>"), None);
        assert_eq!(validation_message(""), None);
        assert_eq!(validation_message(r#"{"unrelated": 1}"#), None);
    }
}
