//! 协议数据模型
//!
//! 与后端 REST API 交换的所有请求 / 响应结构。
//! 所有响应都经过强类型反序列化：形状不符（例如隧道代理返回的
//! HTML 插页）会在反序列化层失败，而不是在各调用点做动态检查。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =========================================================
// 认证 (Authentication)
// =========================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

// =========================================================
// 自选股 (Watchlist)
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: i64,
    pub ticker: String,
}

#[derive(Debug, Deserialize)]
pub struct StocksResponse {
    pub stocks: Vec<Stock>,
}

#[derive(Debug, Serialize)]
pub struct AddStockRequest<'a> {
    pub ticker: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AddStockResponse {
    pub stock: Stock,
}

// =========================================================
// 新闻 (News)
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub stock: String,
    #[serde(default)]
    pub source: String,
    pub title: String,
    /// 可能包含 HTML 标记，展示前需剥离
    #[serde(default)]
    pub summary: String,
    pub link: String,
    /// RFC 2822 风格的发布时间字符串
    #[serde(default)]
    pub published: String,
}

#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    pub news: Vec<NewsItem>,
}

// =========================================================
// 价格 (Prices)
// =========================================================

/// 单只股票的实时价格
///
/// 后端对无法取价的代码返回 `"N/A"` 之类的字符串，
/// 其余情况为数值，因此使用 untagged 表示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Number(f64),
    Text(String),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // 整数价格不显示小数位
            Price::Number(v) if v.fract() == 0.0 => write!(f, "{}", *v as i64),
            Price::Number(v) => write!(f, "{v}"),
            Price::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PricesResponse {
    pub prices: HashMap<String, Price>,
}

// =========================================================
// AI 预测 (Prediction)
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// 预测信号的展示分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlook {
    Bullish,
    Bearish,
    Neutral,
}

impl Prediction {
    /// 将自由文本信号归类，仅用于样式选择
    pub fn outlook(&self) -> Outlook {
        match self.prediction.as_str() {
            "HIGH" => Outlook::Bullish,
            "LOW" => Outlook::Bearish,
            _ => Outlook::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_deserializes_exactly() {
        let raw = r#"{"prediction":"HIGH","target":"₹3200","reason":"strong earnings"}"#;
        let p: Prediction = serde_json::from_str(raw).unwrap();
        assert_eq!(
            p,
            Prediction {
                prediction: "HIGH".to_string(),
                target: Some("₹3200".to_string()),
                reason: "strong earnings".to_string(),
            }
        );
        assert_eq!(p.outlook(), Outlook::Bullish);
    }

    #[test]
    fn prediction_target_is_optional() {
        let p: Prediction =
            serde_json::from_str(r#"{"prediction":"LOW","reason":"weak demand"}"#).unwrap();
        assert_eq!(p.target, None);
        assert_eq!(p.outlook(), Outlook::Bearish);

        let p: Prediction =
            serde_json::from_str(r#"{"prediction":"SIDEWAYS","reason":"mixed"}"#).unwrap();
        assert_eq!(p.outlook(), Outlook::Neutral);
    }

    #[test]
    fn prices_accept_numbers_and_placeholders() {
        let raw = r#"{"prices":{"TCS":3200.5,"INFY":"N/A","RELIANCE":2900.0}}"#;
        let res: PricesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(res.prices["TCS"], Price::Number(3200.5));
        assert_eq!(res.prices["INFY"], Price::Text("N/A".to_string()));
        assert_eq!(res.prices["TCS"].to_string(), "3200.5");
        assert_eq!(res.prices["RELIANCE"].to_string(), "2900");
        assert_eq!(res.prices["INFY"].to_string(), "N/A");
    }

    #[test]
    fn interstitial_page_is_not_a_watchlist() {
        // 隧道代理的 HTML 插页不应被当作数据，也不应 panic
        let html = "<html><body>tunnel auth required</body></html>";
        assert!(serde_json::from_str::<StocksResponse>(html).is_err());

        // 形状不符的 JSON 同样在反序列化层被拒绝
        let wrong = r#"{"stocks":"oops"}"#;
        assert!(serde_json::from_str::<StocksResponse>(wrong).is_err());
    }

    #[test]
    fn news_tolerates_missing_optional_fields() {
        let raw = r#"{"news":[{"stock":"TCS","title":"t","link":"https://x"}]}"#;
        let res: NewsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(res.news[0].summary, "");
        assert_eq!(res.news[0].source, "");
    }
}
