//! 新闻流派生模块
//!
//! 对新闻缓存做纯计算：按股票分组、剥离摘要里的标记、
//! 渲染短日期。全部与 DOM 无关，方便本地单元测试。

use crate::models::NewsItem;

/// 一只股票的新闻分组
#[derive(Debug, Clone, PartialEq)]
pub struct NewsGroup {
    pub stock: String,
    pub items: Vec<NewsItem>,
}

/// 按股票分组新闻
///
/// 分组按股票在原列表中的首次出现顺序排列，
/// 组内保持原列表的相对顺序。
pub fn group_news(items: &[NewsItem]) -> Vec<NewsGroup> {
    let mut groups: Vec<NewsGroup> = Vec::new();

    for item in items {
        match groups.iter_mut().find(|g| g.stock == item.stock) {
            Some(group) => group.items.push(item.clone()),
            None => groups.push(NewsGroup {
                stock: item.stock.clone(),
                items: vec![item.clone()],
            }),
        }
    }

    groups
}

/// 剥离摘要中的标记（`<...>` 片段）
///
/// RSS 摘要常带内联 HTML；展示时只保留文本。
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

/// 把 RFC 2822 风格的发布时间渲染为 "Mon D" 短格式
///
/// 例如 `"Tue, 01 Jul 2025 10:00:00 GMT"` -> `"Jul 1"`。
/// 解析不了就原样返回，展示层不因脏数据出错。
pub fn short_date(published: &str) -> String {
    let mut tokens = published.split_whitespace();
    let first = tokens.next();
    let second = tokens.next();
    let third = tokens.next();

    // 带星期前缀: ["Tue,", "01", "Jul", ...]；不带: ["01", "Jul", ...]
    let (day_token, month_token) = match (first, second, third) {
        (Some(weekday), Some(day), Some(month)) if weekday.ends_with(',') => (day, month),
        (Some(day), Some(month), _) => (day, month),
        _ => return published.to_string(),
    };

    let Ok(day) = day_token.parse::<u32>() else {
        return published.to_string();
    };
    if month_token.len() < 3 || !month_token.chars().all(|c| c.is_ascii_alphabetic()) {
        return published.to_string();
    }

    format!("{} {}", &month_token[..3], day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(stock: &str, title: &str) -> NewsItem {
        NewsItem {
            stock: stock.to_string(),
            source: "Google News".to_string(),
            title: title.to_string(),
            summary: String::new(),
            link: "https://example.com".to_string(),
            published: "Tue, 01 Jul 2025 10:00:00 GMT".to_string(),
        }
    }

    #[test]
    fn grouping_preserves_first_seen_order_and_item_order() {
        let items = vec![
            item("TCS", "a"),
            item("INFY", "b"),
            item("TCS", "c"),
            item("INFY", "d"),
            item("TCS", "e"),
        ];

        let groups = group_news(&items);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].stock, "TCS");
        assert_eq!(groups[1].stock, "INFY");

        let tcs_titles: Vec<_> = groups[0].items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(tcs_titles, ["a", "c", "e"]);
        let infy_titles: Vec<_> = groups[1].items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(infy_titles, ["b", "d"]);
    }

    #[test]
    fn grouping_yields_one_group_per_distinct_ticker() {
        let items = vec![item("TCS", "a"), item("WIPRO", "b"), item("INFY", "c")];
        let groups = group_news(&items);
        assert_eq!(
            groups.iter().map(|g| g.stock.as_str()).collect::<Vec<_>>(),
            ["TCS", "WIPRO", "INFY"]
        );
    }

    #[test]
    fn grouping_an_empty_cache_is_empty() {
        assert!(group_news(&[]).is_empty());
    }

    #[test]
    fn markup_is_stripped_from_summaries() {
        assert_eq!(
            strip_markup(r#"<a href="https://x">TCS surges</a> on <b>strong</b> results"#),
            "TCS surges on strong results"
        );
        assert_eq!(strip_markup("no markup here"), "no markup here");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn short_dates_render_month_and_day() {
        assert_eq!(short_date("Tue, 01 Jul 2025 10:00:00 GMT"), "Jul 1");
        assert_eq!(short_date("28 February 2025"), "Feb 28");
        // 解析不了就原样返回
        assert_eq!(short_date("yesterday"), "yesterday");
        assert_eq!(short_date(""), "");
    }
}
