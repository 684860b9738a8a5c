//! 标题 / 正文拆分 - 业务能力层
//!
//! 纯函数：第一个 `<h1>` 的文本作为标题，并从文档中移除；
//! 剩余 `<body>` 的内容作为正文。没有 `<h1>` 时标题使用占位文本，
//! 正文原样使用输入。

use scraper::{Html, Selector};
use tracing::warn;

/// 找不到标题时使用的占位文本
pub const UNTITLED_PLACEHOLDER: &str = "제목 없음";

/// 拆分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument {
    pub title: String,
    pub body_html: String,
}

/// 把原始 HTML 拆分为标题和正文
pub fn split_title_and_body(raw_html: &str) -> SplitDocument {
    let (Ok(heading_selector), Ok(body_selector)) = (Selector::parse("h1"), Selector::parse("body"))
    else {
        return fallback(raw_html);
    };

    let mut document = Html::parse_document(raw_html);

    let Some((heading_id, title)) = document
        .select(&heading_selector)
        .next()
        .map(|h1| (h1.id(), h1.text().collect::<String>().trim().to_string()))
    else {
        warn!("未找到 h1 标签，整个 HTML 将作为正文");
        return fallback(raw_html);
    };

    if let Some(mut node) = document.tree.get_mut(heading_id) {
        node.detach();
    }

    let body_html = document
        .select(&body_selector)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_default()
        .trim()
        .to_string();

    SplitDocument {
        title: if title.is_empty() {
            UNTITLED_PLACEHOLDER.to_string()
        } else {
            title
        },
        body_html,
    }
}

fn fallback(raw_html: &str) -> SplitDocument {
    SplitDocument {
        title: UNTITLED_PLACEHOLDER.to_string(),
        body_html: raw_html.to_string(),
    }
}
