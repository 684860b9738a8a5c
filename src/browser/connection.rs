use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, PostingError};

/// 连接到已启动的浏览器，并选出要操作的标签页
///
/// 优先选择 URL 属于目标网站的标签页，其次是第一个标签页。
/// 浏览器需要以 `--remote-debugging-port=<port>` 启动，并已登录目标网站。
pub async fn connect_to_browser_and_page(config: &Config) -> AppResult<(Browser, Page)> {
    let port = config.browser_debug_port;
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    let mut fallback = None;
    for page in pages {
        let url = page.url().await.ok().flatten().unwrap_or_default();
        debug!("检查页面: {}", url);
        if config.is_target_site(&url) {
            info!("✓ 找到目标网站页面: {}", url);
            return Ok((browser, page));
        }
        if fallback.is_none() {
            fallback = Some(page);
        }
    }

    match fallback {
        Some(page) => {
            warn!("⚠️ 没有打开 {} 的标签页，使用第一个标签页", config.target_site);
            Ok((browser, page))
        }
        None => {
            error!("浏览器中没有任何标签页");
            Err(PostingError::NoActiveContext.into())
        }
    }
}
