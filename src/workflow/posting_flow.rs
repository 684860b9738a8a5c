//! 单个文档的发布流程 - 流程层
//!
//! 核心职责：定义"发布一个文档"的完整界面操作顺序
//!
//! 流程顺序：
//! 1. 检查文档内容和当前页面
//! 2. 插入 HTML 块（原始 HTML 作为代码块）
//! 3. 拆分标题 / 正文，填写标题，把正文追加到编辑器
//! 4. 打开发布层，选择公开范围，点击发布
//! 5. 等待服务器处理，按配置跳转

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, Visibility};
use crate::error::PostingError;
use crate::infrastructure::JsExecutor;
use crate::models::Document;
use crate::services::{split_title_and_body, EditorDriver};
use crate::utils::truncate_text;

const SHORT_WAIT: Duration = Duration::from_secs(2);
const DEFAULT_WAIT: Duration = Duration::from_secs(3);
const EDITOR_FRAME_WAIT: Duration = Duration::from_secs(8);

const MORE_PLUGIN_BUTTON: &str = "button#more-plugin-btn-open";
const HTML_BLOCK_PLUGIN: &str = "div#plugin-html-block";
const CODE_BLOCK_CONTAINER: &str = ".mce-codeblock-content";
const CODE_BLOCK_TEXTAREA: &str = ".CodeMirror textarea[tabindex=\"0\"]";
const CODE_BLOCK_SUBMIT: &str = "div.mce-codeblock-btn-submit button";
const TITLE_INPUT: &str = "textarea#post-title-inp";
const EDITOR_FRAME: &str = "#editor-tistory_ifr";
const PUBLISH_LAYER_BUTTON: &str = "button#publish-layer-btn";
const PUBLISH_BUTTON: &str = "button#publish-btn";

/// 单个文档的发布流程
///
/// - 不持有页面资源，只借用 `JsExecutor`
/// - 任何一步失败都立即返回，不再继续操作该文档
#[derive(Debug, Clone)]
pub struct PostingFlow {
    config: Config,
    visibility: Visibility,
    post_publish_url: Option<String>,
    step_delay: Duration,
    publish_settle: Duration,
    poll_interval: Duration,
}

impl PostingFlow {
    /// 创建新的发布流程
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            visibility: config.visibility,
            post_publish_url: config.post_publish_target().map(str::to_string),
            step_delay: Duration::from_millis(config.step_delay_ms),
            publish_settle: Duration::from_millis(config.publish_settle_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }

    /// 发布一个文档
    ///
    /// `file_index` 从 0 开始，仅用于日志。
    pub async fn run(
        &self,
        executor: &JsExecutor,
        file_index: usize,
        document: &Document,
    ) -> Result<(), PostingError> {
        let label = file_index + 1;
        info!("[文档 {}] 开始发布: {}", label, document.name);

        if document.is_blank() {
            return Err(PostingError::MalformedDocument {
                reason: format!("文件内容为空: {}", document.name),
            });
        }

        let editor = EditorDriver::new(executor, self.poll_interval);

        let url = editor.current_url().await?;
        if !self.is_composer(&url) {
            return Err(PostingError::WrongPageContext { url });
        }

        // ========== 1. HTML 块 ==========
        info!("[文档 {}] 插入 HTML 块...", label);
        editor
            .click(MORE_PLUGIN_BUTTON, "HTML 块菜单按钮(更多)", DEFAULT_WAIT)
            .await?;
        self.pause().await;
        editor
            .click(HTML_BLOCK_PLUGIN, "HTML 块插件按钮", DEFAULT_WAIT)
            .await?;
        self.pause().await;
        editor
            .fill_within(
                CODE_BLOCK_CONTAINER,
                CODE_BLOCK_TEXTAREA,
                &document.content,
                "HTML 块编辑区域",
                "HTML 块输入框",
                DEFAULT_WAIT,
            )
            .await?;
        self.pause().await;
        editor
            .click(CODE_BLOCK_SUBMIT, "HTML 块确认按钮", DEFAULT_WAIT)
            .await?;
        self.pause().await;

        // ========== 2. 标题 / 正文 ==========
        let split = split_title_and_body(&document.content);
        info!("[文档 {}] 标题: {}", label, truncate_text(&split.title, 60));
        debug!("[文档 {}] 正文长度: {} 字节", label, split.body_html.len());

        editor
            .fill(TITLE_INPUT, &split.title, "标题输入框", DEFAULT_WAIT)
            .await?;
        self.pause().await;
        editor
            .append_to_frame(EDITOR_FRAME, &split.body_html, "编辑器 iframe", EDITOR_FRAME_WAIT)
            .await?;
        self.pause().await;

        // ========== 3. 发布 ==========
        editor
            .click(PUBLISH_LAYER_BUTTON, "发布层按钮", SHORT_WAIT)
            .await?;
        sleep(self.step_delay + self.step_delay / 2).await;
        editor
            .click(self.visibility.radio_selector(), "公开范围选项", DEFAULT_WAIT)
            .await?;
        sleep(self.step_delay / 2).await;
        editor.click(PUBLISH_BUTTON, "发布按钮", SHORT_WAIT).await?;

        info!("[文档 {}] 已点击发布，等待服务器响应...", label);
        sleep(self.publish_settle).await;

        if let Some(url) = &self.post_publish_url {
            if let Err(e) = executor.goto(url).await {
                warn!("[文档 {}] ⚠️ 发布后跳转失败: {}", label, e);
            }
        }

        info!("[文档 {}] ✓ 发布流程完成", label);
        Ok(())
    }

    fn is_composer(&self, url: &str) -> bool {
        self.config.is_composer_url(url)
    }

    async fn pause(&self) {
        sleep(self.step_delay).await;
    }
}
