//! 页面代理 - 流程层
//!
//! 页面代理是运行在目标页面上的一方：接收协调器投递的文档，
//! 执行 `PostingFlow`，再把结果报告回协调器。
//!
//! `CdpPageLink` 是协调器一侧看到的页面：
//! - 投递前检查页面中的辅助脚本（`window.__autoPoster`）和代理任务是否都在
//! - 任意一个不在就返回 `NoReceiver`，由调用方决定是否重新注入
//! - 打开写作页面后会自动注入一次，相当于页面加载时注入脚本

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::JsExecutor;
use crate::messaging::{CoordinatorMessage, Delivery, DeliveryError, PageLink, PageReport};
use crate::models::PageContext;
use crate::services::{EditorDriver, BOOTSTRAP_SCRIPT, PROBE_SCRIPT};
use crate::utils::{wait_until, WaitError};
use crate::workflow::PostingFlow;

const COMPOSER_LOAD_WAIT: Duration = Duration::from_secs(15);

/// 页面代理
///
/// 一次只处理一个文档，按收到的顺序依次处理。
pub struct PageAgent {
    executor: Arc<JsExecutor>,
    flow: PostingFlow,
    reports: mpsc::UnboundedSender<CoordinatorMessage>,
}

impl PageAgent {
    pub fn new(
        executor: Arc<JsExecutor>,
        flow: PostingFlow,
        reports: mpsc::UnboundedSender<CoordinatorMessage>,
    ) -> Self {
        Self {
            executor,
            flow,
            reports,
        }
    }

    /// 处理投递，直到发送端关闭
    pub async fn run(self, mut deliveries: mpsc::UnboundedReceiver<Delivery>) {
        debug!("页面代理已启动");
        while let Some(delivery) = deliveries.recv().await {
            let report = self.process(&delivery).await;
            if self.reports.send(report.into()).is_err() {
                warn!("协调器已关闭，结果无法上报");
                break;
            }
        }
        debug!("页面代理已退出");
    }

    /// 发布一个文档并生成报告
    pub async fn process(&self, delivery: &Delivery) -> PageReport {
        match self
            .flow
            .run(&self.executor, delivery.file_index, &delivery.file)
            .await
        {
            Ok(()) => PageReport::FilePosted {
                file_index: delivery.file_index,
            },
            Err(e) => {
                error!("[文档 {}] ❌ 发布失败: {}", delivery.file_index + 1, e);
                PageReport::Error {
                    message: e.user_message(),
                }
            }
        }
    }
}

/// 基于 chromiumoxide 的页面连接
pub struct CdpPageLink {
    executor: Arc<JsExecutor>,
    config: Config,
    reports: mpsc::UnboundedSender<CoordinatorMessage>,
    agent: Mutex<Option<mpsc::UnboundedSender<Delivery>>>,
}

impl CdpPageLink {
    /// 创建页面连接
    ///
    /// 此时页面代理尚未启动，第一次投递会因 `NoReceiver` 触发注入。
    pub fn new(
        executor: Arc<JsExecutor>,
        config: Config,
        reports: mpsc::UnboundedSender<CoordinatorMessage>,
    ) -> Self {
        Self {
            executor,
            config,
            reports,
            agent: Mutex::new(None),
        }
    }

    /// 在页面中安装辅助脚本，并确保代理任务在运行
    async fn install(&self) -> Result<(), DeliveryError> {
        let installed: bool = self
            .executor
            .eval_as(BOOTSTRAP_SCRIPT)
            .await
            .map_err(script_error)?;
        if !installed {
            return Err(DeliveryError::Script("辅助脚本未能安装".to_string()));
        }

        let mut agent = self.agent.lock().await;
        if agent.as_ref().map_or(true, |tx| tx.is_closed()) {
            let (tx, rx) = mpsc::unbounded_channel();
            let page_agent = PageAgent::new(
                self.executor.clone(),
                PostingFlow::new(&self.config),
                self.reports.clone(),
            );
            tokio::spawn(page_agent.run(rx));
            *agent = Some(tx);
            info!("🧩 页面代理已启动");
        }
        Ok(())
    }

    async fn helpers_present(&self) -> Result<bool, DeliveryError> {
        self.executor
            .eval_as::<bool>(PROBE_SCRIPT)
            .await
            .map_err(script_error)
    }

    async fn current_url(&self) -> Result<String, DeliveryError> {
        self.executor
            .current_url()
            .await
            .map(|url| url.unwrap_or_default())
            .map_err(script_error)
    }

    /// 找到写作页面的地址：优先使用配置，否则读取页面上的“写文章”链接
    async fn composer_target(&self) -> Result<String, DeliveryError> {
        if !self.config.composer_url.trim().is_empty() {
            return Ok(self.config.composer_url.trim().to_string());
        }

        let url = self.current_url().await?;
        if !self.config.is_target_site(&url) {
            debug!("当前页面不在目标网站，先打开首页: {}", self.config.home_url);
            self.executor
                .goto(&self.config.home_url)
                .await
                .map_err(|e| DeliveryError::Navigation(e.to_string()))?;
        }

        self.install().await?;
        let link_selector = format!("a.link_tab[href$=\"{}\"]", self.config.composer_path);
        let editor = EditorDriver::new(&self.executor, Duration::from_millis(self.config.poll_interval_ms.max(1)));
        editor
            .link_href(&link_selector)
            .await
            .map_err(|e| DeliveryError::Script(e.to_string()))?
            .ok_or_else(|| DeliveryError::Navigation("页面上找不到写文章链接".to_string()))
    }

    /// 等待写作页面加载完成
    async fn wait_for_composer(&self) -> Result<(), DeliveryError> {
        let executor = self.executor.as_ref();
        let config = &self.config;
        wait_until(
            move || async move {
                let url = executor.current_url().await?.unwrap_or_default();
                if !config.is_composer_url(&url) {
                    return Ok::<_, AppError>(None);
                }
                let ready: bool = executor
                    .eval_as("document.readyState === 'complete'")
                    .await?;
                Ok(ready.then_some(()))
            },
            Duration::from_millis(config.poll_interval_ms.max(1)),
            COMPOSER_LOAD_WAIT,
        )
        .await
        .map_err(|e| match e {
            WaitError::Timeout(_) => DeliveryError::Navigation("写作页面加载超时".to_string()),
            WaitError::Probe(e) => script_error(e),
        })
    }
}

#[async_trait]
impl PageLink for CdpPageLink {
    async fn active_context(&self) -> Result<Option<PageContext>, DeliveryError> {
        let url = self.executor.current_url().await.map_err(script_error)?;
        Ok(url
            .filter(|url| !url.is_empty())
            .map(|url| PageContext {
                target_id: self.executor.target_id(),
                url,
            }))
    }

    async fn open_composer(&self) -> Result<(), DeliveryError> {
        let url = self.current_url().await?;
        if self.config.is_composer_url(&url) {
            debug!("已在写作页面: {}", url);
            return Ok(());
        }

        let target = self.composer_target().await?;
        info!("📝 打开新的写作页面: {}", target);
        self.executor
            .goto(&target)
            .await
            .map_err(|e| DeliveryError::Navigation(e.to_string()))?;
        self.wait_for_composer().await?;
        self.install().await
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        if !self.helpers_present().await? {
            debug!("页面中没有辅助脚本");
            return Err(DeliveryError::NoReceiver);
        }

        let agent = self.agent.lock().await;
        match agent.as_ref() {
            Some(tx) if tx.send(delivery.clone()).is_ok() => Ok(()),
            _ => Err(DeliveryError::NoReceiver),
        }
    }

    async fn reinject(&self) -> Result<(), DeliveryError> {
        info!("💉 重新注入页面代理");
        self.install().await
    }
}

fn script_error(err: AppError) -> DeliveryError {
    DeliveryError::Script(err.to_string())
}
