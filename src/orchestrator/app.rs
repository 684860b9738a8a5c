//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 把三个执行上下文连接起来并管理资源：
//!
//! 1. **应用初始化**：启动日志、连接浏览器、创建 JsExecutor
//! 2. **组装上下文**：协调器任务、页面连接（页面代理按需启动）、操作台
//! 3. **资源管理**：持有 Browser，确保其生命周期覆盖整个发布过程
//!
//! 三方之间只通过通道通信，唯一共享的是会话存储。

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chromiumoxide::Browser;
use tokio::sync::mpsc;

use crate::browser;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::messaging::{ConsoleNotice, CoordinatorMessage, PageLink, StartFailure};
use crate::orchestrator::console::{ConsoleStatus, OperatorConsole};
use crate::orchestrator::coordinator::Coordinator;
use crate::store::{JsonFileStore, SessionStore};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::CdpPageLink;

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    console: OperatorConsole,
    coordinator: mpsc::UnboundedSender<CoordinatorMessage>,
    notices: mpsc::UnboundedReceiver<ConsoleNotice>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(config.browser_debug_port, &config.target_site);

        // 连接浏览器；没有任何标签页时按 NO_TAB 报告
        let (browser, page) = match browser::connect_to_browser_and_page(&config).await {
            Ok(pair) => pair,
            Err(e) => match e.as_posting() {
                Some(posting) => {
                    let status = ConsoleStatus::start_failed(Some(StartFailure::from_error(posting)));
                    bail!(status.message());
                }
                None => return Err(anyhow::Error::new(e).context("无法连接浏览器")),
            },
        };

        // 创建 JsExecutor（持有 page）
        let executor = Arc::new(JsExecutor::new(page));

        let store: Arc<dyn SessionStore> = Arc::new(JsonFileStore::new(&config.store_path));
        let (coordinator_tx, coordinator_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let link: Arc<dyn PageLink> = Arc::new(CdpPageLink::new(
            executor,
            config.clone(),
            coordinator_tx.clone(),
        ));
        let coordinator = Coordinator::new(config.clone(), store.clone(), link, notice_tx);
        tokio::spawn(coordinator.run(coordinator_rx));

        Ok(Self {
            console: OperatorConsole::new(store),
            config,
            _browser: browser,
            coordinator: coordinator_tx,
            notices: notice_rx,
        })
    }

    /// 开始发布并等待结束
    pub async fn run_posting(&mut self) -> Result<ConsoleStatus> {
        let started = self.console.start(&self.coordinator).await?;
        let status = match started {
            ConsoleStatus::Started { .. } => OperatorConsole::wait_for_outcome(&mut self.notices).await,
            other => other,
        };
        self.finish(&status);
        Ok(status)
    }

    /// 继续一个运行中的会话并等待结束
    ///
    /// 是否有可继续的会话由协调器判断，结果总会以通知的形式返回。
    pub async fn resume(&mut self) -> Result<ConsoleStatus> {
        self.coordinator
            .send(CoordinatorMessage::Resume)
            .context("协调器未运行")?;
        let status = OperatorConsole::wait_for_outcome(&mut self.notices).await;
        self.finish(&status);
        Ok(status)
    }

    fn finish(&self, status: &ConsoleStatus) {
        print_final_stats(&status.message(), !status.is_error(), &self.config.output_log_file);
    }
}
