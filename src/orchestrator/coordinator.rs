//! 批次协调器 - 编排层
//!
//! ## 职责
//!
//! 决定“现在处理第几个文档”，在页面导航之后重新投递任务，
//! 并在投递失败时做一次恢复。
//!
//! ## 设计特点
//!
//! - **会话为唯一事实来源**：每处理一条消息都先重新读取存储，
//!   内存中的阶段只在与会话一致时才被采用
//! - **先持久化再发消息**：任何依赖新游标的投递或通知，都在会话写入完成之后
//! - **严格串行**：上一个文档报告完成或失败之前，不会投递下一个

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, PostingError};
use crate::messaging::{
    deliver_with_recovery, ConsoleNotice, CoordinatorMessage, Delivery, PageLink, StartFailure,
    StartResponse,
};
use crate::models::{Batch, Session};
use crate::orchestrator::state::{transition, Event, Phase, Step};
use crate::store::SessionStore;

const UNKNOWN_ERROR: &str = "未知错误";
const NOTHING_TO_RESUME: &str = "没有可继续的发布任务";

/// 批次协调器
pub struct Coordinator {
    config: Config,
    store: Arc<dyn SessionStore>,
    link: Arc<dyn PageLink>,
    notices: mpsc::UnboundedSender<ConsoleNotice>,
    phase: Phase,
}

impl Coordinator {
    /// 创建协调器
    ///
    /// 新建的协调器不继承任何内存状态，第一次处理消息时从存储恢复。
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        link: Arc<dyn PageLink>,
        notices: mpsc::UnboundedSender<ConsoleNotice>,
    ) -> Self {
        Self {
            config,
            store,
            link,
            notices,
            phase: Phase::Idle,
        }
    }

    /// 当前（内存中的）阶段
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// 消息循环，发送端全部关闭后退出
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<CoordinatorMessage>) {
        info!("📡 协调器已启动，等待消息...");
        while let Some(message) = inbox.recv().await {
            self.handle(message).await;
        }
        debug!("协调器收件箱已关闭");
    }

    /// 处理一条消息（一个完整的回合）
    pub async fn handle(&mut self, message: CoordinatorMessage) {
        let result = match message {
            CoordinatorMessage::StartPosting { reply } => {
                let response = self.start().await;
                if reply.send(response).is_err() {
                    debug!("START_POSTING 的请求方已不在");
                }
                Ok(())
            }
            CoordinatorMessage::Resume => self.resume().await,
            CoordinatorMessage::FilePosted { file_index } => self.on_file_posted(file_index).await,
            CoordinatorMessage::Error { message } => self.on_error(message).await,
        };

        if let Err(e) = result {
            error!("❌ 协调器处理消息失败: {}", e);
            self.fail(e.to_string(), true).await;
        }
    }

    /// 处理 `START_POSTING`
    ///
    /// 前置条件失败时不修改会话；投递失败时会话被重置。
    pub async fn start(&mut self) -> StartResponse {
        match self.try_start().await {
            Ok(()) => StartResponse::ok(),
            Err(e) => {
                let reason = match e.as_posting() {
                    Some(posting) => StartFailure::from_error(posting),
                    None => StartFailure::InjectFail,
                };
                warn!("⚠️ 无法开始发布 ({:?}): {}", reason, e);
                StartResponse::failed(reason)
            }
        }
    }

    async fn try_start(&mut self) -> AppResult<()> {
        let context = self
            .link
            .active_context()
            .await
            .map_err(|e| PostingError::DeliveryUnreachable {
                reason: e.to_string(),
            })?
            .ok_or(PostingError::NoActiveContext)?;

        if !self.config.is_target_site(&context.url) {
            return Err(PostingError::WrongSite { url: context.url }.into());
        }

        let (batch, session) = self.load_turn().await?;
        let phase = self.phase.clone().reconcile(&session);
        let step = transition(&phase, &Event::Start, batch.len())?;
        let Step::Enter(Phase::Dispatching(first)) = step else {
            return Err(AppError::Other(format!("开始时出现意外的状态转换: {:?}", step)));
        };

        info!("🚀 开始发布，共 {} 个文档", batch.len());
        self.store
            .save_session(&Session::started(Some(context.target_id)))
            .await?;
        self.phase = Phase::Dispatching(first);

        if let Err(e) = self.dispatch(first, &batch).await {
            self.fail(e.user_message(), false).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// 继续一个仍在运行中的会话：重新投递游标处的文档
    ///
    /// 没有可继续的会话时也会给控制台一个终止通知。
    pub async fn resume(&mut self) -> AppResult<()> {
        let (batch, session) = self.load_turn().await?;
        if !session.is_running {
            info!("没有运行中的会话，无需继续");
            self.notify(ConsoleNotice::PostingError {
                message: NOTHING_TO_RESUME.to_string(),
            });
            return Ok(());
        }

        let index = session.current_index;
        info!("🔁 从第 {}/{} 个文档继续", index + 1, batch.len());
        self.phase = Phase::Dispatching(index);
        if let Err(e) = self.dispatch(index, &batch).await {
            self.fail(e.user_message(), true).await;
        }
        Ok(())
    }

    /// 处理 `FILE_POSTED`
    async fn on_file_posted(&mut self, file_index: usize) -> AppResult<()> {
        let (batch, session) = self.load_turn().await?;
        let phase = self.phase.clone().reconcile(&session);

        let step = transition(&phase, &Event::FileCompleted { index: file_index }, batch.len())?;
        match step {
            Step::Ignore(reason) => {
                warn!("忽略文档 {} 的完成报告: {}", file_index + 1, reason);
                self.phase = phase;
            }
            Step::Enter(Phase::Dispatching(next)) => {
                info!(
                    "[文档 {}] ✅ 发布完成，开始第 {}/{} 个",
                    file_index + 1,
                    next + 1,
                    batch.len()
                );
                self.store.save_session(&session.at(next)).await?;
                self.phase = Phase::Dispatching(next);
                if let Err(e) = self.dispatch(next, &batch).await {
                    self.fail(e.user_message(), true).await;
                }
            }
            Step::Enter(Phase::Finished) => {
                info!("[文档 {}] ✅ 发布完成", file_index + 1);
                self.finish().await?;
            }
            Step::Enter(other) => {
                warn!("完成报告导致了意外的阶段: {:?}", other);
                self.phase = other;
            }
        }
        Ok(())
    }

    /// 处理 `ERROR`
    async fn on_error(&mut self, message: String) -> AppResult<()> {
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        };

        let (batch, session) = self.load_turn().await?;
        let phase = self.phase.clone().reconcile(&session);
        let event = if phase.is_running() {
            Event::AutomatorError { message }
        } else {
            Event::ExternalError { message }
        };

        if let Step::Enter(Phase::Failed(message)) = transition(&phase, &event, batch.len())? {
            error!("❌ 页面报告错误: {}", message);
            self.fail(message, true).await;
        }
        Ok(())
    }

    /// 投递第 `index` 个文档：打开写作页面 → 投递（失败时重新注入一次）
    ///
    /// 调用前会话必须已经指向 `index`。
    async fn dispatch(&mut self, index: usize, batch: &Batch) -> Result<(), PostingError> {
        let document = batch.get(index).ok_or(PostingError::AlreadyCompleted {
            index,
            len: batch.len(),
        })?;
        info!("[文档 {}] 📤 投递: {}", index + 1, document.name);

        self.link
            .open_composer()
            .await
            .map_err(|e| PostingError::DeliveryUnreachable {
                reason: e.to_string(),
            })?;

        let delivery = Delivery {
            file_index: index,
            file: document.clone(),
        };
        match deliver_with_recovery(self.link.as_ref(), &delivery).await {
            Ok(()) => {
                if let Ok(Step::Enter(next)) = transition(&self.phase, &Event::Delivered, batch.len())
                {
                    self.phase = next;
                }
                debug!("[文档 {}] 页面已接收", index + 1);
                Ok(())
            }
            Err(e) => {
                let message = format!("[文档 {}] {}", index + 1, e);
                if let Ok(Step::Enter(next)) = transition(
                    &self.phase,
                    &Event::DeliveryFailed {
                        message: message.clone(),
                    },
                    batch.len(),
                ) {
                    self.phase = next;
                }
                Err(PostingError::DeliveryUnreachable { reason: message })
            }
        }
    }

    /// 读取本回合所需的批次和会话
    ///
    /// 运行中但游标已越界的会话会被规范化为空闲。
    async fn load_turn(&mut self) -> AppResult<(Batch, Session)> {
        let snapshot = self.store.snapshot().await?;
        let mut session = snapshot.session;

        if session.is_running && session.is_exhausted(snapshot.documents.len()) {
            let normalized = PostingError::AlreadyCompleted {
                index: session.current_index,
                len: snapshot.documents.len(),
            };
            warn!("⚠️ {}，重置会话", normalized);
            session = Session::idle();
            self.store.save_session(&session).await?;
            self.phase = Phase::Idle;
        }

        Ok((snapshot.documents, session))
    }

    async fn finish(&mut self) -> AppResult<()> {
        self.store.save_session(&Session::idle()).await?;
        self.phase = Phase::Finished;
        info!("🎉 所有文档发布完成");
        self.notify(ConsoleNotice::PostingDone);
        Ok(())
    }

    /// 进入失败状态：重置会话，按需通知控制台
    async fn fail(&mut self, message: String, notify: bool) {
        if let Err(e) = self.store.save_session(&Session::idle()).await {
            error!("❌ 重置会话失败: {}", e);
        }
        error!("❌ 发布中止: {}", message);
        self.phase = Phase::Failed(message.clone());
        if notify {
            self.notify(ConsoleNotice::PostingError { message });
        }
    }

    fn notify(&self, notice: ConsoleNotice) {
        if self.notices.send(notice).is_err() {
            debug!("控制台已关闭，通知未送达");
        }
    }
}
