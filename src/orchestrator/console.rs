//! 操作台 - 编排层
//!
//! 接收操作者选择的 HTML 文件，写入存储并重置会话；
//! 请求协调器开始发布，并显示协调器发回的终止通知。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::messaging::{ConsoleNotice, CoordinatorMessage, StartFailure, StartResponse};
use crate::models::{collect_html_paths, filter_html_files, read_documents, Batch, IntakeReport};
use crate::store::SessionStore;
use crate::utils::logging::log_documents_loaded;

/// 显示给操作者的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleStatus {
    /// 已开始发布
    Started { count: usize },
    /// 全部完成
    Done,
    /// 开始失败或中途失败
    Error(String),
}

impl ConsoleStatus {
    /// `START_POSTING` 被拒绝时显示的状态
    pub fn start_failed(reason: Option<StartFailure>) -> Self {
        let hint = reason.map(|r| r.hint()).unwrap_or("未知原因");
        ConsoleStatus::Error(format!("自动发布启动失败: {}", hint))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConsoleStatus::Error(_))
    }

    /// 面向操作者的消息
    pub fn message(&self) -> String {
        match self {
            ConsoleStatus::Started { count } => {
                format!("已开始自动发布，共 {} 个文档（在当前标签页中进行）", count)
            }
            ConsoleStatus::Done => "所有 HTML 文件已发布完成。".to_string(),
            ConsoleStatus::Error(message) => message.clone(),
        }
    }
}

/// 操作台
pub struct OperatorConsole {
    store: Arc<dyn SessionStore>,
}

impl OperatorConsole {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// 读取文件并整体替换批次
    ///
    /// 没有任何 HTML 文件时不修改存储。
    pub async fn load(&self, inputs: &[PathBuf]) -> AppResult<IntakeReport> {
        let paths = collect_html_paths(inputs).await?;
        let (html_paths, report) = filter_html_files(paths)?;

        if report.accepted == 0 {
            warn!("⚠️ {}", report.message());
            return Ok(report);
        }
        if report.rejected > 0 {
            warn!("⚠️ {}", report.message());
        } else {
            info!("读取文件内容中...");
        }

        let batch = Batch::new(read_documents(&html_paths).await?);
        self.store.replace_batch(&batch).await?;

        log_documents_loaded(batch.len(), &batch.names());
        info!("✓ 已载入 {} 个 HTML 文件", batch.len());
        Ok(report)
    }

    /// 当前会话和批次的描述
    pub async fn status(&self) -> AppResult<String> {
        let snapshot = self.store.snapshot().await?;
        let session = &snapshot.session;
        let mut lines = vec![format!(
            "运行中: {} | 当前索引: {} / {}",
            session.is_running,
            session.current_index,
            snapshot.documents.len()
        )];
        if let Some(target) = &session.target_id {
            lines.push(format!("标签页: {}", target));
        }
        for (i, name) in snapshot.documents.names().iter().enumerate() {
            let marker = if session.is_running && i == session.current_index {
                "▶"
            } else {
                " "
            };
            lines.push(format!("{} {}. {}", marker, i + 1, name));
        }
        Ok(lines.join("\n"))
    }

    /// 发送 `START_POSTING` 并等待回执
    pub async fn start(
        &self,
        coordinator: &mpsc::UnboundedSender<CoordinatorMessage>,
    ) -> AppResult<ConsoleStatus> {
        let (reply, response) = oneshot::channel();
        coordinator
            .send(CoordinatorMessage::StartPosting { reply })
            .map_err(|_| AppError::Other("协调器未运行".to_string()))?;

        let status = match response.await {
            Ok(StartResponse { ok: true, .. }) => ConsoleStatus::Started {
                count: self.store.load_documents().await?.len(),
            },
            Ok(StartResponse { reason, .. }) => ConsoleStatus::start_failed(reason),
            Err(_) => ConsoleStatus::Error("与协调器通信时发生错误。".to_string()),
        };
        Self::display(&status);
        Ok(status)
    }

    /// 等待终止通知（`POSTING_DONE` / `POSTING_ERROR`）
    pub async fn wait_for_outcome(
        notices: &mut mpsc::UnboundedReceiver<ConsoleNotice>,
    ) -> ConsoleStatus {
        let status = match notices.recv().await {
            Some(ConsoleNotice::PostingDone) => ConsoleStatus::Done,
            Some(ConsoleNotice::PostingError { message }) => {
                ConsoleStatus::Error(format!("发生错误，发布已中止: {}", message))
            }
            None => ConsoleStatus::Error("协调器已退出".to_string()),
        };
        Self::display(&status);
        status
    }

    fn display(status: &ConsoleStatus) {
        if status.is_error() {
            error!("❌ {}", status.message());
        } else {
            info!("✅ {}", status.message());
        }
    }
}
