//! 三个执行上下文之间的消息
//!
//! 控制台、协调器、页面代理之间没有共享内存，只通过这里定义的消息通信。
//! `type` 字段的取值与消息表一致，便于日志和调试时直接对照。

pub mod delivery;
pub mod page_link;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::PostingError;
use crate::models::Document;

pub use delivery::{deliver_with_recovery, DeliveryError};
pub use page_link::PageLink;

/// 控制台 → 协调器，页面 → 协调器
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// `START_POSTING`，附带回执通道
    StartPosting {
        reply: oneshot::Sender<StartResponse>,
    },
    /// 继续一个仍在运行中的会话（协调器进程重启之后）
    Resume,
    /// `FILE_POSTED`
    FilePosted { file_index: usize },
    /// `ERROR`
    Error { message: String },
}

/// 协调器 → 页面：`RUN_POSTING_FOR_FILE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub file_index: usize,
    pub file: Document,
}

/// 协调器 → 控制台的终止通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsoleNotice {
    PostingDone,
    PostingError { message: String },
}

/// 页面 → 协调器的报告（线上格式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageReport {
    #[serde(rename_all = "camelCase")]
    FilePosted { file_index: usize },
    Error { message: String },
}

impl From<PageReport> for CoordinatorMessage {
    fn from(report: PageReport) -> Self {
        match report {
            PageReport::FilePosted { file_index } => CoordinatorMessage::FilePosted { file_index },
            PageReport::Error { message } => CoordinatorMessage::Error { message },
        }
    }
}

/// `START_POSTING` 失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartFailure {
    NoTab,
    NotTargetSite,
    NoDocuments,
    AlreadyRunning,
    InjectFail,
}

impl StartFailure {
    /// 前置条件类错误映射到失败原因，其他错误统一视为注入失败
    pub fn from_error(err: &PostingError) -> Self {
        match err {
            PostingError::NoActiveContext => StartFailure::NoTab,
            PostingError::WrongSite { .. } => StartFailure::NotTargetSite,
            PostingError::NoDocuments => StartFailure::NoDocuments,
            PostingError::AlreadyRunning { .. } => StartFailure::AlreadyRunning,
            _ => StartFailure::InjectFail,
        }
    }

    /// 面向操作者的提示
    pub fn hint(&self) -> &'static str {
        match self {
            StartFailure::NoTab => "找不到可用的浏览器标签页。",
            StartFailure::NotTargetSite => "请先在浏览器中打开目标博客页面。",
            StartFailure::NoDocuments => "请先上传 HTML 文件。",
            StartFailure::AlreadyRunning => "已有发布任务在进行中，请等待完成或使用 resume 继续。",
            StartFailure::InjectFail => "无法在页面中启动自动发布脚本。",
        }
    }
}

/// `START_POSTING` 的回执：`{ok:true}` 或 `{ok:false, reason}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StartFailure>,
}

impl StartResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn failed(reason: StartFailure) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}
