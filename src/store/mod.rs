//! 持久化的会话存储
//!
//! 保存两项数据：`documents`（批次）和 `session`（进度游标）。
//! 协调器进程重启后只依赖这里的数据恢复进度。

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::{Batch, Session};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// 存储中的全部内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub documents: Batch,
    #[serde(default)]
    pub session: Session,
}

/// 持久化键值存储接口
///
/// 每次写入在返回前必须已经落盘，调用方依赖这一点保证
/// “先持久化，再发消息”的顺序。
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 一次读取批次和会话
    async fn snapshot(&self) -> AppResult<StoreSnapshot>;

    /// 覆盖会话
    async fn save_session(&self, session: &Session) -> AppResult<()>;

    /// 整体替换批次，同时把会话重置为空闲
    async fn replace_batch(&self, batch: &Batch) -> AppResult<()>;

    async fn load_documents(&self) -> AppResult<Batch> {
        Ok(self.snapshot().await?.documents)
    }

    async fn load_session(&self) -> AppResult<Session> {
        Ok(self.snapshot().await?.session)
    }
}
