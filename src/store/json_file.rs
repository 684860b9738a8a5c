use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{SessionStore, StoreSnapshot};
use crate::error::{AppError, AppResult, FileError};
use crate::models::{Batch, Session};

/// 基于 JSON 文件的存储
///
/// 写入先落到临时文件再 rename，进程在写入中途退出也不会留下半个文件。
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> AppResult<StoreSnapshot> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("状态文件不存在，使用空状态: {}", self.path.display());
            return Ok(StoreSnapshot::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::file_read_failed(self.path.display().to_string(), e))?;

        serde_json::from_str(&content).map_err(|e| {
            AppError::File(FileError::CorruptState {
                path: self.path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    async fn write(&self, snapshot: &StoreSnapshot) -> AppResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, json)
            .await
            .map_err(|e| AppError::file_write_failed(tmp_path.display().to_string(), e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;

        debug!(
            "状态已写入: running={} index={}",
            snapshot.session.is_running, snapshot.session.current_index
        );
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn snapshot(&self) -> AppResult<StoreSnapshot> {
        self.read().await
    }

    async fn save_session(&self, session: &Session) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.read().await?;
        snapshot.session = session.clone();
        self.write(&snapshot).await
    }

    async fn replace_batch(&self, batch: &Batch) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot = StoreSnapshot {
            documents: batch.clone(),
            session: Session::idle(),
        };
        self.write(&snapshot).await
    }
}
