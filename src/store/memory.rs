use std::sync::Mutex;

use async_trait::async_trait;

use super::{SessionStore, StoreSnapshot};
use crate::error::{AppError, AppResult};
use crate::models::{Batch, Session};

/// 内存存储，同时记录每一次写入的会话，便于检查游标变化
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    snapshot: StoreSnapshot,
    history: Vec<Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定批次初始化（会话为空闲）
    pub fn with_batch(batch: Batch) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                snapshot: StoreSnapshot {
                    documents: batch,
                    session: Session::idle(),
                },
                history: Vec::new(),
            }),
        }
    }

    /// 按时间顺序返回所有写入过的会话
    pub fn session_history(&self) -> Vec<Session> {
        self.inner
            .lock()
            .map(|state| state.history.clone())
            .unwrap_or_default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> AppResult<T> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| AppError::Other("内存存储锁已损坏".to_string()))?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn snapshot(&self) -> AppResult<StoreSnapshot> {
        self.with_state(|state| state.snapshot.clone())
    }

    async fn save_session(&self, session: &Session) -> AppResult<()> {
        self.with_state(|state| {
            state.snapshot.session = session.clone();
            state.history.push(session.clone());
        })
    }

    async fn replace_batch(&self, batch: &Batch) -> AppResult<()> {
        self.with_state(|state| {
            state.snapshot = StoreSnapshot {
                documents: batch.clone(),
                session: Session::idle(),
            };
            state.history.push(Session::idle());
        })
    }
}
