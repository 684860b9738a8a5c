use serde::{Deserialize, Serialize};

/// 持久化的发布进度
///
/// `current_index` 始终指向下一个待处理的文档。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_running: bool,
    pub current_index: usize,
    /// 启动批次时所在标签页的 target id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl Session {
    /// 空闲状态 `{isRunning: false, currentIndex: 0}`
    pub fn idle() -> Self {
        Self::default()
    }

    /// 从第 0 个文档开始运行
    pub fn started(target_id: Option<String>) -> Self {
        Self {
            is_running: true,
            current_index: 0,
            target_id,
        }
    }

    /// 游标移动到 `index`，保留标签页引用
    pub fn at(&self, index: usize) -> Self {
        Self {
            is_running: true,
            current_index: index,
            target_id: self.target_id.clone(),
        }
    }

    /// 游标已到达（或超出）批次末尾
    pub fn is_exhausted(&self, batch_len: usize) -> bool {
        self.current_index >= batch_len
    }
}

/// 一个浏览器标签页的位置信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub target_id: String,
    pub url: String,
}
