use serde::{Deserialize, Serialize};

/// 一个上传的 HTML 文件
///
/// `content` 是原始 HTML 文本，加载后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// 内容是否为空（只有空白也算空）
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// 一次发布的文档序列，顺序即发布顺序
///
/// 只能整体替换，不做局部修改。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    documents: Vec<Document>,
}

impl Batch {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.name.as_str()).collect()
    }
}

impl From<Vec<Document>> for Batch {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}
