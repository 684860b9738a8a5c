use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 文件 / 存储操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 发布流程错误
    #[error("发布错误: {0}")]
    Posting(#[from] PostingError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件 / 存储操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 状态文件内容无法解析
    #[error("状态文件解析失败 ({path}): {source}")]
    CorruptState {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 发布流程错误
///
/// 前三种是 `START_POSTING` 的前置条件失败，不会修改 Session；
/// 页面侧的错误经 `ERROR` 消息上报，对整个批次都是致命的。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    /// 没有可操作的标签页
    #[error("没有可用的浏览器标签页")]
    NoActiveContext,
    /// 当前标签页不是目标网站
    #[error("当前标签页不是目标网站: {url}")]
    WrongSite { url: String },
    /// 批次为空或不存在
    #[error("没有待发布的文档")]
    NoDocuments,
    /// 消息无法送达页面（已尝试一次重新注入）
    #[error("无法将任务送达页面: {reason}")]
    DeliveryUnreachable { reason: String },
    /// 页面元素在超时时间内未出现
    #[error("找不到页面元素: {name}")]
    UiElementNotFound { name: String },
    /// 文档内容为空或不可读
    #[error("文档内容无效: {reason}")]
    MalformedDocument { reason: String },
    /// 页面不是发布所需的编辑器页面
    #[error("当前页面不是写作页面: {url}")]
    WrongPageContext { url: String },
    /// 批次正在运行，页面代理还没有报告第 `index` 个文档的结果
    #[error("第 {} 个文档仍在发布中，请等待完成", index + 1)]
    AlreadyRunning { index: usize },
    /// 游标已超出批次末尾（会被规范化，不是致命错误）
    #[error("索引 {index} 已超出批次长度 {len}")]
    AlreadyCompleted { index: usize, len: usize },
    /// 页面脚本执行失败
    #[error("页面脚本执行失败: {reason}")]
    PageScript { reason: String },
}

impl PostingError {
    /// 展示给操作者的消息（只包含消息文本，不包含调试信息）
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 的值 '{value}' 不合法")]
    InvalidValue { field: String, value: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::CorruptState {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 如果是发布流程错误，返回其引用
    pub fn as_posting(&self) -> Option<&PostingError> {
        match self {
            AppError::Posting(e) => Some(e),
            _ => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
