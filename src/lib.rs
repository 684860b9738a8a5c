//! # Auto Poster
//!
//! 把一批 HTML 文件依次发布到博客写作页面的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 三个执行上下文只通过消息通信，唯一共享的是会话存储：
//! 操作台（console）、协调器（coordinator）、页面代理（page agent）。
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() / goto() 能力
//! - `store/` - 会话存储（JSON 文件 / 内存）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面操作
//! - `EditorDriver` - 等待元素、点击、填写、写入编辑器
//! - `split_title_and_body` - 从 HTML 中拆出标题和正文
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文档"的完整发布流程
//! - `PostingFlow` - HTML 区块 → 标题 → 正文 → 发布
//! - `PageAgent` / `CdpPageLink` - 页面一侧的接收方和协调器看到的页面
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/state` - 显式的阶段和状态转换
//! - `orchestrator/coordinator` - 逐个投递、推进游标、恢复投递
//! - `orchestrator/console` - 载入文件、开始发布、显示结果
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod messaging;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{Config, Visibility};
pub use error::{AppError, AppResult, PostingError};
pub use infrastructure::JsExecutor;
pub use messaging::{ConsoleNotice, CoordinatorMessage, PageLink, StartFailure, StartResponse};
pub use models::{Batch, Document, Session};
pub use orchestrator::{App, ConsoleStatus, Coordinator, OperatorConsole, Phase};
pub use store::{JsonFileStore, MemoryStore, SessionStore};
pub use workflow::{CdpPageLink, PostingFlow};
