//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `state` - 状态机
//! - 五个阶段和完整的状态转换表
//!
//! ### `coordinator` - 批次协调器
//! - 推进游标、投递下一个文档、处理投递失败
//! - 每个回合都从会话存储重新读取进度
//!
//! ### `console` - 操作台
//! - 读取 HTML 文件、写入存储、请求开始、显示结果
//!
//! ### `app` - 应用入口
//! - 连接浏览器，把三方通过通道连接起来
//!
//! ## 层次关系
//!
//! ```text
//! console ──START_POSTING──▶ coordinator ──RUN_POSTING_FOR_FILE──▶ workflow::PageAgent
//!    ▲                           │  ▲                                     │
//!    └──POSTING_DONE / ERROR─────┘  └────────FILE_POSTED / ERROR──────────┘
//! ```

pub mod app;
pub mod console;
pub mod coordinator;
pub mod state;

// 重新导出主要类型
pub use app::App;
pub use console::{ConsoleStatus, OperatorConsole};
pub use coordinator::Coordinator;
pub use state::{transition, Event, Phase, Step};
