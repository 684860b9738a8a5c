//! 协调器状态机
//!
//! 五个状态：`Idle`、`Dispatching(i)`、`Awaiting(i)`、`Finished`、`Failed`。
//! `transition` 对每一个 (状态, 事件) 组合都给出明确结果，
//! 非法组合返回 `Step::Ignore` 而不是悄悄保持原状。

use crate::error::PostingError;
use crate::models::Session;

/// 协调器所处的阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// 没有运行中的批次
    Idle,
    /// 正在投递第 i 个文档，等待页面接收
    Dispatching(usize),
    /// 已投递第 i 个文档，等待页面报告结果
    Awaiting(usize),
    /// 全部完成
    Finished,
    /// 因错误中止
    Failed(String),
}

impl Phase {
    /// 根据持久化的会话推导阶段
    ///
    /// 运行中的会话视为“已投递、等待结果”，因为进程重启后
    /// 无法知道投递是否已被接收。
    pub fn from_session(session: &Session) -> Self {
        if session.is_running {
            Phase::Awaiting(session.current_index)
        } else {
            Phase::Idle
        }
    }

    /// 内存中的阶段与持久化会话核对，不一致时以会话为准
    pub fn reconcile(self, session: &Session) -> Self {
        match (&self, session.is_running) {
            (Phase::Dispatching(i) | Phase::Awaiting(i), true) if *i == session.current_index => {
                self
            }
            (Phase::Finished | Phase::Failed(_), false) => self,
            _ => Phase::from_session(session),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Phase::Dispatching(_) | Phase::Awaiting(_))
    }
}

/// 驱动状态机的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// 操作者请求开始
    Start,
    /// 页面已接收投递
    Delivered,
    /// 投递失败（包括一次重新注入之后仍失败）
    DeliveryFailed { message: String },
    /// 页面报告第 index 个文档已发布
    FileCompleted { index: usize },
    /// 页面报告错误
    AutomatorError { message: String },
    /// 其他来源的错误
    ExternalError { message: String },
}

/// 一次状态转换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 进入新阶段
    Enter(Phase),
    /// 该事件在当前阶段没有意义，不做任何改变
    Ignore(&'static str),
}

/// 状态转换函数
///
/// `batch_len` 是当前批次的长度。开始时批次为空返回 `NoDocuments`，
/// 批次正在运行返回 `AlreadyRunning`，两种情况阶段都保持不变。
pub fn transition(phase: &Phase, event: &Event, batch_len: usize) -> Result<Step, PostingError> {
    let step = match (phase, event) {
        // 开始：页面代理仍在处理某个文档时不能重新开始
        (_, Event::Start) => {
            if batch_len == 0 {
                return Err(PostingError::NoDocuments);
            }
            if let Phase::Dispatching(index) | Phase::Awaiting(index) = phase {
                return Err(PostingError::AlreadyRunning { index: *index });
            }
            Step::Enter(Phase::Dispatching(0))
        }

        (Phase::Dispatching(i), Event::Delivered) => Step::Enter(Phase::Awaiting(*i)),
        (_, Event::Delivered) => Step::Ignore("没有正在进行的投递"),

        (Phase::Dispatching(_), Event::DeliveryFailed { message }) => {
            Step::Enter(Phase::Failed(message.clone()))
        }
        (_, Event::DeliveryFailed { .. }) => Step::Ignore("没有正在进行的投递"),

        // 完成报告以报告者给出的索引为准；比游标小的是重复报告
        (Phase::Dispatching(i) | Phase::Awaiting(i), Event::FileCompleted { index }) => {
            if index < i {
                Step::Ignore("重复的完成报告")
            } else if index + 1 >= batch_len {
                Step::Enter(Phase::Finished)
            } else {
                Step::Enter(Phase::Dispatching(index + 1))
            }
        }
        (_, Event::FileCompleted { .. }) => Step::Ignore("没有运行中的批次"),

        (_, Event::AutomatorError { message }) | (_, Event::ExternalError { message }) => {
            Step::Enter(Phase::Failed(message.clone()))
        }
    };
    Ok(step)
}
