use async_trait::async_trait;

use super::{Delivery, DeliveryError};
use crate::models::PageContext;

/// 协调器看到的页面
///
/// 协调器不能直接操作页面，只能通过这个接口：查询当前标签页、
/// 请求页面打开新的写作页面、投递任务、重新注入页面代理。
#[async_trait]
pub trait PageLink: Send + Sync {
    /// 当前操作的标签页，没有则返回 `None`
    async fn active_context(&self) -> Result<Option<PageContext>, DeliveryError>;

    /// 让页面进入一个新的写作页面，并等待其加载完成
    async fn open_composer(&self) -> Result<(), DeliveryError>;

    /// 投递一个文档；`Ok` 只表示页面已接收，不表示已发布
    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError>;

    /// 在页面中重新建立页面代理
    async fn reinject(&self) -> Result<(), DeliveryError>;
}
