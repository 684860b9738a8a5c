//! 可重试一次的投递
//!
//! 所有“发消息给页面”的地方都走这里：尝试投递，若对方不在线，
//! 执行一次恢复动作（重新注入）后再试一次，仍失败则放弃。

use std::future::Future;

use thiserror::Error;
use tracing::{debug, warn};

use super::{Delivery, PageLink};

/// 投递失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// 页面中没有接收方（页面刚导航、脚本未注入或代理任务已退出）
    #[error("页面中没有消息接收方")]
    NoReceiver,
    /// 打开写作页面失败
    #[error("页面导航失败: {0}")]
    Navigation(String),
    /// 与浏览器通信失败
    #[error("页面脚本执行失败: {0}")]
    Script(String),
}

/// 尝试 → 对方不在线时恢复一次 → 再试
///
/// 只有 `NoReceiver` 会触发恢复，其他错误直接返回。
pub async fn retry_once_after_recovery<A, AFut, R, RFut>(
    mut attempt: A,
    recover: R,
) -> Result<(), DeliveryError>
where
    A: FnMut() -> AFut,
    AFut: Future<Output = Result<(), DeliveryError>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<(), DeliveryError>>,
{
    match attempt().await {
        Err(DeliveryError::NoReceiver) => {
            warn!("页面没有接收方，尝试重新注入...");
            recover().await?;
            debug!("重新注入完成，重新投递");
            attempt().await
        }
        other => other,
    }
}

/// 把一个文档投递给页面代理
pub async fn deliver_with_recovery<L>(link: &L, delivery: &Delivery) -> Result<(), DeliveryError>
where
    L: PageLink + ?Sized,
{
    retry_once_after_recovery(move || link.deliver(delivery), move || link.reinject()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_success_needs_no_recovery() {
        let recovered = AtomicUsize::new(0);
        let result = retry_once_after_recovery(
            || async { Ok(()) },
            || {
                recovered.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;
        assert_eq!(result, Ok(()));
        assert_eq!(recovered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recovers_once_then_succeeds() {
        let attempts = AtomicUsize::new(0);
        let result = retry_once_after_recovery(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(DeliveryError::NoReceiver)
                    } else {
                        Ok(())
                    }
                }
            },
            || async { Ok(()) },
        )
        .await;
        assert_eq!(result, Ok(()));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_second_miss() {
        let attempts = AtomicUsize::new(0);
        let result = retry_once_after_recovery(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(DeliveryError::NoReceiver) }
            },
            || async { Ok(()) },
        )
        .await;
        assert_eq!(result, Err(DeliveryError::NoReceiver));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_recovery_is_returned() {
        let result = retry_once_after_recovery(
            || async { Err(DeliveryError::NoReceiver) },
            || async { Err(DeliveryError::Script("boom".into())) },
        )
        .await;
        assert_eq!(result, Err(DeliveryError::Script("boom".into())));
    }

    #[tokio::test]
    async fn test_other_errors_skip_recovery() {
        let recovered = AtomicUsize::new(0);
        let result = retry_once_after_recovery(
            || async { Err(DeliveryError::Navigation("gone".into())) },
            || {
                recovered.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;
        assert_eq!(result, Err(DeliveryError::Navigation("gone".into())));
        assert_eq!(recovered.load(Ordering::SeqCst), 0);
    }
}
