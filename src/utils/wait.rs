//! 有上限的等待
//!
//! 反复调用探测函数，直到它返回 `Some` 或超过时限。探测至少执行一次。

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};

/// 等待失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError<E> {
    /// 超时，条件始终未满足
    #[error("等待超时 ({0:?})")]
    Timeout(Duration),
    /// 探测本身出错
    #[error("探测失败: {0}")]
    Probe(E),
}

/// 轮询 `probe` 直到返回 `Some(value)`
pub async fn wait_until<T, E, F, Fut>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await.map_err(WaitError::Probe)? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout(timeout));
        }
        sleep(interval.min(deadline - now)).await;
    }
}
