//! 编辑器操作 - 业务能力层
//!
//! 只负责"在页面上找到元素并操作它"的能力，不关心发布流程的顺序。
//! 页面侧的辅助函数由 `BOOTSTRAP_SCRIPT` 注入到 `window.__autoPoster`，
//! 页面一旦导航就会丢失，需要重新注入。

use std::time::Duration;

use tracing::debug;

use crate::error::{AppError, PostingError};
use crate::infrastructure::JsExecutor;
use crate::utils::{wait_until, WaitError};

/// 注入到页面中的辅助脚本
pub const BOOTSTRAP_SCRIPT: &str = r#"
(() => {
    const fire = (el) => {
        el.dispatchEvent(new Event("input", { bubbles: true }));
        el.dispatchEvent(new Event("change", { bubbles: true }));
    };
    window.__autoPoster = {
        version: 1,
        exists(selector) {
            return document.querySelector(selector) !== null;
        },
        click(selector) {
            const el = document.querySelector(selector);
            if (!el) return false;
            el.click();
            return true;
        },
        fill(selector, value) {
            const el = document.querySelector(selector);
            if (!el) return false;
            el.value = value;
            fire(el);
            return true;
        },
        fillWithin(containerSelector, innerSelector, value) {
            const container = document.querySelector(containerSelector);
            if (!container) return false;
            const el = container.querySelector(innerSelector);
            if (!el) return false;
            el.value = value;
            fire(el);
            return true;
        },
        appendToFrame(frameSelector, html) {
            const frame = document.querySelector(frameSelector);
            if (!frame) return false;
            const doc = frame.contentDocument || (frame.contentWindow && frame.contentWindow.document);
            if (!doc || !doc.body) return false;
            doc.body.innerHTML += html;
            return true;
        },
        linkHref(selector) {
            const el = document.querySelector(selector);
            return el && el.href ? el.href : null;
        }
    };
    return true;
})()
"#;

/// 检查辅助脚本是否仍在页面中
pub const PROBE_SCRIPT: &str =
    "typeof window.__autoPoster === 'object' && window.__autoPoster !== null";

/// 编辑器操作
pub struct EditorDriver<'a> {
    executor: &'a JsExecutor,
    poll_interval: Duration,
}

impl<'a> EditorDriver<'a> {
    pub fn new(executor: &'a JsExecutor, poll_interval: Duration) -> Self {
        Self {
            executor,
            poll_interval,
        }
    }

    /// 当前页面地址
    pub async fn current_url(&self) -> Result<String, PostingError> {
        self.executor
            .current_url()
            .await
            .map(|url| url.unwrap_or_default())
            .map_err(script_error)
    }

    /// 等待元素出现，超时返回 `UiElementNotFound(name)`
    pub async fn wait_for(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), PostingError> {
        let script = helper_call("exists", &[selector])?;
        let script = script.as_str();
        let executor = self.executor;
        debug!("等待元素 {} ({})", name, selector);

        wait_until(
            move || async move {
                let present: bool = executor.eval_as(script).await?;
                Ok::<_, AppError>(present.then_some(()))
            },
            self.poll_interval,
            timeout,
        )
        .await
        .map_err(|e| match e {
            WaitError::Timeout(_) => PostingError::UiElementNotFound {
                name: name.to_string(),
            },
            WaitError::Probe(e) => script_error(e),
        })
    }

    /// 等待元素出现后点击
    pub async fn click(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), PostingError> {
        self.wait_for(selector, name, timeout).await?;
        self.call_expecting_true(helper_call("click", &[selector])?, name)
            .await
    }

    /// 等待输入框出现后写入值，并触发 input / change 事件
    pub async fn fill(
        &self,
        selector: &str,
        value: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), PostingError> {
        self.wait_for(selector, name, timeout).await?;
        self.call_expecting_true(helper_call("fill", &[selector, value])?, name)
            .await
    }

    /// 等待容器出现后写入其中的输入框
    pub async fn fill_within(
        &self,
        container: &str,
        inner: &str,
        value: &str,
        container_name: &str,
        inner_name: &str,
        timeout: Duration,
    ) -> Result<(), PostingError> {
        self.wait_for(container, container_name, timeout).await?;
        self.call_expecting_true(
            helper_call("fillWithin", &[container, inner, value])?,
            inner_name,
        )
        .await
    }

    /// 等待 iframe 出现后把 HTML 追加到其 body 末尾
    pub async fn append_to_frame(
        &self,
        frame: &str,
        html: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), PostingError> {
        self.wait_for(frame, name, timeout).await?;
        self.call_expecting_true(helper_call("appendToFrame", &[frame, html])?, name)
            .await
    }

    /// 读取链接的 href
    pub async fn link_href(&self, selector: &str) -> Result<Option<String>, PostingError> {
        self.executor
            .eval_as(helper_call("linkHref", &[selector])?)
            .await
            .map_err(script_error)
    }

    async fn call_expecting_true(&self, script: String, name: &str) -> Result<(), PostingError> {
        let done: bool = self.executor.eval_as(script).await.map_err(script_error)?;
        if done {
            Ok(())
        } else {
            Err(PostingError::UiElementNotFound {
                name: name.to_string(),
            })
        }
    }
}

/// 生成调用辅助函数的脚本，参数经 JSON 转义
fn helper_call(function: &str, args: &[&str]) -> Result<String, PostingError> {
    let args = args
        .iter()
        .map(|arg| serde_json::to_string(arg))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PostingError::PageScript {
            reason: e.to_string(),
        })?;
    Ok(format!(
        "window.__autoPoster.{}({})",
        function,
        args.join(", ")
    ))
}

fn script_error(err: impl std::fmt::Display) -> PostingError {
    PostingError::PageScript {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_call_escapes_arguments() {
        let script = helper_call("fill", &["textarea#post-title-inp", "say \"hi\"\n</script>"]).unwrap();
        assert_eq!(
            script,
            r#"window.__autoPoster.fill("textarea#post-title-inp", "say \"hi\"\n</script>")"#
        );
    }

    #[test]
    fn test_bootstrap_defines_every_helper() {
        for helper in ["exists", "click", "fill", "fillWithin", "appendToFrame", "linkHref"] {
            assert!(
                BOOTSTRAP_SCRIPT.contains(&format!("{}(", helper)),
                "missing helper {}",
                helper
            );
        }
    }
}
