//! 日志工具模块
//!
//! 提供日志初始化和常用日志输出的辅助函数

use std::fs;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};

/// 初始化 tracing 订阅器
///
/// 优先使用 `RUST_LOG`，否则根据 `verbose` 选择 debug / info。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("auto_poster={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n发布日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(port: u16, target_site: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量 HTML 发布模式");
    info!("🌐 目标网站: {}", target_site);
    info!("🔌 浏览器调试端口: {}", port);
    info!("{}", "=".repeat(60));
}

/// 记录批次加载信息
pub fn log_documents_loaded(total: usize, names: &[&str]) {
    info!("✓ 共 {} 个待发布的 HTML 文件", total);
    for (i, name) in names.iter().enumerate() {
        info!("  {}. {}", i + 1, name);
    }
}

/// 打印最终结果
///
/// # 参数
/// - `outcome`: 结束时显示给操作者的消息
/// - `success`: 是否全部完成
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(outcome: &str, success: bool, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 发布结束");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    if success {
        info!("✅ {}", outcome);
    } else {
        info!("❌ {}", outcome);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("제목 없음", 2), "제목...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        init_log_file(path.to_str().unwrap()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("发布日志"));
    }
}
