//! HTML 文件读取
//!
//! 相当于上传面板：按扩展名过滤、按选择顺序读取内容、统计被排除的文件

use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, FileError};
use crate::models::Document;

/// 文件筛选结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeReport {
    /// 选择的文件总数
    pub total: usize,
    /// 通过扩展名检查的文件数
    pub accepted: usize,
    /// 被排除的文件数
    pub rejected: usize,
}

impl IntakeReport {
    /// 面向操作者的提示信息
    pub fn message(&self) -> String {
        if self.total == 0 {
            "没有选择任何文件，请选择 HTML 文件。".to_string()
        } else if self.accepted == 0 {
            "只能上传扩展名为 .html / .htm 的文件。".to_string()
        } else if self.rejected > 0 {
            format!(
                "共 {} 个文件中有 {} 个不是 HTML，已被排除。",
                self.total, self.rejected
            )
        } else {
            format!("已选择 {} 个 HTML 文件。", self.accepted)
        }
    }
}

/// 展开输入路径：文件保持原顺序，目录按文件名排序后展开（不递归）
pub async fn collect_html_paths(inputs: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.exists() {
            return Err(AppError::File(FileError::NotFound {
                path: input.display().to_string(),
            }));
        }

        if input.is_dir() {
            let mut entries = fs::read_dir(input)
                .await
                .map_err(|e| AppError::file_read_failed(input.display().to_string(), e))?;
            let mut children = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_file() {
                    children.push(path);
                }
            }
            children.sort();
            debug!("目录 {} 中有 {} 个文件", input.display(), children.len());
            paths.extend(children);
        } else {
            paths.push(input.clone());
        }
    }

    Ok(paths)
}

/// 只保留 .html / .htm 文件（不区分大小写）
pub fn filter_html_files(paths: Vec<PathBuf>) -> AppResult<(Vec<PathBuf>, IntakeReport)> {
    let html_ext = Regex::new(r"(?i)\.html?$").map_err(|e| AppError::Other(e.to_string()))?;
    let total = paths.len();

    let accepted: Vec<PathBuf> = paths
        .into_iter()
        .filter(|path| {
            let keep = path
                .file_name()
                .map(|name| html_ext.is_match(&name.to_string_lossy()))
                .unwrap_or(false);
            if !keep {
                warn!("跳过非 HTML 文件: {}", path.display());
            }
            keep
        })
        .collect();

    let report = IntakeReport {
        total,
        accepted: accepted.len(),
        rejected: total - accepted.len(),
    };
    Ok((accepted, report))
}

/// 按顺序读取文件内容，并输出读取进度
pub async fn read_documents(paths: &[PathBuf]) -> AppResult<Vec<Document>> {
    let total = paths.len();
    let mut documents = Vec::with_capacity(total);

    for (i, path) in paths.iter().enumerate() {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        documents.push(Document::new(file_name_of(path), content));

        let percent = ((i + 1) * 100 + total / 2) / total;
        info!("📄 读取进度 {}% ({}/{}): {}", percent, i + 1, total, path.display());
    }

    Ok(documents)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_html_files_counts_rejections() {
        let paths = vec![
            PathBuf::from("a.html"),
            PathBuf::from("b.HTM"),
            PathBuf::from("notes.txt"),
            PathBuf::from("c.html.bak"),
        ];
        let (accepted, report) = filter_html_files(paths).unwrap();
        assert_eq!(accepted, vec![PathBuf::from("a.html"), PathBuf::from("b.HTM")]);
        assert_eq!(
            report,
            IntakeReport {
                total: 4,
                accepted: 2,
                rejected: 2
            }
        );
        assert_eq!(report.message(), "共 4 个文件中有 2 个不是 HTML，已被排除。");
    }

    #[test]
    fn test_intake_messages() {
        assert_eq!(
            IntakeReport::default().message(),
            "没有选择任何文件，请选择 HTML 文件。"
        );
        let none_html = IntakeReport {
            total: 2,
            accepted: 0,
            rejected: 2,
        };
        assert_eq!(none_html.message(), "只能上传扩展名为 .html / .htm 的文件。");
    }

    #[tokio::test]
    async fn test_collect_and_read_keeps_selection_order() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("batch");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("02.html"), "<h1>B</h1>").unwrap();
        std::fs::write(folder.join("01.html"), "<h1>A</h1>").unwrap();
        let single = dir.path().join("zz.html");
        std::fs::write(&single, "<h1>Z</h1>").unwrap();

        let paths = collect_html_paths(&[single.clone(), folder.clone()]).await.unwrap();
        assert_eq!(paths, vec![single, folder.join("01.html"), folder.join("02.html")]);

        let documents = read_documents(&paths).await.unwrap();
        let names: Vec<_> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zz.html", "01.html", "02.html"]);
        assert_eq!(documents[1].content, "<h1>A</h1>");
    }

    #[tokio::test]
    async fn test_collect_missing_path_fails() {
        let result = collect_html_paths(&[PathBuf::from("/definitely/not/here.html")]).await;
        assert!(matches!(
            result,
            Err(AppError::File(FileError::NotFound { .. }))
        ));
    }
}
