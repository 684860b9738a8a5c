use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// 发布时选择的公开范围
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// 发布层中对应单选框的选择器
    pub fn radio_selector(&self) -> &'static str {
        match self {
            Visibility::Public => "input#open20",
            Visibility::Protected => "input#open15",
            Visibility::Private => "input#open0",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标网站域名（按后缀匹配）
    pub target_site: String,
    /// 网站首页
    pub home_url: String,
    /// 直接打开写作页面的地址，为空时通过页面上的“写文章”链接进入
    pub composer_url: String,
    /// 写作页面的路径特征
    pub composer_path: String,
    /// 会话状态文件
    pub store_path: String,
    /// 默认的 HTML 上传目录
    pub upload_folder: String,
    /// 发布时的公开范围
    pub visibility: Visibility,
    /// 发布后跳转的页面，为空则不跳转
    pub post_publish_url: String,
    /// 每个界面操作之间的间隔（毫秒）
    pub step_delay_ms: u64,
    /// 点击发布后等待服务器响应的时间（毫秒）
    pub publish_settle_ms: u64,
    /// 等待页面元素时的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 2001,
            target_site: "tistory.com".to_string(),
            home_url: "https://www.tistory.com".to_string(),
            composer_url: String::new(),
            composer_path: "/manage/newpost".to_string(),
            store_path: "auto_poster_state.json".to_string(),
            upload_folder: "upload_html".to_string(),
            visibility: Visibility::Public,
            post_publish_url: "https://www.tistory.com".to_string(),
            step_delay_ms: 300,
            publish_settle_ms: 5000,
            poll_interval_ms: 100,
            verbose_logging: false,
            output_log_file: "posting_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> AppResult<Self> {
        Self::default().apply_env()
    }

    /// 默认值 + TOML 文件（可选）+ 环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.apply_env()
    }

    /// 从 TOML 文件读取配置，未出现的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    fn apply_env(self) -> AppResult<Self> {
        let visibility = match std::env::var("POST_VISIBILITY") {
            Ok(value) => Visibility::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                field: "POST_VISIBILITY".to_string(),
                value,
            })?,
            Err(_) => self.visibility,
        };

        Ok(Self {
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", self.browser_debug_port)?,
            target_site: std::env::var("TARGET_SITE").unwrap_or(self.target_site),
            home_url: std::env::var("HOME_URL").unwrap_or(self.home_url),
            composer_url: std::env::var("COMPOSER_URL").unwrap_or(self.composer_url),
            composer_path: std::env::var("COMPOSER_PATH").unwrap_or(self.composer_path),
            store_path: std::env::var("STORE_PATH").unwrap_or(self.store_path),
            upload_folder: std::env::var("UPLOAD_FOLDER").unwrap_or(self.upload_folder),
            visibility,
            post_publish_url: std::env::var("POST_PUBLISH_URL").unwrap_or(self.post_publish_url),
            step_delay_ms: env_parse("STEP_DELAY_MS", self.step_delay_ms)?,
            publish_settle_ms: env_parse("PUBLISH_SETTLE_MS", self.publish_settle_ms)?,
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", self.poll_interval_ms)?,
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        })
    }

    /// 判断 URL 是否属于目标网站
    pub fn is_target_site(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let site = self.target_site.trim().trim_matches('.').to_ascii_lowercase();
        parsed
            .host_str()
            .map(|host| host == site || host.ends_with(&format!(".{}", site)))
            .unwrap_or(false)
    }

    /// 判断 URL 是否是写作页面（只看路径，不看查询参数）
    pub fn is_composer_url(&self, url: &str) -> bool {
        if !self.is_target_site(url) {
            return false;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let composer = self.composer_path.trim_end_matches('/');
        let path = parsed.path();
        path == composer
            || path
                .strip_prefix(composer)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// 发布后跳转的地址
    pub fn post_publish_target(&self) -> Option<&str> {
        let url = self.post_publish_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
        Err(_) => Ok(default),
    }
}
