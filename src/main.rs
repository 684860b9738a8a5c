use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use auto_poster::orchestrator::{App, ConsoleStatus, OperatorConsole};
use auto_poster::store::{JsonFileStore, SessionStore};
use auto_poster::utils::logging;
use auto_poster::Config;

/// 把一批 HTML 文件依次发布到博客
#[derive(Parser, Debug)]
#[command(name = "auto_poster", version, about)]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long, global = true, env = "AUTO_POSTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 载入 HTML 文件（或目录），替换当前批次
    Load {
        /// 文件或目录，缺省时使用配置中的上传目录
        paths: Vec<PathBuf>,
    },
    /// 在当前标签页中开始发布已载入的批次
    Start,
    /// 载入后立即开始发布
    Post {
        paths: Vec<PathBuf>,
    },
    /// 继续上一次中断的发布
    Resume,
    /// 显示当前会话和批次
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let store: Arc<dyn SessionStore> = Arc::new(JsonFileStore::new(&config.store_path));
    let console = OperatorConsole::new(store);

    let status = match cli.command {
        Command::Load { paths } => {
            load(&console, &config, paths).await?;
            return Ok(());
        }
        Command::Status => {
            println!("{}", console.status().await?);
            return Ok(());
        }
        Command::Start => App::initialize(config).await?.run_posting().await?,
        Command::Post { paths } => {
            load(&console, &config, paths).await?;
            App::initialize(config).await?.run_posting().await?
        }
        Command::Resume => App::initialize(config).await?.resume().await?,
    };

    if let ConsoleStatus::Error(message) = status {
        bail!(message);
    }
    Ok(())
}

async fn load(console: &OperatorConsole, config: &Config, paths: Vec<PathBuf>) -> Result<()> {
    let paths = if paths.is_empty() {
        vec![PathBuf::from(&config.upload_folder)]
    } else {
        paths
    };

    let report = console.load(&paths).await?;
    if report.accepted == 0 {
        bail!(report.message());
    }
    Ok(())
}
