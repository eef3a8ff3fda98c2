//! quickly 命令行：解析参数、初始化日志、驱动进度条并执行一次传输。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use quickly::default_output_path;
use quickly::transfer::{
    HookAbort, TransferCoordinator, TransferHook, TransferProgress, TransferState,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS,
};

const PB_STYLE: &str = "{spinner:.cyan} {bar:40.cyan/blue} {percent:>3}% | {bytes}/{total_bytes} | {msg}";

#[derive(Debug, Parser)]
#[command(name = "quickly", version, about = "⚡ 多连接下载器")]
struct Cli {
    /// 文件 URL
    url: String,

    /// 输出文件名；省略时取 URL 路径的最后一段
    output: Option<PathBuf>,

    /// 每个分片的最大尝试次数
    #[arg(short, long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    retries: usize,

    /// 同时进行的最大连接数
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    connections: usize,

    /// 分片大小（MB）
    #[arg(long, default_value_t = 100)]
    chunk_size_mib: u64,

    /// 输出详细日志
    #[arg(short, long)]
    verbose: bool,
}

/// 把传输进度画到终端进度条上。
struct ProgressBarHook {
    bar: ProgressBar,
}

#[async_trait]
impl TransferHook for ProgressBarHook {
    async fn before_start(&self, total_size: u64) -> Result<(), HookAbort> {
        self.bar.set_length(total_size);
        self.bar
            .println(format!("📦 文件大小: {}", HumanBytes(total_size)));
        Ok(())
    }

    fn on_state(&self, state: &TransferState) {
        match state {
            TransferState::SingleStream => self
                .bar
                .println("⚠ 服务器不支持 Range 请求，改用单连接下载"),
            TransferState::Chunked { chunks } => self
                .bar
                .println(format!("支持 Range，共 {} 个分片", chunks)),
            TransferState::Merging => self.bar.set_message("🔗 合并分片…"),
            _ => {}
        }
    }

    fn on_bytes(&self, _delta: u64, progress: &TransferProgress) {
        self.bar.set_position(progress.bytes_transferred);
        let eta = progress
            .eta()
            .map(|d| HumanDuration(d).to_string())
            .unwrap_or_else(|| "∞".to_string());
        self.bar.set_message(format!(
            "{}/s | ETA {}",
            HumanBytes(progress.rate() as u64),
            eta
        ));
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_directive = if verbose { "quickly=debug" } else { "quickly=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let output = cli
        .output
        .unwrap_or_else(|| default_output_path(&cli.url));

    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
        bar.set_style(style.progress_chars("█▓░"));
    }

    let coordinator = TransferCoordinator::new(cli.url.as_str())
        .save_to(&output)
        .max_attempts(cli.retries)
        .concurrency(cli.connections)
        .chunk_size(cli.chunk_size_mib.saturating_mul(1024 * 1024))
        .with_hook(ProgressBarHook { bar: bar.clone() });

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到中断信号，正在停止；已下载的分片会保留以便续传");
            cancel.cancel();
        }
    });

    let result = coordinator
        .run()
        .await
        .with_context(|| format!("下载 {} 失败", cli.url));
    match result {
        Ok(outcome) => {
            bar.finish_and_clear();
            println!("🎉 下载完成: {}", outcome.path().display());
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("初始化日志失败: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n{}", e);
            // 库错误的显示文本已包含下层原因，只取第一层
            if let Some(cause) = e.chain().nth(1) {
                eprintln!("原因: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
