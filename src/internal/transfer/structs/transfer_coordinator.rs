//! 传输协调器
//!
//! 本模块把一次远程文件下载编排为：探测 → 单连接 / 分片并发 → 合并 → 完成。
//!
//! ## 功能特性
//!
//! - **Range 探测**：以 `Range: bytes=0-0` 获取文件大小并判断是否支持分片
//! - **分片并发下载**：固定大小分片，最多 `concurrency` 个同时请求，结果按分片序号合并
//! - **断点续传**：分片临时文件的存在与大小即为续传依据；合并中断后也能续上
//! - **有限重试**：每个分片最多尝试 `max_attempts` 次，用尽即整体失败并清理临时文件
//! - **单连接回退**：服务器不支持 Range 时整文件流式下载
//! - **响应式进度**：通过 `progress()` / `state()` 监听进度与状态
//! - **钩子机制**：在开始前、状态变化、收到数据、完成后插入自定义逻辑
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! # use quickly::transfer::TransferCoordinator;
//! # async fn example() -> Result<(), quickly::transfer::TransferError> {
//! let outcome = TransferCoordinator::new("https://example.com/large.iso")
//!     .save_to("large.iso")
//!     .max_attempts(3)
//!     .concurrency(5)
//!     .run()
//!     .await?;
//! println!("已保存 {} 字节", outcome.bytes());
//! # Ok(())
//! # }
//! ```

pub mod body_stream;
pub mod chunked_transfer;
pub mod merge;
pub mod partitioner;
pub mod range_probe;
pub mod single_stream;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::traits::transfer_hook::{HookAbort, TransferHook};

use super::hook_adapters::{AfterCompleteHookAdapter, BeforeStartHookAdapter, OnProgressHookAdapter};
use super::progress_tracker::ProgressTracker;
use super::segment_artifact::transfer_id;
use super::transfer_config::TransferConfig;
use super::transfer_descriptor::TransferDescriptor;
use super::transfer_error::TransferError;
use super::transfer_hooks_container::TransferHooksContainer;
use super::transfer_outcome::TransferOutcome;
use super::transfer_progress::TransferProgress;
use super::transfer_state::TransferState;
use chunked_transfer::{run_chunked_transfer, RunChunkedTransferParams};
use range_probe::{probe, ProbeParams};
use single_stream::{run_single_stream, SingleStreamParams};

/// 状态发布：写入 watch 通道、通知钩子并记录日志。
pub(crate) struct StateReporter {
    sender: watch::Sender<TransferState>,
    hooks: Arc<TransferHooksContainer>,
}

impl StateReporter {
    pub(crate) fn set(&self, state: TransferState) {
        if state.is_terminal() {
            tracing::info!(?state, "传输结束");
        } else {
            tracing::debug!(?state, "传输状态变化");
        }
        self.hooks.run_on_state(&state);
        self.sender.send_replace(state);
    }
}

/// 传输协调器：一次远程文件下载的配置与执行入口。
///
/// 链式配置后调用 [`TransferCoordinator::run`]；`run` 消耗协调器，同一个协调器只执行一次。
pub struct TransferCoordinator {
    url: String,
    client: Option<Client>,
    config: TransferConfig,
    hooks: TransferHooksContainer,
    progress_sender: watch::Sender<TransferProgress>,
    state_sender: watch::Sender<TransferState>,
    cancel: CancellationToken,
}

impl TransferCoordinator {
    pub fn new(url: impl Into<String>) -> Self {
        let (progress_sender, _) = watch::channel(TransferProgress::default());
        let (state_sender, _) = watch::channel(TransferState::Probing);
        Self {
            url: url.into(),
            client: None,
            config: TransferConfig::default(),
            hooks: TransferHooksContainer::default(),
            progress_sender,
            state_sender,
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部构建的 HTTP 客户端；此时 `connect_timeout` 由该客户端自己决定。
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// 设置保存路径。
    pub fn save_to(mut self, path: impl AsRef<Path>) -> Self {
        self.config.save_path = path.as_ref().to_path_buf();
        self
    }

    /// 设置分片临时文件所在目录；默认为保存路径所在目录。
    pub fn work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// 设置分片大小（字节）。
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// 设置每个分片最多尝试几次（含首次）。
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// 设置最大并发分片数。
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// 设置分片请求与单连接下载等待响应头的超时。
    pub fn header_timeout(mut self, timeout: Duration) -> Self {
        self.config.header_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// 指定传输标识（决定临时文件名）；默认由 URL、文件大小与分片大小生成。
    pub fn transfer_id(mut self, id: impl Into<String>) -> Self {
        self.config.transfer_id = Some(id.into());
        self
    }

    /// 注册「开始前」钩子；闭包参数为文件总大小，返回 `Err(HookAbort)` 会中止本次传输。
    pub fn with_before_start_hook<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), HookAbort>> + Send + 'static,
    {
        self.hooks.add(BeforeStartHookAdapter(f));
        self
    }

    /// 注册「收到数据」钩子；参数为新增字节数与累加后的进度快照。
    pub fn with_on_progress_hook<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &TransferProgress) + Send + Sync + 'static,
    {
        self.hooks.add(OnProgressHookAdapter(f));
        self
    }

    /// 注册「完成后」钩子；传输成功结束后调用。
    pub fn with_after_complete_hook<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.hooks.add(AfterCompleteHookAdapter(f));
        self
    }

    /// 添加完整钩子。
    pub fn with_hook(mut self, hook: impl TransferHook + 'static) -> Self {
        self.hooks.add(hook);
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// 进度监听句柄；`changed().await` 后读取最新快照。
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress_sender.subscribe()
    }

    /// 状态监听句柄。
    pub fn state(&self) -> watch::Receiver<TransferState> {
        self.state_sender.subscribe()
    }

    /// 取消句柄：触发后不再领取新分片，进行中的请求尽快结束；分片临时文件保留以便续传。
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 执行传输。
    pub async fn run(self) -> Result<TransferOutcome, TransferError> {
        self.config.validate()?;

        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .connect_timeout(self.config.connect_timeout)
                .build()?,
        };
        let hooks = Arc::new(self.hooks);
        let reporter = StateReporter {
            sender: self.state_sender,
            hooks: Arc::clone(&hooks),
        };
        let config = self.config;
        let cancel = self.cancel;

        reporter.set(TransferState::Probing);
        let descriptor = match probe(ProbeParams {
            client: &client,
            url: &self.url,
            timeout: config.probe_timeout,
        })
        .await
        {
            Ok(d) => d,
            Err(e) => {
                reporter.set(TransferState::Failed);
                return Err(e);
            }
        };

        let tracker = Arc::new(ProgressTracker::new(
            descriptor.total_size,
            self.progress_sender,
            Arc::clone(&hooks),
        ));

        if let Err(abort) = hooks.run_before_start(descriptor.total_size).await {
            reporter.set(TransferState::Failed);
            return Err(abort.into());
        }

        let result = transfer(TransferParams {
            client: &client,
            descriptor: &descriptor,
            config: &config,
            tracker,
            cancel: &cancel,
            reporter: &reporter,
        })
        .await;

        match result {
            Ok(outcome) => {
                reporter.set(TransferState::Done);
                hooks.run_after_complete().await;
                tracing::info!(
                    path = %outcome.path().display(),
                    bytes = outcome.bytes(),
                    "下载完成"
                );
                Ok(outcome)
            }
            Err(e) => {
                reporter.set(TransferState::Failed);
                Err(e)
            }
        }
    }
}

struct TransferParams<'a> {
    client: &'a Client,
    descriptor: &'a TransferDescriptor,
    config: &'a TransferConfig,
    tracker: Arc<ProgressTracker>,
    cancel: &'a CancellationToken,
    reporter: &'a StateReporter,
}

/// 按探测结果选择零长度、单连接或分片路径。
async fn transfer(params: TransferParams<'_>) -> Result<TransferOutcome, TransferError> {
    let config = params.config;
    let descriptor = params.descriptor;
    let path = config.save_path.clone();

    if descriptor.total_size == 0 {
        tracing::info!("远程文件为空，直接创建空文件");
        tokio::fs::File::create(&path)
            .await
            .map_err(TransferError::CreateFile)?;
        return Ok(TransferOutcome::Empty { path });
    }

    if !descriptor.supports_range {
        tracing::warn!("服务器不支持 Range 请求，改用单连接下载");
        params.reporter.set(TransferState::SingleStream);
        let bytes = run_single_stream(SingleStreamParams {
            client: params.client,
            url: &descriptor.url,
            save_path: &path,
            total_size: descriptor.total_size,
            header_timeout: config.header_timeout,
            read_timeout: config.read_timeout,
            tracker: &params.tracker,
            cancel: params.cancel,
        })
        .await?;
        return Ok(TransferOutcome::SingleStream { path, bytes });
    }

    let id = config
        .transfer_id
        .clone()
        .unwrap_or_else(|| transfer_id(&descriptor.url, descriptor.total_size, config.chunk_size));
    let chunks = run_chunked_transfer(RunChunkedTransferParams {
        client: params.client,
        descriptor,
        config,
        transfer_id: &id,
        tracker: Arc::clone(&params.tracker),
        cancel: params.cancel,
        reporter: params.reporter,
    })
    .await?;

    Ok(TransferOutcome::Chunked {
        path,
        bytes: descriptor.total_size,
        chunks,
    })
}
