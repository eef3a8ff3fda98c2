//! 分片下载入口：切分、续上次中断的合并、并发下载、按序合并与清理。

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::structs::segment_artifact::{remove_segments, segment_paths};
use crate::internal::transfer::structs::{
    ProgressTracker, TransferConfig, TransferDescriptor, TransferError, TransferState,
};

use super::super::merge::{detect_merged_prefix, merge_segments, MergeParams};
use super::super::partitioner::partition;
use super::super::StateReporter;
use super::chunk_fetcher::{fetch_chunk, ChunkFetchParams};
use super::worker_pool::{run_all, TransferTask};

/// 分片下载入口的参数。
pub struct RunChunkedTransferParams<'a> {
    pub client: &'a Client,
    pub descriptor: &'a TransferDescriptor,
    pub config: &'a TransferConfig,
    pub transfer_id: &'a str,
    pub tracker: Arc<ProgressTracker>,
    pub cancel: &'a CancellationToken,
    pub reporter: &'a StateReporter,
}

/// 分片下载：成功时返回分片总数。
///
/// 任一分片最终失败时删除本次传输的全部临时文件，输出文件不被触碰；
/// 外部取消时保留临时文件，供下次运行续传。
pub async fn run_chunked_transfer(params: RunChunkedTransferParams<'_>) -> Result<usize, TransferError> {
    let config = params.config;
    let chunks = partition(params.descriptor.total_size, config.chunk_size);
    let work_dir = config.resolved_work_dir();
    tokio::fs::create_dir_all(&work_dir)
        .await
        .map_err(TransferError::CreateFile)?;
    let segments = segment_paths(&work_dir, params.transfer_id, &chunks);

    let merged = detect_merged_prefix(&config.save_path, &chunks, &segments).await;
    if merged > 0 {
        tracing::info!(merged, "检测到上次中断的合并，跳过已合并的分片");
        params.tracker.record(chunks[merged - 1].end_offset + 1);
    }

    tracing::info!(
        transfer_id = params.transfer_id,
        chunks = chunks.len(),
        concurrency = config.concurrency,
        "支持 Range，开始分片下载"
    );
    params.reporter.set(TransferState::Chunked {
        chunks: chunks.len(),
    });

    let tasks: Vec<TransferTask<PathBuf>> = chunks[merged..]
        .iter()
        .map(|chunk| {
            let chunk = *chunk;
            let client = params.client.clone();
            let url = params.descriptor.url.clone();
            let work_dir = work_dir.clone();
            let transfer_id = params.transfer_id.to_string();
            let tracker = Arc::clone(&params.tracker);
            let cancel = params.cancel.clone();
            let max_attempts = config.max_attempts;
            let retry_delay = config.retry_delay;
            let header_timeout = config.header_timeout;
            let read_timeout = config.read_timeout;

            let task: TransferTask<PathBuf> = Box::new(move || {
                async move {
                    fetch_chunk(ChunkFetchParams {
                        client: &client,
                        url: &url,
                        work_dir: &work_dir,
                        transfer_id: &transfer_id,
                        chunk,
                        max_attempts,
                        retry_delay,
                        header_timeout,
                        read_timeout,
                        tracker: &tracker,
                        cancel: &cancel,
                    })
                    .await
                }
                .boxed()
            });
            task
        })
        .collect();

    let fetched = match run_all(tasks, config.concurrency, params.cancel.clone()).await {
        Ok(paths) => paths,
        Err(TransferError::Cancelled) => {
            tracing::info!("传输已取消，保留分片临时文件以便续传");
            return Err(TransferError::Cancelled);
        }
        Err(e) => {
            tracing::error!(error = %e, "分片下载失败，清理临时文件");
            remove_segments(&segments).await;
            return Err(e);
        }
    };

    params.reporter.set(TransferState::Merging);
    tracing::info!(output = %config.save_path.display(), "合并分片");
    merge_segments(MergeParams {
        output: &config.save_path,
        segments: &fetched,
        append: merged > 0,
    })
    .await?;

    Ok(chunks.len())
}
