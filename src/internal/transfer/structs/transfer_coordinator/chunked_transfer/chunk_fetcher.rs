//! 分片下载：单个分片的完整流程（续传检查、有限次重试、返回临时文件路径）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::structs::segment_artifact::segment_path;
use crate::internal::transfer::structs::{ChunkDescriptor, ProgressTracker, TransferError};

use super::download_one_range::{download_one_range, DownloadOneRangeParams};
use super::resume::{inspect_segment, ChunkResumeOutcome};

/// 下载单个分片的参数（形参超过 3 个，用 struct 承载）。
pub struct ChunkFetchParams<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    pub work_dir: &'a Path,
    pub transfer_id: &'a str,
    pub chunk: ChunkDescriptor,
    /// 最多尝试次数（含首次），至少为 1
    pub max_attempts: usize,
    pub retry_delay: Duration,
    /// 每次尝试等待响应头的超时
    pub header_timeout: Duration,
    pub read_timeout: Duration,
    pub tracker: &'a ProgressTracker,
    pub cancel: &'a CancellationToken,
}

/// 下载单个分片到临时文件，返回临时文件路径。
///
/// - 临时文件已完整：不发任何请求，直接返回；
/// - 临时文件比分片大：返回 [`TransferError::CorruptResume`]；
/// - 每次尝试前重新检查临时文件大小，从已有字节之后续传；
/// - 用尽尝试次数后返回 [`TransferError::ChunkFetch`]，已写入的字节保留在磁盘上。
pub async fn fetch_chunk(params: ChunkFetchParams<'_>) -> Result<PathBuf, TransferError> {
    let chunk = params.chunk;
    let path = segment_path(params.work_dir, params.transfer_id, chunk.index);
    let started = Instant::now();
    let mut credited = false;
    let mut last_error: Option<TransferError> = None;

    tracing::debug!(
        chunk = chunk.index,
        start = chunk.start_offset,
        end = chunk.end_offset,
        "分片开始"
    );

    for attempt in 1..=params.max_attempts {
        if params.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let resumed = match inspect_segment(&path, &chunk).await? {
            ChunkResumeOutcome::AlreadyComplete => {
                if !credited {
                    params.tracker.record(chunk.len());
                }
                tracing::debug!(chunk = chunk.index, "分片临时文件已完整，跳过下载");
                return Ok(path);
            }
            ChunkResumeOutcome::DownloadFrom { resumed } => resumed,
        };
        if !credited {
            // 磁盘上已有的字节只计入一次进度
            params.tracker.record(resumed);
            credited = true;
            if resumed > 0 {
                tracing::debug!(chunk = chunk.index, resumed, "分片从已有字节处续传");
            }
        }

        let result = download_one_range(DownloadOneRangeParams {
            client: params.client,
            url: params.url,
            segment: &path,
            chunk: &chunk,
            skip: resumed,
            header_timeout: params.header_timeout,
            read_timeout: params.read_timeout,
            tracker: params.tracker,
            cancel: params.cancel,
        })
        .await;

        match result {
            Ok(()) => {
                tracing::debug!(
                    chunk = chunk.index,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "分片完成"
                );
                return Ok(path);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    chunk = chunk.index,
                    attempt,
                    max_attempts = params.max_attempts,
                    error = %e,
                    "分片下载失败"
                );
                last_error = Some(e);
            }
        }

        if attempt < params.max_attempts && !params.retry_delay.is_zero() {
            tokio::select! {
                _ = params.cancel.cancelled() => return Err(TransferError::Cancelled),
                _ = tokio::time::sleep(params.retry_delay) => {}
            }
        }
    }

    tracing::error!(chunk = chunk.index, "分片已用尽重试次数");
    Err(TransferError::ChunkFetch {
        chunk_index: chunk.index,
        attempts: params.max_attempts,
        cause: Box::new(last_error.unwrap_or_else(|| {
            TransferError::InvalidConfig("max_attempts 至少为 1".into())
        })),
    })
}
