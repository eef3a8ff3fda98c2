//! 单连接整文件下载：服务器不支持 Range 时的回退路径，不分片、不重试。

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::structs::{ProgressTracker, TransferError};

use super::body_stream::next_piece;

/// 单连接下载的参数（形参超过 3 个，用 struct 承载）。
pub struct SingleStreamParams<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    pub save_path: &'a Path,
    /// 探测得到的大小，用于校验是否读完
    pub total_size: u64,
    /// 等待响应头的超时；超时即整体失败
    pub header_timeout: Duration,
    pub read_timeout: Duration,
    pub tracker: &'a ProgressTracker,
    pub cancel: &'a CancellationToken,
}

/// 整文件 GET，流式写入保存路径并上报进度；失败时删除不完整的输出文件。
pub async fn run_single_stream(params: SingleStreamParams<'_>) -> Result<u64, TransferError> {
    let result = stream_to_file(&params).await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "单连接下载失败，删除不完整的输出文件");
        if let Err(rm) = tokio::fs::remove_file(params.save_path).await {
            if rm.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %params.save_path.display(),
                    error = %rm,
                    "删除输出文件失败"
                );
            }
        }
    }
    result
}

async fn stream_to_file(params: &SingleStreamParams<'_>) -> Result<u64, TransferError> {
    let resp = tokio::select! {
        biased;
        _ = params.cancel.cancelled() => return Err(TransferError::Cancelled),
        resp = tokio::time::timeout(params.header_timeout, params.client.get(params.url).send()) => {
            resp.map_err(|_| TransferError::HeaderTimeout(params.header_timeout))??
        }
    };
    if !resp.status().is_success() {
        return Err(TransferError::UnexpectedStatus(resp.status()));
    }

    let mut file = File::create(params.save_path)
        .await
        .map_err(TransferError::CreateFile)?;
    let mut stream = resp.bytes_stream();
    let mut bytes_done: u64 = 0;

    while let Some(piece) = next_piece(&mut stream, params.read_timeout, params.cancel).await? {
        file.write_all(&piece)
            .await
            .map_err(TransferError::WriteFile)?;
        let len = piece.len() as u64;
        bytes_done += len;
        params.tracker.record(len);
    }

    file.flush().await.map_err(TransferError::FlushFile)?;

    if bytes_done < params.total_size {
        return Err(TransferError::ShortRead {
            expected: params.total_size,
            received: bytes_done,
        });
    }
    Ok(bytes_done)
}
