//! 分片下载：单次尝试，发起 Range 请求、流式追加到临时文件并校验字节数。

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::structs::{ChunkDescriptor, ProgressTracker, TransferError};

use super::super::body_stream::next_piece;
use super::chunk_handler::{handle_one_piece, HandleOnePieceParams};
use super::range_request::{fetch_range_response, FetchRangeParams};

/// 单次尝试的参数（形参超过 3 个，用 struct 承载）。
pub struct DownloadOneRangeParams<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    pub segment: &'a Path,
    pub chunk: &'a ChunkDescriptor,
    /// 临时文件中已有的字节数，从其后开始请求
    pub skip: u64,
    pub header_timeout: Duration,
    pub read_timeout: Duration,
    pub tracker: &'a ProgressTracker,
    pub cancel: &'a CancellationToken,
}

/// 执行一次 Range 下载。
///
/// 无论成功与否，已写入的字节都会先 flush 到临时文件，供下一次尝试续传。
/// 响应提前结束（少于应得字节数）视为本次尝试失败。
pub async fn download_one_range(params: DownloadOneRangeParams<'_>) -> Result<(), TransferError> {
    let range = params.chunk.range_header_from(params.skip);
    let resp = tokio::select! {
        biased;
        _ = params.cancel.cancelled() => return Err(TransferError::Cancelled),
        resp = fetch_range_response(FetchRangeParams {
            client: params.client,
            url: params.url,
            range: &range,
            header_timeout: params.header_timeout,
        }) => resp?,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(params.segment)
        .await
        .map_err(TransferError::CreateFile)?;

    let expected = params.chunk.len() - params.skip;
    let mut written: u64 = 0;
    let mut stream = resp.bytes_stream();

    let streamed = stream_into_segment(StreamIntoSegmentParams {
        stream: &mut stream,
        file: &mut file,
        written: &mut written,
        expected,
        params: &params,
    })
    .await;
    let flushed = file.flush().await.map_err(TransferError::FlushFile);
    streamed?;
    flushed?;

    if written < expected {
        return Err(TransferError::ShortRead {
            expected,
            received: written,
        });
    }
    Ok(())
}

struct StreamIntoSegmentParams<'a, 'p, S> {
    stream: &'a mut S,
    file: &'a mut File,
    written: &'a mut u64,
    expected: u64,
    params: &'a DownloadOneRangeParams<'p>,
}

async fn stream_into_segment<S>(p: StreamIntoSegmentParams<'_, '_, S>) -> Result<(), TransferError>
where
    S: futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin,
{
    while let Some(piece) = next_piece(&mut *p.stream, p.params.read_timeout, p.params.cancel).await? {
        let full = handle_one_piece(HandleOnePieceParams {
            piece,
            file: &mut *p.file,
            written: &mut *p.written,
            expected: p.expected,
            chunk_index: p.params.chunk.index,
            tracker: p.params.tracker,
        })
        .await?;
        if full {
            break;
        }
    }
    Ok(())
}
