//! 响应体读取：带空闲超时与取消的下一块数据。

use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::structs::TransferError;

/// 读取响应体的下一块数据。
///
/// 流结束返回 `Ok(None)`；`read_timeout` 内没有新数据返回 [`TransferError::ReadTimeout`]；
/// 取消信号优先于数据。
pub async fn next_piece<S>(
    stream: &mut S,
    read_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Option<Bytes>, TransferError>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(TransferError::Cancelled),

        next = tokio::time::timeout(read_timeout, stream.next()) => match next {
            Err(_) => Err(TransferError::ReadTimeout(read_timeout)),
            Ok(None) => Ok(None),
            Ok(Some(piece)) => Ok(Some(piece?)),
        },
    }
}
