//! 分片下载：处理单块数据，追加到临时文件并更新进度。

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::internal::transfer::structs::{ProgressTracker, TransferError};

/// 处理单块数据时的参数（形参超过 3 个，用 struct 承载）。
pub struct HandleOnePieceParams<'a> {
    pub piece: Bytes,
    pub file: &'a mut File,
    /// 本次尝试已写入的字节数
    pub written: &'a mut u64,
    /// 本次尝试应写入的字节数
    pub expected: u64,
    pub chunk_index: usize,
    pub tracker: &'a ProgressTracker,
}

/// 把一块数据追加到临时文件并上报进度；返回 `true` 表示本分片已写满。
///
/// 超出分片范围的多余字节直接丢弃。
pub async fn handle_one_piece(params: HandleOnePieceParams<'_>) -> Result<bool, TransferError> {
    let room = params.expected.saturating_sub(*params.written);
    let len = params.piece.len() as u64;
    let take = len.min(room);

    if take < len {
        tracing::warn!(
            chunk = params.chunk_index,
            extra = len - take,
            "服务器返回的数据超出分片范围，多余部分已丢弃"
        );
    }
    if take > 0 {
        params
            .file
            .write_all(&params.piece[..take as usize])
            .await
            .map_err(TransferError::WriteFile)?;
        *params.written += take;
        params.tracker.record(take);
    }

    Ok(*params.written >= params.expected)
}
