//! 分片续传：根据临时文件是否存在及大小，决定续传起点或已完整。

use std::path::Path;

use tokio::fs;

use crate::internal::transfer::structs::{ChunkDescriptor, TransferError};

/// 续传检查结果：已完整可直接返回，或跳过已有的 `resumed` 字节继续下载。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkResumeOutcome {
    AlreadyComplete,
    DownloadFrom { resumed: u64 },
}

/// 检查某个分片的临时文件。
///
/// 临时文件比分片还大说明是陈旧或损坏的数据，返回 [`TransferError::CorruptResume`]，
/// 既不截断也不从头重下。
pub async fn inspect_segment(
    path: &Path,
    chunk: &ChunkDescriptor,
) -> Result<ChunkResumeOutcome, TransferError> {
    let resumed = match fs::metadata(path).await {
        Ok(m) => m.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(TransferError::CreateFile(e)),
    };

    let expected = chunk.len();
    if resumed > expected {
        return Err(TransferError::CorruptResume {
            chunk_index: chunk.index,
            path: path.to_path_buf(),
            found: resumed,
            expected,
        });
    }
    if resumed == expected {
        return Ok(ChunkResumeOutcome::AlreadyComplete);
    }
    Ok(ChunkResumeOutcome::DownloadFrom { resumed })
}
