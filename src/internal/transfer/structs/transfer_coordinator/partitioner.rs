//! 分片切分：按固定大小把 `[0, total_size)` 切成有序、连续、互不重叠的闭区间。

use crate::internal::transfer::structs::ChunkDescriptor;

/// 把 `total_size` 字节切成若干分片，每片最多 `max_chunk_bytes` 字节。
///
/// 纯函数：同样的输入总得到同样的分片序列。`total_size == 0` 时返回空序列，
/// 调用方需自行处理零长度传输。`max_chunk_bytes` 为 0 时按 1 处理。
pub fn partition(total_size: u64, max_chunk_bytes: u64) -> Vec<ChunkDescriptor> {
    let step = max_chunk_bytes.max(1);
    let mut chunks = Vec::new();
    let mut start: u64 = 0;
    let mut index = 0usize;

    while start < total_size {
        let end = start.saturating_add(step - 1).min(total_size - 1);
        chunks.push(ChunkDescriptor {
            index,
            start_offset: start,
            end_offset: end,
        });
        index += 1;
        start = end + 1;
    }
    chunks
}
