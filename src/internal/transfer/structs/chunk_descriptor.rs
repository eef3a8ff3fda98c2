/// 单个分片：在整体中的序号及其闭区间字节范围 `[start_offset, end_offset]`。
///
/// 由 [`partition`](crate::transfer::partition) 生成，生成后不可变；同一组输入总得到同一组分片，
/// 续传依赖这一点（分片序号与边界必须与上次运行一致）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkDescriptor {
    /// 分片序号（从 0 开始）
    pub index: usize,
    /// 起始偏移（含）
    pub start_offset: u64,
    /// 结束偏移（含）
    pub end_offset: u64,
}

impl ChunkDescriptor {
    /// 分片字节数。
    pub fn len(&self) -> u64 {
        self.end_offset - self.start_offset + 1
    }

    /// 生成 Range 请求头：`bytes=start-end`，从 `skip` 字节之后开始。
    pub fn range_header_from(&self, skip: u64) -> String {
        format!("bytes={}-{}", self.start_offset + skip, self.end_offset)
    }
}
