/// 传输状态（由协调器内部维护，外部只读监听）
///
/// `Probing → (SingleStream | Chunked) → Merging → Done`，
/// 另有 `Probing → Failed` 与 `Chunked → Failed`；`Done` 与 `Failed` 为终态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    Probing,
    /// 服务器不支持 Range，整文件单连接下载
    SingleStream,
    /// 分片并发下载，`chunks` 为分片总数
    Chunked { chunks: usize },
    Merging,
    Done,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Done | TransferState::Failed)
    }
}
