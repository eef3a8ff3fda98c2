use std::path::PathBuf;

/// 单次传输的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// 服务器不支持 Range，已整文件下载
    SingleStream { path: PathBuf, bytes: u64 },
    /// 分片下载并合并完成
    Chunked {
        path: PathBuf,
        bytes: u64,
        chunks: usize,
    },
    /// 远程文件大小为 0，仅创建了空文件
    Empty { path: PathBuf },
}

impl TransferOutcome {
    /// 输出文件路径。
    pub fn path(&self) -> &PathBuf {
        match self {
            TransferOutcome::SingleStream { path, .. }
            | TransferOutcome::Chunked { path, .. }
            | TransferOutcome::Empty { path } => path,
        }
    }

    /// 输出文件字节数。
    pub fn bytes(&self) -> u64 {
        match self {
            TransferOutcome::SingleStream { bytes, .. }
            | TransferOutcome::Chunked { bytes, .. } => *bytes,
            TransferOutcome::Empty { .. } => 0,
        }
    }
}
