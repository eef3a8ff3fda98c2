//! 传输相关错误类型。

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::internal::transfer::traits::transfer_hook::HookAbort;

#[derive(Debug, Error)]
pub enum TransferError {
    // ---------- 探测 ----------
    #[error("探测文件信息失败: {0}")]
    ProbeRequest(#[source] reqwest::Error),

    #[error("探测文件信息失败: 意外的响应状态 {0}")]
    ProbeStatus(StatusCode),

    #[error("响应缺少有效的 Content-Length")]
    MissingSize,

    #[error("Content-Range 格式错误: {0:?}")]
    MalformedRangeHeader(String),

    // ---------- 单次请求 ----------
    #[error("HTTP 请求失败: {0}")]
    Request(#[from] reqwest::Error),

    #[error("服务器未按 Range 返回数据，状态 {0}")]
    RangeNotHonored(StatusCode),

    #[error("意外的响应状态 {0}")]
    UnexpectedStatus(StatusCode),

    #[error("数据不完整：预期 {expected} 字节，实际 {received} 字节")]
    ShortRead { expected: u64, received: u64 },

    #[error("等待响应头超时（{0:?}）")]
    HeaderTimeout(std::time::Duration),

    #[error("读取响应超时（{0:?} 内未收到数据）")]
    ReadTimeout(std::time::Duration),

    // ---------- 本地文件 ----------
    #[error("创建文件失败: {0}")]
    CreateFile(std::io::Error),

    #[error("写入文件失败: {0}")]
    WriteFile(std::io::Error),

    #[error("刷新文件失败: {0}")]
    FlushFile(std::io::Error),

    #[error(
        "分片 {chunk_index} 的临时文件 {} 已有 {found} 字节，超过预期的 {expected} 字节",
        path.display()
    )]
    CorruptResume {
        chunk_index: usize,
        path: PathBuf,
        found: u64,
        expected: u64,
    },

    #[error("合并分片到 {} 失败: {source}", path.display())]
    Merge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ---------- 分片与调度 ----------
    #[error("分片 {chunk_index} 下载失败，已尝试 {attempts} 次: {cause}")]
    ChunkFetch {
        chunk_index: usize,
        attempts: usize,
        #[source]
        cause: Box<TransferError>,
    },

    #[error("分片任务失败: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("任务池内部错误: {0}")]
    PoolInternal(String),

    #[error("传输被取消")]
    Cancelled,

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    /// 钩子在 before_start 中返回错误，中止传输。
    #[error("{0}")]
    HookAbort(#[from] HookAbort),
}

impl TransferError {
    /// 是否属于探测阶段的失败（对应 ProbeError / MissingSize / MalformedRangeHeader）。
    pub fn is_probe_error(&self) -> bool {
        matches!(
            self,
            TransferError::ProbeRequest(_)
                | TransferError::ProbeStatus(_)
                | TransferError::MissingSize
                | TransferError::MalformedRangeHeader(_)
        )
    }

    /// 分片单次尝试失败后是否值得重试。
    ///
    /// 取消与续传数据损坏不重试；其余（网络、状态码、短读、本地写入）都按尝试次数重试。
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TransferError::Cancelled | TransferError::CorruptResume { .. }
        )
    }
}
