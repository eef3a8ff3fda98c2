use std::path::PathBuf;
use std::time::Duration;

use super::transfer_error::TransferError;

const MIB: u64 = 1024 * 1024;

/// 默认分片大小：100MB
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * MIB;

/// 默认每个分片的最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// 默认最大并发连接数
pub const DEFAULT_CONCURRENCY: usize = 5;

/// 默认重试延迟（毫秒）
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// 探测请求的整体超时
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 建立连接超时
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 发出请求后等待响应头的最长时间
pub const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(10);

/// 读取响应体时，两次收到数据之间允许的最长间隔
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// 单次传输的配置。
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub save_path: PathBuf,
    /// 分片临时文件所在目录；未设置时使用保存路径所在目录
    pub work_dir: Option<PathBuf>,
    /// 每个分片的大小（字节）
    pub chunk_size: u64,
    /// 每个分片最多尝试几次（含首次）
    pub max_attempts: usize,
    /// 最大并发分片数
    pub concurrency: usize,
    /// 两次尝试之间的等待；为 0 时立即重试
    pub retry_delay: Duration,
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
    /// 分片请求与单连接下载等待响应头的超时
    pub header_timeout: Duration,
    pub read_timeout: Duration,
    /// 覆盖自动生成的传输标识
    pub transfer_id: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("download.bin"),
            work_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            concurrency: DEFAULT_CONCURRENCY,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            header_timeout: DEFAULT_HEADER_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            transfer_id: None,
        }
    }
}

impl TransferConfig {
    /// 在发起任何网络请求前校验配置。
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.max_attempts == 0 {
            return Err(TransferError::InvalidConfig(
                "max_attempts 至少为 1".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(TransferError::InvalidConfig(
                "concurrency 至少为 1".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidConfig(
                "chunk_size 至少为 1 字节".into(),
            ));
        }
        if self.save_path.as_os_str().is_empty() {
            return Err(TransferError::InvalidConfig("未设置保存路径".into()));
        }
        Ok(())
    }

    /// 分片临时文件目录：显式设置的 work_dir，否则为保存路径的父目录（为空时取当前目录）。
    pub fn resolved_work_dir(&self) -> PathBuf {
        if let Some(dir) = &self.work_dir {
            return dir.clone();
        }
        match self.save_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
