use std::time::Duration;

use chrono::{DateTime, Local};

/// 传输进度快照：已传输字节数、总大小、开始时间与已用时长。
///
/// 调用方通过协调器的 `progress()` 读取或监听；比例、速率与剩余时间由本结构体计算。
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// 已传输字节数（单调递增）
    pub bytes_transferred: u64,
    /// 文件总大小（字节），探测完成前为 0
    pub total_size: u64,
    /// 开始时间（墙上时钟，仅用于展示）
    pub started_at: DateTime<Local>,
    /// 自开始以来的时长
    pub elapsed: Duration,
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self {
            bytes_transferred: 0,
            total_size: 0,
            started_at: Local::now(),
            elapsed: Duration::ZERO,
        }
    }
}

impl TransferProgress {
    /// 进度百分比（0～100）；总大小为 0 时返回 `f64::NAN`。
    pub fn pct(&self) -> f64 {
        if self.total_size == 0 {
            return f64::NAN;
        }
        (self.bytes_transferred as f64 / self.total_size as f64) * 100.0
    }

    /// 平均速率（字节/秒）；尚未经过时间时为 0。
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_transferred as f64 / secs
    }

    /// 按平均速率估算的剩余时间；速率为 0 时无法估算，返回 `None`。
    pub fn eta(&self) -> Option<Duration> {
        let rate = self.rate();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total_size.saturating_sub(self.bytes_transferred);
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }
}
