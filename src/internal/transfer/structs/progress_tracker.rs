//! 进度累加器：多个分片任务并发上报新增字节，原子累加后发布快照。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use tokio::sync::watch;
use tokio::time::Instant;

use super::transfer_hooks_container::TransferHooksContainer;
use super::transfer_progress::TransferProgress;

/// 进度累加器。
///
/// `record` 可被任意多个任务并发调用；已传输字节数用 [`AtomicU64`] 累加，
/// 发布到 watch 通道的快照只增不减（晚到的较小值会被丢弃）。
pub struct ProgressTracker {
    total_size: u64,
    bytes_transferred: AtomicU64,
    started_at: chrono::DateTime<Local>,
    started: Instant,
    sender: watch::Sender<TransferProgress>,
    hooks: Arc<TransferHooksContainer>,
}

impl ProgressTracker {
    pub fn new(
        total_size: u64,
        sender: watch::Sender<TransferProgress>,
        hooks: Arc<TransferHooksContainer>,
    ) -> Self {
        let tracker = Self {
            total_size,
            bytes_transferred: AtomicU64::new(0),
            started_at: Local::now(),
            started: Instant::now(),
            sender,
            hooks,
        };
        tracker.sender.send_replace(tracker.snapshot());
        tracker
    }

    /// 不挂钩子、不被外部监听的累加器。
    pub fn detached(total_size: u64) -> Self {
        let (sender, _) = watch::channel(TransferProgress::default());
        Self::new(total_size, sender, Arc::new(TransferHooksContainer::default()))
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }

    /// 累加 `delta` 字节，发布快照并通知钩子；`delta` 为 0 时忽略。
    pub fn record(&self, delta: u64) {
        if delta == 0 {
            return;
        }
        let current = self.bytes_transferred.fetch_add(delta, Ordering::Relaxed) + delta;
        let progress = self.snapshot_at(current);

        self.sender.send_if_modified(|published| {
            if current > published.bytes_transferred {
                *published = progress.clone();
                true
            } else {
                false
            }
        });
        self.hooks.run_on_bytes(delta, &progress);
    }

    /// 当前进度快照。
    pub fn snapshot(&self) -> TransferProgress {
        self.snapshot_at(self.bytes_transferred())
    }

    fn snapshot_at(&self, bytes_transferred: u64) -> TransferProgress {
        TransferProgress {
            bytes_transferred,
            total_size: self.total_size,
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
        }
    }
}
