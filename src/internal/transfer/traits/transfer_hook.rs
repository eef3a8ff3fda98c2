//! 传输相关 trait：钩子接口，供协调器在各阶段调用。
//!
//! 对外使用入口为 [`crate::transfer`]。

use async_trait::async_trait;

use crate::internal::transfer::structs::{TransferProgress, TransferState};

/// 钩子执行时请求中止传输时使用的错误。
#[derive(Debug, Clone)]
pub struct HookAbort;

impl std::fmt::Display for HookAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("传输被钩子中止")
    }
}

impl std::error::Error for HookAbort {}

/// 传输流程钩子：在「开始前 / 状态变化 / 收到数据 / 完成后」插入自定义逻辑。
///
/// 使用方式二选一（可混用）：
/// - **单阶段**：用 `with_before_start_hook` / `with_on_progress_hook` / `with_after_complete_hook` 传入闭包；
/// - **完整钩子**：实现本 trait，通过协调器的 `with_hook` 注册。
///
/// `on_bytes` 会被多个分片任务并发调用，实现需自行保证线程安全，且不应阻塞。
#[async_trait]
pub trait TransferHook: Send + Sync {
    /// 探测完成、开始下载前调用。返回 `Err` 则中止本次传输。
    async fn before_start(&self, _total_size: u64) -> Result<(), HookAbort> {
        Ok(())
    }

    /// 传输状态变化时调用。
    fn on_state(&self, _state: &TransferState) {}

    /// 每写入一段数据后调用；`delta` 为本次新增字节数（> 0），`progress` 为累加后的快照。
    fn on_bytes(&self, _delta: u64, _progress: &TransferProgress) {}

    /// 传输成功结束后调用。
    async fn after_complete(&self) {}
}
