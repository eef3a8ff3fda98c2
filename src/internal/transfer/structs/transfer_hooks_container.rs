use crate::internal::transfer::traits::transfer_hook::{HookAbort, TransferHook};

use super::transfer_progress::TransferProgress;
use super::transfer_state::TransferState;

/// 钩子容器：按注册顺序依次执行多个钩子。
#[derive(Default)]
pub struct TransferHooksContainer {
    hooks: Vec<Box<dyn TransferHook>>,
}

impl TransferHooksContainer {
    /// 添加一个传输钩子；支持多次调用以注册多个钩子。
    pub fn add(&mut self, hook: impl TransferHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub async fn run_before_start(&self, total_size: u64) -> Result<(), HookAbort> {
        for h in self.hooks.iter() {
            h.before_start(total_size).await?;
        }
        Ok(())
    }

    pub fn run_on_state(&self, state: &TransferState) {
        for h in self.hooks.iter() {
            h.on_state(state);
        }
    }

    pub fn run_on_bytes(&self, delta: u64, progress: &TransferProgress) {
        for h in self.hooks.iter() {
            h.on_bytes(delta, progress);
        }
    }

    pub async fn run_after_complete(&self) {
        for h in self.hooks.iter() {
            h.after_complete().await;
        }
    }
}
