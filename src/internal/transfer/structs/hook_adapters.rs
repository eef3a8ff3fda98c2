//! 单阶段钩子适配器：将闭包包装成 [`TransferHook`]，供 `with_xx_hook` 使用。

use std::future::Future;

use async_trait::async_trait;

use crate::internal::transfer::structs::TransferProgress;
use crate::internal::transfer::traits::transfer_hook::{HookAbort, TransferHook};

/// 仅实现「开始前」的钩子适配器；闭包参数为文件总大小。
pub(crate) struct BeforeStartHookAdapter<F>(pub(crate) F);

#[async_trait]
impl<F, Fut> TransferHook for BeforeStartHookAdapter<F>
where
    F: Fn(u64) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookAbort>> + Send + 'static,
{
    async fn before_start(&self, total_size: u64) -> Result<(), HookAbort> {
        (self.0)(total_size).await
    }
}

/// 仅实现「收到数据」的钩子适配器。
pub(crate) struct OnProgressHookAdapter<F>(pub(crate) F);

#[async_trait]
impl<F> TransferHook for OnProgressHookAdapter<F>
where
    F: Fn(u64, &TransferProgress) + Send + Sync + 'static,
{
    fn on_bytes(&self, delta: u64, progress: &TransferProgress) {
        (self.0)(delta, progress);
    }
}

/// 仅实现「完成后」的钩子适配器。
pub(crate) struct AfterCompleteHookAdapter<F>(pub(crate) F);

#[async_trait]
impl<F, Fut> TransferHook for AfterCompleteHookAdapter<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn after_complete(&self) {
        (self.0)().await
    }
}
