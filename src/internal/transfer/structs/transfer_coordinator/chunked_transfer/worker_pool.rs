//! 任务池：固定数量的 worker 从共享游标领取任务，结果按提交顺序写回。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::internal::transfer::structs::TransferError;

/// 单个任务：无参闭包，执行后得到结果或失败。
pub type TransferTask<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, TransferError>> + Send>;

type TaskQueue<T> = Arc<Mutex<Vec<Option<TransferTask<T>>>>>;
type ResultSlots<T> = Arc<Mutex<Vec<Option<T>>>>;

/// 以最多 `concurrency` 个并发执行全部任务，返回与 `tasks` 一一对应、顺序相同的结果。
///
/// 任一任务失败时触发 `cancel`：其余 worker 不再领取新任务，正在执行的任务可通过同一个
/// `cancel` 提前结束。返回第一个真正的错误（优先于因取消而产生的 [`TransferError::Cancelled`]）。
/// 外部触发 `cancel` 且有任务未完成时返回 [`TransferError::Cancelled`]。
pub async fn run_all<T>(
    tasks: Vec<TransferTask<T>>,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<Vec<T>, TransferError>
where
    T: Send + 'static,
{
    if concurrency == 0 {
        return Err(TransferError::InvalidConfig("concurrency 至少为 1".into()));
    }

    let total = tasks.len();
    let queue: TaskQueue<T> = Arc::new(Mutex::new(tasks.into_iter().map(Some).collect()));
    let slots: ResultSlots<T> = Arc::new(Mutex::new((0..total).map(|_| None).collect()));
    let cursor = Arc::new(AtomicUsize::new(0));

    let mut workers = JoinSet::new();
    for _ in 0..concurrency.min(total) {
        let queue = Arc::clone(&queue);
        let slots = Arc::clone(&slots);
        let cursor = Arc::clone(&cursor);
        let cancel = cancel.clone();
        workers.spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index >= total {
                    return Ok(());
                }

                let task = queue
                    .lock()
                    .map_err(|_| TransferError::PoolInternal("任务队列锁已损坏".into()))?[index]
                    .take()
                    .ok_or_else(|| TransferError::PoolInternal(format!("任务 {} 被重复领取", index)))?;

                match task().await {
                    Ok(value) => {
                        slots
                            .lock()
                            .map_err(|_| TransferError::PoolInternal("结果槽锁已损坏".into()))?[index] =
                            Some(value);
                    }
                    Err(e) => {
                        cancel.cancel();
                        return Err(e);
                    }
                }
            }
        });
    }

    let mut first_error: Option<TransferError> = None;
    while let Some(joined) = workers.join_next().await {
        let outcome = joined.map_err(TransferError::TaskJoin).and_then(|r| r);
        if let Err(e) = outcome {
            cancel.cancel();
            first_error = match first_error {
                None => Some(e),
                Some(TransferError::Cancelled) if !matches!(e, TransferError::Cancelled) => Some(e),
                kept => kept,
            };
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let mut slots = slots
        .lock()
        .map_err(|_| TransferError::PoolInternal("结果槽锁已损坏".into()))?;
    let results: Option<Vec<T>> = slots.drain(..).collect();
    match results {
        Some(results) => Ok(results),
        None if cancel.is_cancelled() => Err(TransferError::Cancelled),
        None => Err(TransferError::PoolInternal("部分任务没有结果".into())),
    }
}
