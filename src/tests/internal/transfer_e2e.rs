//! 协调器端到端：分片、单连接回退、零长度、续传、失败清理、超时、钩子与取消。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use wiremock::{MockServer, ResponseTemplate};

use crate::tests::{
    dir_entries, file_url, mount, random_payload, received_ranges, transfer_request_count,
    spawn_stalling_server, FailFromResponder, FlakyResponder, RangeResponder, SlowResponder,
    UnrangedResponder,
};
use crate::transfer::{
    segment_path, transfer_id, HookAbort, TransferCoordinator, TransferError, TransferHook,
    TransferOutcome, TransferState,
};

/// 记录协调器发布过的全部状态。
#[derive(Clone, Default)]
struct StateLog(Arc<Mutex<Vec<TransferState>>>);

impl StateLog {
    fn states(&self) -> Vec<TransferState> {
        self.0.lock().unwrap().clone()
    }
}

impl TransferHook for StateLog {
    fn on_state(&self, state: &TransferState) {
        self.0.lock().unwrap().push(state.clone());
    }
}

fn coordinator(server: &MockServer, dir: &std::path::Path) -> TransferCoordinator {
    coordinator_for(file_url(server), dir)
}

fn coordinator_for(url: String, dir: &std::path::Path) -> TransferCoordinator {
    TransferCoordinator::new(url)
        .save_to(dir.join("out.bin"))
        .retry_delay(Duration::ZERO)
        .read_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn chunked_transfer_reassembles_file() {
    let server = MockServer::start().await;
    let payload = random_payload(2500);
    mount(&server, RangeResponder::new(&payload)).await;
    let dir = tempfile::tempdir().unwrap();
    let log = StateLog::default();

    let coordinator = coordinator(&server, dir.path())
        .chunk_size(1000)
        .concurrency(2)
        .with_hook(log.clone());
    let progress = coordinator.progress();
    let state = coordinator.state();

    let outcome = coordinator.run().await.unwrap();

    assert_eq!(
        outcome,
        TransferOutcome::Chunked {
            path: dir.path().join("out.bin"),
            bytes: 2500,
            chunks: 3,
        }
    );
    assert_eq!(tokio::fs::read(outcome.path()).await.unwrap(), payload);
    assert_eq!(dir_entries(dir.path()), vec!["out.bin".to_string()], "临时文件应已清理");

    let mut ranges: Vec<String> = received_ranges(&server)
        .await
        .into_iter()
        .flatten()
        .collect();
    ranges.sort();
    assert_eq!(
        ranges,
        vec!["bytes=0-0", "bytes=0-999", "bytes=1000-1999", "bytes=2000-2499"]
    );

    assert_eq!(progress.borrow().bytes_transferred, 2500);
    assert_eq!(progress.borrow().pct(), 100.0);
    assert_eq!(*state.borrow(), TransferState::Done);
    assert!(state.borrow().is_terminal());
    assert_eq!(
        log.states(),
        vec![
            TransferState::Probing,
            TransferState::Chunked { chunks: 3 },
            TransferState::Merging,
            TransferState::Done,
        ]
    );
}

#[tokio::test]
async fn server_without_ranges_uses_single_stream() {
    let server = MockServer::start().await;
    let payload = random_payload(1800);
    mount(
        &server,
        ResponseTemplate::new(200).set_body_bytes(payload.clone()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let log = StateLog::default();

    let outcome = coordinator(&server, dir.path())
        .chunk_size(500)
        .with_hook(log.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TransferOutcome::SingleStream {
            path: dir.path().join("out.bin"),
            bytes: 1800,
        }
    );
    assert_eq!(tokio::fs::read(outcome.path()).await.unwrap(), payload);

    let ranges = received_ranges(&server).await;
    assert_eq!(ranges.iter().filter(|r| r.is_none()).count(), 1, "只应有一个不带 Range 的请求");
    assert_eq!(ranges.len(), 2, "探测 + 整文件下载");
    assert!(
        !log
            .states()
            .iter()
            .any(|s| matches!(s, TransferState::Chunked { .. })),
        "不支持 Range 时不应进入分片状态"
    );
    assert_eq!(
        log.states(),
        vec![
            TransferState::Probing,
            TransferState::SingleStream,
            TransferState::Done,
        ]
    );
}

#[tokio::test]
async fn empty_remote_file_creates_empty_output() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(206).insert_header("Content-Range", "bytes */0"),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();

    let outcome = coordinator(&server, dir.path()).run().await.unwrap();

    assert_eq!(
        outcome,
        TransferOutcome::Empty {
            path: dir.path().join("out.bin"),
        }
    );
    assert_eq!(tokio::fs::metadata(outcome.path()).await.unwrap().len(), 0);
    assert_eq!(transfer_request_count(&server).await, 0);
}

#[tokio::test]
async fn rerun_resumes_from_existing_segments() {
    let server = MockServer::start().await;
    let payload = random_payload(3000);
    mount(&server, RangeResponder::new(&payload)).await;
    let dir = tempfile::tempdir().unwrap();
    let url = file_url(&server);

    // 上次运行留下：分片 0 完整，分片 1 只写了 250 字节
    let id = transfer_id(&url, 3000, 1000);
    tokio::fs::write(segment_path(dir.path(), &id, 0), &payload[..1000])
        .await
        .unwrap();
    tokio::fs::write(segment_path(dir.path(), &id, 1), &payload[1000..1250])
        .await
        .unwrap();

    let coordinator = coordinator(&server, dir.path()).chunk_size(1000);
    let progress = coordinator.progress();
    coordinator.run().await.unwrap();

    assert_eq!(tokio::fs::read(dir.path().join("out.bin")).await.unwrap(), payload);
    let mut ranges: Vec<String> = received_ranges(&server)
        .await
        .into_iter()
        .flatten()
        .collect();
    ranges.sort();
    assert_eq!(ranges, vec!["bytes=0-0", "bytes=1250-1999", "bytes=2000-2999"]);
    assert_eq!(progress.borrow().bytes_transferred, 3000);
    assert_eq!(dir_entries(dir.path()), vec!["out.bin".to_string()]);
}

#[tokio::test]
async fn rerun_continues_an_interrupted_merge() {
    let server = MockServer::start().await;
    let payload = random_payload(3000);
    mount(&server, RangeResponder::new(&payload)).await;
    let dir = tempfile::tempdir().unwrap();
    let url = file_url(&server);

    // 上次合并到一半：输出已有分片 0、1，分片 2 的临时文件还在
    let id = transfer_id(&url, 3000, 1000);
    tokio::fs::write(dir.path().join("out.bin"), &payload[..2000])
        .await
        .unwrap();
    tokio::fs::write(segment_path(dir.path(), &id, 2), &payload[2000..])
        .await
        .unwrap();

    let outcome = coordinator(&server, dir.path())
        .chunk_size(1000)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.bytes(), 3000);
    assert_eq!(tokio::fs::read(dir.path().join("out.bin")).await.unwrap(), payload);
    assert_eq!(transfer_request_count(&server).await, 0, "已合并与已完整的分片都不应再请求");
}

#[tokio::test]
async fn transient_chunk_failures_are_retried() {
    let server = MockServer::start().await;
    let payload = random_payload(2000);
    mount(&server, FlakyResponder::new(&payload, 2)).await;
    let dir = tempfile::tempdir().unwrap();

    coordinator(&server, dir.path())
        .chunk_size(1000)
        .concurrency(1)
        .max_attempts(3)
        .run()
        .await
        .unwrap();

    assert_eq!(tokio::fs::read(dir.path().join("out.bin")).await.unwrap(), payload);
    assert_eq!(transfer_request_count(&server).await, 4);
}

#[tokio::test]
async fn exhausted_chunk_fails_and_cleans_up() {
    let server = MockServer::start().await;
    let payload = random_payload(3000);
    mount(&server, FailFromResponder::new(&payload, 2000)).await;
    let dir = tempfile::tempdir().unwrap();
    let log = StateLog::default();

    let coordinator = coordinator(&server, dir.path())
        .chunk_size(1000)
        .concurrency(1)
        .max_attempts(2)
        .with_hook(log.clone());
    let state = coordinator.state();
    let err = coordinator.run().await.unwrap_err();

    match err {
        TransferError::ChunkFetch {
            chunk_index,
            attempts,
            ..
        } => {
            assert_eq!(chunk_index, 2);
            assert_eq!(attempts, 2);
        }
        other => panic!("应为 ChunkFetch，得到 {:?}", other),
    }
    assert!(dir_entries(dir.path()).is_empty(), "失败后不应留下临时文件或输出");
    assert_eq!(*state.borrow(), TransferState::Failed);
    assert_eq!(log.states().last(), Some(&TransferState::Failed));
}

#[tokio::test]
async fn probe_failure_aborts_before_any_download() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(404)).await;
    let dir = tempfile::tempdir().unwrap();

    let err = coordinator(&server, dir.path()).run().await.unwrap_err();

    assert!(err.is_probe_error());
    assert_eq!(received_ranges(&server).await.len(), 1);
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn invalid_config_sends_no_requests() {
    let server = MockServer::start().await;
    mount(&server, RangeResponder::new(b"abc")).await;
    let dir = tempfile::tempdir().unwrap();

    let err = coordinator(&server, dir.path())
        .concurrency(0)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InvalidConfig(_)));
    assert!(received_ranges(&server).await.is_empty());
}

#[tokio::test]
async fn before_start_hook_can_abort() {
    let server = MockServer::start().await;
    let payload = random_payload(2000);
    mount(&server, RangeResponder::new(&payload)).await;
    let dir = tempfile::tempdir().unwrap();
    let seen_total = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_total);

    let err = coordinator(&server, dir.path())
        .with_before_start_hook(move |total| {
            *seen.lock().unwrap() = Some(total);
            async { Err::<(), _>(HookAbort) }
        })
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::HookAbort(_)));
    assert_eq!(*seen_total.lock().unwrap(), Some(2000));
    assert_eq!(transfer_request_count(&server).await, 0);
}

#[tokio::test]
async fn progress_and_completion_hooks_fire() {
    let server = MockServer::start().await;
    let payload = random_payload(2048);
    mount(&server, RangeResponder::new(&payload)).await;
    let dir = tempfile::tempdir().unwrap();
    let last_seen = Arc::new(Mutex::new(0u64));
    let completed = Arc::new(Mutex::new(false));
    let (last, done) = (Arc::clone(&last_seen), Arc::clone(&completed));

    coordinator(&server, dir.path())
        .chunk_size(512)
        .with_on_progress_hook(move |_delta, progress| {
            let mut l = last.lock().unwrap();
            *l = (*l).max(progress.bytes_transferred);
        })
        .with_after_complete_hook(move || {
            let done = Arc::clone(&done);
            async move {
                *done.lock().unwrap() = true;
            }
        })
        .run()
        .await
        .unwrap();

    assert_eq!(*last_seen.lock().unwrap(), 2048);
    assert!(*completed.lock().unwrap());
}

#[tokio::test]
async fn cancellation_keeps_segments_for_resume() {
    let server = MockServer::start().await;
    let payload = random_payload(3000);
    mount(&server, SlowResponder::new(&payload, Duration::from_secs(30))).await;
    let dir = tempfile::tempdir().unwrap();

    let coordinator = coordinator(&server, dir.path()).chunk_size(1000);
    let cancel = coordinator.cancellation_token();
    let id = transfer_id(&file_url(&server), 3000, 1000);
    let leftover = segment_path(dir.path(), &id, 1);
    tokio::fs::write(&leftover, &payload[1000..1100]).await.unwrap();

    let mut state = coordinator.state();
    let handle = tokio::spawn(coordinator.run());
    // 进入分片下载后再取消
    state
        .wait_for(|s| matches!(s, TransferState::Chunked { .. }))
        .await
        .unwrap();
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("取消后应尽快结束")
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, TransferError::Cancelled));
    assert!(leftover.exists(), "取消时保留临时文件以便续传");
    assert!(!dir.path().join("out.bin").exists());
}

#[test]
fn only_done_and_failed_are_terminal() {
    assert!(TransferState::Done.is_terminal());
    assert!(TransferState::Failed.is_terminal());
    assert!(!TransferState::Probing.is_terminal());
    assert!(!TransferState::SingleStream.is_terminal());
    assert!(!TransferState::Chunked { chunks: 2 }.is_terminal());
    assert!(!TransferState::Merging.is_terminal());
}

#[tokio::test]
async fn single_stream_short_body_fails_and_removes_output() {
    let server = MockServer::start().await;
    let payload = random_payload(1800);
    mount(&server, UnrangedResponder::new(&payload).truncated(900)).await;
    let dir = tempfile::tempdir().unwrap();
    let log = StateLog::default();

    let err = coordinator(&server, dir.path())
        .with_hook(log.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::ShortRead {
            expected: 1800,
            received: 900
        }
    ));
    assert!(!dir.path().join("out.bin").exists(), "不完整的输出文件应被删除");
    assert_eq!(log.states().last(), Some(&TransferState::Failed));
}

#[tokio::test]
async fn single_stream_error_status_fails_without_output() {
    let server = MockServer::start().await;
    let payload = random_payload(1800);
    mount(&server, UnrangedResponder::new(&payload).status(503)).await;
    let dir = tempfile::tempdir().unwrap();

    let coordinator = coordinator(&server, dir.path());
    let state = coordinator.state();
    let err = coordinator.run().await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::UnexpectedStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE)
    ));
    assert!(!dir.path().join("out.bin").exists());
    assert_eq!(*state.borrow(), TransferState::Failed);
}

#[tokio::test]
async fn single_stream_header_timeout_is_fatal() {
    let server = MockServer::start().await;
    let payload = random_payload(1800);
    mount(
        &server,
        UnrangedResponder::new(&payload).delayed(Duration::from_secs(30)),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();

    let run = coordinator(&server, dir.path())
        .header_timeout(Duration::from_millis(300))
        .run();
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("响应头超时后应尽快失败")
        .unwrap_err();

    assert!(matches!(err, TransferError::HeaderTimeout(_)));
    assert_eq!(transfer_request_count(&server).await, 1, "单连接路径不重试");
    assert!(!dir.path().join("out.bin").exists());
}

#[tokio::test]
async fn stalled_chunk_body_times_out_and_cleans_up() {
    let payload = random_payload(1000);
    let url = spawn_stalling_server(payload, 100).await;
    let dir = tempfile::tempdir().unwrap();

    let run = coordinator_for(url, dir.path())
        .read_timeout(Duration::from_millis(300))
        .max_attempts(2)
        .run();
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("读超时后应尽快失败")
        .unwrap_err();

    match err {
        TransferError::ChunkFetch {
            chunk_index,
            attempts,
            cause,
        } => {
            assert_eq!(chunk_index, 0);
            assert_eq!(attempts, 2);
            assert!(matches!(*cause, TransferError::ReadTimeout(_)));
        }
        other => panic!("应为 ChunkFetch，得到 {:?}", other),
    }
    assert!(dir_entries(dir.path()).is_empty(), "失败后不应留下临时文件");
}

#[tokio::test]
async fn oversized_segment_aborts_before_merge() {
    let server = MockServer::start().await;
    let payload = random_payload(3000);
    mount(&server, RangeResponder::new(&payload)).await;
    let dir = tempfile::tempdir().unwrap();
    let log = StateLog::default();

    let id = transfer_id(&file_url(&server), 3000, 1000);
    tokio::fs::write(segment_path(dir.path(), &id, 1), random_payload(1500))
        .await
        .unwrap();

    let err = coordinator(&server, dir.path())
        .chunk_size(1000)
        .concurrency(1)
        .with_hook(log.clone())
        .run()
        .await
        .unwrap_err();

    match err {
        TransferError::CorruptResume {
            chunk_index,
            found,
            expected,
            ..
        } => {
            assert_eq!(chunk_index, 1);
            assert_eq!(found, 1500);
            assert_eq!(expected, 1000);
        }
        other => panic!("应为 CorruptResume，得到 {:?}", other),
    }
    let states = log.states();
    assert!(!states.contains(&TransferState::Merging), "不应进入合并");
    assert_eq!(states.last(), Some(&TransferState::Failed));
    assert!(dir_entries(dir.path()).is_empty(), "分片临时文件应已清理");
    assert!(!received_ranges(&server)
        .await
        .contains(&Some("bytes=1000-1999".to_string())));
}
