/// 内部导出的模块
mod internal;


/// 导出核心入口函数
pub use internal::entrance::remote::*;

/// 传输引擎：探测、分片、并发下载、合并与进度
pub mod transfer {
    use crate::internal;
    // 结构体模型
    pub use internal::transfer::structs::*;
    pub use internal::transfer::structs::transfer_config::{
        DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HEADER_TIMEOUT,
        DEFAULT_MAX_ATTEMPTS, DEFAULT_PROBE_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_RETRY_DELAY_MS,
    };
    pub use internal::transfer::structs::segment_artifact::{segment_path, transfer_id};
    // 引擎各环节，可单独使用
    pub use internal::transfer::structs::transfer_coordinator::chunked_transfer::{
        fetch_chunk, inspect_segment, run_all, ChunkFetchParams, ChunkResumeOutcome, TransferTask,
    };
    pub use internal::transfer::structs::transfer_coordinator::merge::{
        merge_segments, MergeParams,
    };
    pub use internal::transfer::structs::transfer_coordinator::partitioner::partition;
    pub use internal::transfer::structs::transfer_coordinator::range_probe::{
        parse_content_length, parse_content_range_total, probe, ProbeParams,
    };
    // 钩子
    pub use internal::transfer::traits::transfer_hook::{HookAbort, TransferHook};
}
