mod chunk_fetcher;
mod chunk_handler;
mod chunked;
mod download_one_range;
mod range_request;
mod resume;
mod worker_pool;

pub use chunk_fetcher::{fetch_chunk, ChunkFetchParams};
pub(crate) use chunked::{run_chunked_transfer, RunChunkedTransferParams};
pub use resume::{inspect_segment, ChunkResumeOutcome};
pub use worker_pool::{run_all, TransferTask};
