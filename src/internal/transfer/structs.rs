pub mod chunk_descriptor;
pub(crate) mod hook_adapters;
pub mod progress_tracker;
pub mod segment_artifact;
pub mod transfer_config;
pub mod transfer_coordinator;
pub mod transfer_descriptor;
pub mod transfer_error;
pub mod transfer_hooks_container;
pub mod transfer_outcome;
pub mod transfer_progress;
pub mod transfer_state;

// 重导出公共类型
pub use chunk_descriptor::ChunkDescriptor;
pub use progress_tracker::ProgressTracker;
pub use transfer_config::TransferConfig;
pub use transfer_coordinator::TransferCoordinator;
pub use transfer_descriptor::TransferDescriptor;
pub use transfer_error::TransferError;
pub use transfer_hooks_container::TransferHooksContainer;
pub use transfer_outcome::TransferOutcome;
pub use transfer_progress::TransferProgress;
pub use transfer_state::TransferState;
