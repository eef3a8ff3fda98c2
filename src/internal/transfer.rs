//! 传输领域模块：探测、分片、并发下载、合并与进度。
//!
//! 对外导出以 [`crate::transfer`] 为准，此处仅做模块划分，不重复 pub use。

pub mod structs;
pub mod traits;
