//! 分片临时文件：命名、定位与清理。
//!
//! 临时文件名为 `<transfer_id>-part-<index>`，文件是否存在及其大小即为续传依据，不另存清单。

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::chunk_descriptor::ChunkDescriptor;

/// 根据 URL、文件总大小与分片大小生成传输标识。
///
/// 同一传输多次运行得到相同标识，从而找回上次留下的临时文件；
/// 远程文件大小或分片大小变化时标识随之变化，旧的临时文件不会被误用。
pub fn transfer_id(url: &str, total_size: u64, chunk_size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(total_size.to_be_bytes());
    hasher.update(chunk_size.to_be_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("quickly-{}", &digest[..16])
}

/// 某个分片的临时文件路径。
pub fn segment_path(work_dir: &Path, transfer_id: &str, index: usize) -> PathBuf {
    work_dir.join(format!("{}-part-{}", transfer_id, index))
}

/// 所有分片的临时文件路径，按分片序号排列。
pub fn segment_paths(
    work_dir: &Path,
    transfer_id: &str,
    chunks: &[ChunkDescriptor],
) -> Vec<PathBuf> {
    chunks
        .iter()
        .map(|c| segment_path(work_dir, transfer_id, c.index))
        .collect()
}

/// 尽力删除仍存在的临时文件；删除失败只记录日志，不向上报告。
pub async fn remove_segments(paths: &[PathBuf]) {
    for p in paths {
        match tokio::fs::remove_file(p).await {
            Ok(()) => tracing::debug!(path = %p.display(), "已删除分片临时文件"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %p.display(), error = %e, "删除分片临时文件失败")
            }
        }
    }
}
