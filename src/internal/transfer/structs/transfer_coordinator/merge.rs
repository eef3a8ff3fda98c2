//! 合并：按分片序号把临时文件依次追加到输出文件，每追加完一个立即删除。
//!
//! 合并中途崩溃时，输出文件是若干完整分片的前缀，剩余临时文件原样保留；
//! 下次运行由 [`detect_merged_prefix`] 识别出已合并的分片，跳过它们继续追加。

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::internal::transfer::structs::{ChunkDescriptor, TransferError};

/// 合并分片时的参数。
pub struct MergeParams<'a> {
    pub output: &'a Path,
    /// 待合并的临时文件，已按分片序号升序排列
    pub segments: &'a [PathBuf],
    /// 为 true 时追加到已有输出（续上次中断的合并），否则新建/截断输出
    pub append: bool,
}

/// 依次追加临时文件，返回本次写入的字节数。
pub async fn merge_segments(params: MergeParams<'_>) -> Result<u64, TransferError> {
    let merge_err = |source: std::io::Error| TransferError::Merge {
        path: params.output.to_path_buf(),
        source,
    };

    let mut out = if params.append {
        OpenOptions::new()
            .append(true)
            .open(params.output)
            .await
            .map_err(merge_err)?
    } else {
        File::create(params.output).await.map_err(merge_err)?
    };

    let mut written: u64 = 0;
    for seg in params.segments {
        let mut src = File::open(seg).await.map_err(merge_err)?;
        written += tokio::io::copy(&mut src, &mut out)
            .await
            .map_err(merge_err)?;
        out.flush().await.map_err(merge_err)?;
        drop(src);

        if let Err(e) = fs::remove_file(seg).await {
            tracing::warn!(path = %seg.display(), error = %e, "合并后删除分片临时文件失败");
        }
    }

    out.flush().await.map_err(merge_err)?;
    Ok(written)
}

/// 识别上次中断的合并：返回已完整合并进输出文件的分片数（0 表示没有可续的合并）。
///
/// 合并只在全部分片下载完成后才开始，因此从第一个仍存在的临时文件起，之后的临时文件
/// 必须都存在且完整，否则不认为是中断的合并。在此前提下：
/// - 输出长度恰好等于该分片的起始偏移（且不是第 0 片）：前面的分片已合并；
/// - 输出长度等于该分片的结束偏移 + 1（追加后、删除前中断）：删除该临时文件并把它也计为已合并。
pub async fn detect_merged_prefix(
    output: &Path,
    chunks: &[ChunkDescriptor],
    segments: &[PathBuf],
) -> usize {
    let out_len = match fs::metadata(output).await {
        Ok(m) if m.is_file() => m.len(),
        _ => return 0,
    };

    let mut first_present = None;
    for (i, p) in segments.iter().enumerate() {
        if fs::try_exists(p).await.unwrap_or(false) {
            first_present = Some(i);
            break;
        }
    }
    let Some(k) = first_present else {
        return 0;
    };
    if !all_complete(&chunks[k..], &segments[k..]).await {
        return 0;
    }
    let chunk = &chunks[k];

    if k > 0 && out_len == chunk.start_offset {
        return k;
    }

    if out_len == chunk.end_offset + 1 {
        if let Err(e) = fs::remove_file(&segments[k]).await {
            tracing::warn!(path = %segments[k].display(), error = %e, "删除已合并的分片临时文件失败");
            return 0;
        }
        return k + 1;
    }
    0
}

async fn all_complete(chunks: &[ChunkDescriptor], segments: &[PathBuf]) -> bool {
    for (chunk, seg) in chunks.iter().zip(segments) {
        match fs::metadata(seg).await {
            Ok(m) if m.len() == chunk.len() => {}
            _ => return false,
        }
    }
    true
}
