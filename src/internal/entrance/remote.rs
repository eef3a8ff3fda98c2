use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::internal::transfer::structs::{TransferCoordinator, TransferError, TransferOutcome};

/// URL 路径为空时使用的输出文件名
pub const DEFAULT_OUTPUT_NAME: &str = "download.bin";

/// 下载远程文件到本地
///
/// 按默认配置（100MB 分片、失败重试间隔 1 秒）执行一次完整传输；需要更多控制时直接使用
/// [`TransferCoordinator`]。
///
/// example:
/// ```rust,ignore
/// use quickly::run_transfer;
///
/// let outcome = run_transfer("https://example.com/a.zip", "a.zip", 3, 5).await?;
/// ```
pub async fn run_transfer(
    url: &str,
    output: impl AsRef<Path>,
    max_attempts: usize,
    concurrency: usize,
) -> Result<TransferOutcome, TransferError> {
    TransferCoordinator::new(url)
        .save_to(output)
        .max_attempts(max_attempts)
        .concurrency(concurrency)
        .run()
        .await
}

/// 由 URL 推导默认输出路径：取路径的最后一段（百分号解码），为空时使用 [`DEFAULT_OUTPUT_NAME`]。
///
/// - 注意：解码后的名称中的路径分隔符会替换为 `_`，避免写到当前目录之外
pub fn default_output_path(url: &str) -> PathBuf {
    let name = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .filter(|s| !s.is_empty())
                .next_back()
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        })
        .map(|s| s.replace(['/', '\\'], "_"))
        .filter(|s| !s.is_empty() && s != "." && s != "..");

    PathBuf::from(name.unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string()))
}
