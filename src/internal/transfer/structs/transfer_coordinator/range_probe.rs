//! 探测：发起 `Range: bytes=0-0` 请求，获取文件总大小并判断服务器是否支持 Range。

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};

use crate::internal::transfer::structs::{TransferDescriptor, TransferError};

/// 探测请求的参数。
pub struct ProbeParams<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    /// 整个探测请求（含等待响应头）的超时
    pub timeout: Duration,
}

/// 探测远程文件。
///
/// - 200：服务器忽略了 Range，按 `Content-Length` 取大小，不支持分片；
/// - 206：按 `Content-Range` 的 `/<size>` 取大小，支持分片；
/// - 其余状态或网络错误：探测失败，不重试。
pub async fn probe(params: ProbeParams<'_>) -> Result<TransferDescriptor, TransferError> {
    let resp = params
        .client
        .get(params.url)
        .header(RANGE, "bytes=0-0")
        .timeout(params.timeout)
        .send()
        .await
        .map_err(TransferError::ProbeRequest)?;

    let descriptor = match resp.status() {
        StatusCode::OK => TransferDescriptor {
            url: params.url.to_string(),
            total_size: parse_content_length(resp.headers())?,
            supports_range: false,
        },
        StatusCode::PARTIAL_CONTENT => {
            let raw = resp
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            TransferDescriptor {
                url: params.url.to_string(),
                total_size: parse_content_range_total(raw)?,
                supports_range: true,
            }
        }
        other => return Err(TransferError::ProbeStatus(other)),
    };

    tracing::info!(
        url = params.url,
        total_size = descriptor.total_size,
        supports_range = descriptor.supports_range,
        "探测完成"
    );
    Ok(descriptor)
}

/// 读取 `Content-Length`；缺失或不是数字时返回 [`TransferError::MissingSize`]。
pub fn parse_content_length(headers: &HeaderMap) -> Result<u64, TransferError> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or(TransferError::MissingSize)
}

/// 解析 `Content-Range: <unit> <start>-<end>/<size>` 中的 `<size>`。
pub fn parse_content_range_total(value: &str) -> Result<u64, TransferError> {
    let malformed = || TransferError::MalformedRangeHeader(value.to_string());

    let (unit, rest) = value.trim().split_once(' ').ok_or_else(malformed)?;
    if unit.is_empty() {
        return Err(malformed());
    }
    let (_range, size) = rest.split_once('/').ok_or_else(malformed)?;
    size.trim().parse::<u64>().map_err(|_| malformed())
}
