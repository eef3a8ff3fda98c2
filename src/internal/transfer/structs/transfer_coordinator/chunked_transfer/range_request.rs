//! 分片下载：发起单段 Range 请求，返回响应供流式读取。

use std::time::Duration;

use reqwest::header::RANGE;
use reqwest::{Client, Response, StatusCode};

use crate::internal::transfer::structs::TransferError;

/// 发起 Range 请求时的参数。
pub struct FetchRangeParams<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    pub range: &'a str,
    /// 等待响应头的超时
    pub header_timeout: Duration,
}

/// 发起单段 Range GET 请求；只接受 206，其余状态都算本次尝试失败。
///
/// - 200：服务器忽略了 Range，返回 [`TransferError::RangeNotHonored`]；
/// - 其他状态：返回 [`TransferError::UnexpectedStatus`]；
/// - `header_timeout` 内没有收到响应头：返回 [`TransferError::HeaderTimeout`]。
pub async fn fetch_range_response(params: FetchRangeParams<'_>) -> Result<Response, TransferError> {
    let request = params
        .client
        .get(params.url)
        .header(RANGE, params.range)
        .send();
    let resp = tokio::time::timeout(params.header_timeout, request)
        .await
        .map_err(|_| TransferError::HeaderTimeout(params.header_timeout))??;

    match resp.status() {
        StatusCode::PARTIAL_CONTENT => Ok(resp),
        StatusCode::OK => Err(TransferError::RangeNotHonored(StatusCode::OK)),
        other => Err(TransferError::UnexpectedStatus(other)),
    }
}
