/// 探测结果：远程文件总大小及服务器是否支持 Range 请求。
///
/// 由 [`probe`](crate::transfer::probe) 生成一次，整个传输期间不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub url: String,
    /// 文件总大小（字节）
    pub total_size: u64,
    /// 服务器是否对 `Range: bytes=0-0` 回应 206
    pub supports_range: bool,
}
