//! PVE 客户端错误定义
//!
//! 注意: HTTP 非 2xx 状态和响应中的 `errors` 字段不属于错误,
//! 它们作为数据保存在 [`PveResult`](crate::PveResult) 中, 由调用方自行检查。

use thiserror::Error;

/// PVE 客户端错误类型
#[derive(Error, Debug)]
pub enum PveError {
    /// 无法到达服务器 (连接被拒绝、TLS 握手失败、读取响应体失败等)
    #[error("传输错误: {0}")]
    TransportError(String),

    /// 在收到响应之前请求超时
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 类型化接口收到非成功响应 (HTTP 状态码, 错误信息)
    #[error("API 错误 [{0}]: {1}")]
    ApiError(u16, String),

    #[error("认证错误: {0}")]
    AuthError(String),

    #[error("解析错误: {0}")]
    ParseError(String),

    /// JSON 访问器遇到缺失的键或类型不匹配
    #[error("类型不匹配: {0}")]
    TypeMismatch(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("无效的 UPID: {0}")]
    InvalidUpid(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for PveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PveError::Timeout(e.to_string())
        } else {
            PveError::TransportError(e.to_string())
        }
    }
}

/// PVE 客户端结果类型
pub type Result<T> = std::result::Result<T, PveError>;
