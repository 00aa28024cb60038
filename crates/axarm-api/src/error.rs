//! 接口层错误类型定义

use thiserror::Error;

/// 远程接口错误
///
/// 所有变体都代表"一次远程调用的终局失败"：调用方（指令分发器）
/// 据此生成 `failed` 日志条目并在必要时执行补偿回滚。
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// 网络/传输层失败（连接拒绝、超时、DNS 等）
    #[error("transport error: {0}")]
    Transport(String),

    /// 远端返回非 2xx 状态码
    #[error("remote returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// 响应体无法按约定的 JSON 结构解码
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 400,
            detail: "Angle must be 0-300°".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("400"));
        assert!(msg.contains("Angle"));
    }
}
