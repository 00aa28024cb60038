//! 阻塞式 HTTP 传输实现
//!
//! 与 FastAPI 后端的路径约定一一对应：
//!
//! | 方法              | 路径                |
//! |-------------------|---------------------|
//! | `move_joint`      | `POST /move`        |
//! | `stop`            | `POST /stop`        |
//! | `resume`          | `POST /resume`      |
//! | `reset`           | `POST /reset`       |
//! | `torque`          | `POST /torque`      |
//! | `inspect`         | `GET /inspect/{id}` |
//! | `status`          | `GET /status`       |
//!
//! 基地址应包含部署前缀，例如 `http://192.168.0.10:8000/api`。
//!
//! 客户端侧超时是对观测行为的**新增**约束（原实现没有超时，
//! 悬挂的调用永不结算）；超时到期会以 `ApiError::Transport`
//! 结算，上层按普通远程失败处理。

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::ApiError;
use crate::transport::ArmTransport;
use crate::types::*;

/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 基于 `reqwest::blocking` 的远程接口客户端
pub struct HttpTransport {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// 创建客户端
    ///
    /// `base` 末尾的 `/` 会被剥掉，之后按 `{base}/{path}` 拼接。
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// 使用默认超时创建客户端
    pub fn with_default_timeout(base: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(base, DEFAULT_TIMEOUT)
    }

    /// 基地址（仅用于日志/诊断展示）
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        trace!(path, "GET");
        let resp = self.client.get(self.url(path)).send()?;
        Self::decode(resp)
    }

    fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        trace!(path, "POST");
        let resp = self.client.post(self.url(path)).send()?;
        Self::decode(resp)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        trace!(path, "POST (json)");
        let resp = self.client.post(self.url(path)).json(body).send()?;
        Self::decode(resp)
    }

    fn decode<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            // 后端把验证错误放在响应体里（HTTPException detail）
            let detail = resp.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        resp.json::<T>().map_err(ApiError::from)
    }
}

impl ArmTransport for HttpTransport {
    fn move_joint(&self, servo: ServoId, angle_deg: f64) -> Result<MoveResponse, ApiError> {
        self.post_json(
            "move",
            &MoveRequest {
                id: servo.0,
                angle: angle_deg,
            },
        )
    }

    fn stop(&self) -> Result<AckResponse, ApiError> {
        self.post("stop")
    }

    fn resume(&self) -> Result<AckResponse, ApiError> {
        self.post("resume")
    }

    fn reset(&self) -> Result<AckResponse, ApiError> {
        self.post("reset")
    }

    fn torque(&self, servo: ServoId, enable: bool) -> Result<TorqueResponse, ApiError> {
        self.post_json(
            "torque",
            &TorqueRequest {
                id: servo.0,
                enable,
            },
        )
    }

    fn inspect(&self, servo: ServoId) -> Result<InspectData, ApiError> {
        self.get(&format!("inspect/{}", servo.0))
    }

    fn status(&self) -> Result<StatusResponse, ApiError> {
        self.get("status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let t = HttpTransport::with_default_timeout("http://localhost:8000/api/").unwrap();
        assert_eq!(t.base_url(), "http://localhost:8000/api");
        assert_eq!(t.url("move"), "http://localhost:8000/api/move");
    }
}
