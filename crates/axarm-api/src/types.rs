//! 线上类型定义
//!
//! 字段名与后端 JSON 严格一致（`servo_id` / `angle_deg` / `position_deg` …），
//! 不做任何本地改名，保证和既有部署互操作。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 舵机 ID（总线地址，1..=253）
///
/// 逻辑关节到舵机的映射是一张会话内不可变的静态表，
/// 由 `axarm-core` 的配置层持有；本层只认数字地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServoId(pub u8);

impl fmt::Display for ServoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "servo {}", self.0)
    }
}

/// `POST /move` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct MoveRequest {
    pub id: u8,
    pub angle: f64,
}

/// `POST /move` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct MoveResponse {
    pub servo_id: u8,
    pub angle_deg: f64,
}

/// `POST /stop` / `/resume` / `/reset` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub status: String,
}

/// `POST /torque` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct TorqueRequest {
    pub id: u8,
    pub enable: bool,
}

/// `POST /torque` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct TorqueResponse {
    pub servo_id: u8,
    pub torque: bool,
}

/// `GET /status` 响应（存活探针，不参与核心状态机）
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub time: f64,
}

/// `GET /inspect/{id}` 响应 —— 单个舵机的完整遥测
///
/// 除位置外的每个字段都可能为 `null`（对应控制表读取超时），
/// 调用方必须保留旧值而不是清零。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectData {
    pub servo_id: u8,
    /// 当前位置（度，0–300）
    pub position_deg: f64,
    /// 当前位置（原始计数，0–1023）
    pub position_raw: u16,
    /// 当前转速（rpm）
    pub speed_rpm: Option<f64>,
    /// 当前负载，带符号百分比文本（如 `"+26.5%"`），见 [`parse_load_percent`]
    pub load: Option<String>,
    /// 供电电压（V）
    pub voltage_v: Option<f64>,
    /// 温度（°C）
    pub temperature_c: Option<f64>,
    /// 扭矩使能状态
    pub torque_enabled: Option<bool>,
    /// 状态返回级别（协议诊断用，控制台不消费）
    pub status_return_level: Option<u8>,
}

impl InspectData {
    /// 解析负载文本为带符号百分比数值
    pub fn load_percent(&self) -> Option<f64> {
        self.load.as_deref().and_then(parse_load_percent)
    }
}

/// 解析后端的负载格式：`"+26.5%"` → `26.5`，`"-3.0%"` → `-3.0`
///
/// 格式由后端的 `format_load` 固定为 `[+-]?数字%`；
/// 不符合该格式时返回 `None`，调用方保留旧值。
pub fn parse_load_percent(text: &str) -> Option<f64> {
    let trimmed = text.trim().strip_suffix('%')?;
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_percent() {
        assert_eq!(parse_load_percent("+26.5%"), Some(26.5));
        assert_eq!(parse_load_percent("-3.0%"), Some(-3.0));
        assert_eq!(parse_load_percent("0.0%"), Some(0.0));
        assert_eq!(parse_load_percent("26.5"), None);
        assert_eq!(parse_load_percent("garbage%"), None);
    }

    #[test]
    fn test_inspect_data_decodes_backend_json() {
        // 后端 /inspect/{id} 的真实响应形状，含 null 字段
        let json = r#"{
            "servo_id": 2,
            "position_deg": 150.1,
            "position_raw": 512,
            "speed_rpm": 3.2,
            "load": "+26.5%",
            "voltage_v": 11.8,
            "temperature_c": 42.0,
            "torque_enabled": true,
            "status_return_level": 2
        }"#;
        let data: InspectData = serde_json::from_str(json).unwrap();
        assert_eq!(data.servo_id, 2);
        assert_eq!(data.position_raw, 512);
        assert_eq!(data.load_percent(), Some(26.5));

        let json_nulls = r#"{
            "servo_id": 3,
            "position_deg": 88.0,
            "position_raw": 300,
            "speed_rpm": null,
            "load": null,
            "voltage_v": null,
            "temperature_c": null,
            "torque_enabled": null,
            "status_return_level": null
        }"#;
        let data: InspectData = serde_json::from_str(json_nulls).unwrap();
        assert_eq!(data.speed_rpm, None);
        assert_eq!(data.load_percent(), None);
    }

    #[test]
    fn test_move_request_encodes_backend_fields() {
        let req = MoveRequest { id: 2, angle: 120.0 };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["angle"], 120.0);
    }
}
