//! 部署配置
//!
//! 关节→舵机的映射、每关节的机械参数（方向、零位偏移、角度范围、
//! 预设角）以及轮询/平滑等运行参数。整张表在会话内不可变，
//! 以 `Arc<ArmConfig>` 注入分发器和同步循环。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use axarm_api::ServoId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 逻辑关节（机械臂的一个旋转自由度）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JointId {
    Base,
    Shoulder,
    Elbow,
    Gripper,
}

impl JointId {
    /// 所有关节，按运动链顺序
    pub const ALL: [JointId; 4] = [
        JointId::Base,
        JointId::Shoulder,
        JointId::Elbow,
        JointId::Gripper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointId::Base => "base",
            JointId::Shoulder => "shoulder",
            JointId::Elbow => "elbow",
            JointId::Gripper => "gripper",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单关节配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    /// 驱动该关节的舵机总线地址
    pub servo: ServoId,
    /// 旋转方向修正（+1 或 -1）
    pub direction: f64,
    /// 机械零位偏移（度）
    pub offset_deg: f64,
    /// 允许的最小角度（度）
    pub min_deg: f64,
    /// 允许的最大角度（度）
    pub max_deg: f64,
    /// 预设（home）角度（度）
    pub preset_deg: f64,
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// 语义校验失败（方向不是 ±1、范围颠倒、舵机地址重复等）
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 控制台部署配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// 关节表（会话内不可变）
    pub joints: BTreeMap<JointId, JointConfig>,
    /// 遥测轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// `moving` 推导的角度阈值：|present − goal| 超过该值视为在动（度）
    pub moving_epsilon_deg: f64,
    /// 渲染插值系数 k ∈ (0, 1]
    pub smoothing_factor: f64,
    /// 远程接口基地址（含部署前缀）
    pub remote_url: String,
    /// 单次远程调用超时（毫秒）
    pub http_timeout_ms: u64,
    /// 超过该时长未收到任何遥测则判定失联（毫秒）
    pub link_timeout_ms: u64,
    /// 指令历史的容量上限（超出后从最旧端修剪，序号不回退）
    pub log_capacity: usize,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ArmConfig {
    /// 默认部署：4 自由度 Dynamixel 链，0–300° 行程
    ///
    /// 方向/偏移表与预设位姿来自现场标定，勿随意改动。
    pub fn default_config() -> Self {
        let mut joints = BTreeMap::new();
        joints.insert(
            JointId::Base,
            JointConfig {
                servo: ServoId(1),
                direction: 1.0,
                offset_deg: 20.0,
                min_deg: 0.0,
                max_deg: 300.0,
                preset_deg: 80.0,
            },
        );
        joints.insert(
            JointId::Shoulder,
            JointConfig {
                servo: ServoId(2),
                direction: -1.0,
                offset_deg: -86.0,
                min_deg: 0.0,
                max_deg: 300.0,
                preset_deg: 64.0,
            },
        );
        joints.insert(
            JointId::Elbow,
            JointConfig {
                servo: ServoId(3),
                direction: -1.0,
                offset_deg: 5.0,
                min_deg: 0.0,
                max_deg: 300.0,
                preset_deg: 64.0,
            },
        );
        joints.insert(
            JointId::Gripper,
            JointConfig {
                servo: ServoId(4),
                direction: -1.0,
                offset_deg: 0.0,
                min_deg: 0.0,
                max_deg: 300.0,
                preset_deg: 120.0,
            },
        );

        Self {
            joints,
            poll_interval_ms: 1000,
            moving_epsilon_deg: 1.0,
            smoothing_factor: 0.1,
            remote_url: "http://127.0.0.1:8000/api".to_string(),
            http_timeout_ms: 5000,
            link_timeout_ms: 3000,
            log_capacity: 256,
        }
    }

    /// 从 TOML 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: ArmConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 语义校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 运动链的每个关节都必须在表里：缺项会让 `joint()` 在运行期失配
        for joint in JointId::ALL {
            if !self.joints.contains_key(&joint) {
                return Err(ConfigError::Invalid(format!(
                    "joint table is missing {joint}"
                )));
            }
        }
        let mut seen = BTreeMap::new();
        for (&joint, jc) in &self.joints {
            if jc.direction != 1.0 && jc.direction != -1.0 {
                return Err(ConfigError::Invalid(format!(
                    "{joint}: direction must be +1 or -1, got {}",
                    jc.direction
                )));
            }
            if jc.min_deg >= jc.max_deg {
                return Err(ConfigError::Invalid(format!(
                    "{joint}: empty angle range {}..{}",
                    jc.min_deg, jc.max_deg
                )));
            }
            if !(jc.min_deg..=jc.max_deg).contains(&jc.preset_deg) {
                return Err(ConfigError::Invalid(format!(
                    "{joint}: preset {}° outside range",
                    jc.preset_deg
                )));
            }
            if let Some(other) = seen.insert(jc.servo, joint) {
                return Err(ConfigError::Invalid(format!(
                    "{} assigned to both {other} and {joint}",
                    jc.servo
                )));
            }
        }
        if self.smoothing_factor <= 0.0 || self.smoothing_factor > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// 关节配置（关节表是编译期已知的枚举，缺项属于配置错误，
    /// `from_file` 之后不应出现）
    pub fn joint(&self, joint: JointId) -> &JointConfig {
        &self.joints[&joint]
    }

    /// 关节 → 舵机
    pub fn servo_for(&self, joint: JointId) -> ServoId {
        self.joint(joint).servo
    }

    /// 舵机 → 关节（反查）
    pub fn joint_for(&self, servo: ServoId) -> Option<JointId> {
        self.joints
            .iter()
            .find(|(_, jc)| jc.servo == servo)
            .map(|(&joint, _)| joint)
    }

    /// 链上所有舵机，按运动链顺序
    pub fn servo_ids(&self) -> Vec<ServoId> {
        JointId::ALL
            .iter()
            .filter_map(|j| self.joints.get(j).map(|jc| jc.servo))
            .collect()
    }

    /// 预设位姿的展示名（如 `80-64-64-120`）
    pub fn preset_label(&self) -> String {
        JointId::ALL
            .iter()
            .filter_map(|j| self.joints.get(j))
            .map(|jc| format!("{:.0}", jc.preset_deg))
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_mapping_matches_deployment() {
        let config = ArmConfig::default_config();
        config.validate().unwrap();
        assert_eq!(config.servo_for(JointId::Base), ServoId(1));
        assert_eq!(config.servo_for(JointId::Shoulder), ServoId(2));
        assert_eq!(config.servo_for(JointId::Elbow), ServoId(3));
        assert_eq!(config.servo_for(JointId::Gripper), ServoId(4));
        assert_eq!(config.joint_for(ServoId(2)), Some(JointId::Shoulder));
        assert_eq!(config.joint_for(ServoId(9)), None);
        assert_eq!(config.preset_label(), "80-64-64-120");
    }

    #[test]
    fn test_validate_rejects_bad_direction() {
        let mut config = ArmConfig::default_config();
        config.joints.get_mut(&JointId::Base).unwrap().direction = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_partial_joint_table() {
        // 只定义部分关节的配置必须在加载期被拒绝，
        // 否则 `joint()` 会在首个指令处对缺失关节失配
        let mut config = ArmConfig::default_config();
        config.joints.retain(|&joint, _| joint == JointId::Base);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("missing shoulder"));

        let text = toml::to_string(&config).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        assert!(matches!(
            ArmConfig::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_servo() {
        let mut config = ArmConfig::default_config();
        config.joints.get_mut(&JointId::Elbow).unwrap().servo = ServoId(1);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let config = ArmConfig::default_config();
        let text = toml::to_string(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let loaded = ArmConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut config = ArmConfig::default_config();
        config.smoothing_factor = 0.0;
        let text = toml::to_string(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        assert!(matches!(
            ArmConfig::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
