//! 核心模块错误类型定义

use crate::config::JointId;
use axarm_api::ServoId;
use thiserror::Error;

/// 指令分发错误
///
/// 这些错误在任何乐观写入或远程调用之前返回给调用方；
/// 远程调用本身的失败不走这里，而是结算为 `failed` 日志条目。
#[derive(Error, Debug)]
pub enum CommandError {
    /// 目标角度超出该关节声明的范围
    #[error("angle {angle_deg}° out of range for {joint} ({min_deg}°..={max_deg}°)")]
    AngleOutOfRange {
        joint: JointId,
        angle_deg: f64,
        min_deg: f64,
        max_deg: f64,
    },

    /// 急停闭锁中，运动指令被拒绝（先 resume/reset）
    #[error("emergency stop is latched; resume or reset first")]
    EmergencyActive,

    /// 舵机不在配置的链上
    #[error("{0} is not part of the configured chain")]
    UnknownServo(ServoId),

    /// 扭矩限制超出 0–100%
    #[error("torque limit {0}% out of range (0..=100)")]
    TorqueLimitOutOfRange(f64),

    /// 工作线程通道已关闭（分发器正在拆除）
    #[error("command worker channel closed")]
    ChannelClosed,
}
